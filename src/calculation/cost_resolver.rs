//! Contributor daily cost and rate resolution.
//!
//! Finds the employment period active at a date and derives the daily cost
//! (CJM) or daily sale rate (TJM) that applies. Overlapping periods are a
//! data error that is resolved deterministically and reported as an
//! [`EngineError::AnomalousState`] value rather than returned as an error.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::EngineError;
use crate::models::{Contributor, EmploymentPeriod};

/// Where a resolved rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// The employment period active at the date.
    EmploymentPeriod,
    /// The contributor-level default (or zero).
    ContributorDefault,
}

/// The daily cost of a contributor at a date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostResolution {
    /// Daily cost after the work-time percentage is applied.
    pub daily_cost: Decimal,
    /// Where the cost came from.
    pub source: RateSource,
    /// Set when more than one employment period matched the date.
    pub anomaly: Option<EngineError>,
}

/// Selects the employment period that applies at `date`.
///
/// When several periods match, the most recently started one wins and an
/// anomaly is returned alongside it.
pub fn select_period(
    contributor: &Contributor,
    date: NaiveDate,
) -> (Option<&EmploymentPeriod>, Option<EngineError>) {
    let candidates = contributor.periods_active_at(date);
    let selected = candidates.iter().copied().max_by_key(|period| period.start_date);

    let anomaly = if candidates.len() > 1 {
        warn!(
            contributor_id = %contributor.id,
            date = %date,
            matching_periods = candidates.len(),
            "Overlapping employment periods, using the most recently started one"
        );
        Some(EngineError::AnomalousState {
            contributor_id: contributor.id.clone(),
            message: format!(
                "{} employment periods are active on {}",
                candidates.len(),
                date
            ),
        })
    } else {
        None
    };

    (selected, anomaly)
}

/// Resolves the daily cost (CJM) of a contributor at `date`.
///
/// The period's own cost is used when it has one, otherwise the
/// contributor default, otherwise zero; the result is scaled by the
/// period's work-time percentage. Without a matching period the
/// contributor default applies unscaled.
///
/// # Example
///
/// ```
/// use profitability_engine::calculation::{resolve_daily_cost, RateSource};
/// use profitability_engine::models::{Contributor, EmploymentPeriod};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let contributor = Contributor {
///     id: "ctb_001".to_string(),
///     active: true,
///     default_daily_cost: Some(Decimal::new(250, 0)),
///     default_daily_rate: None,
///     employment_periods: vec![EmploymentPeriod {
///         start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
///         end_date: None,
///         daily_cost: Some(Decimal::new(400, 0)),
///         daily_rate: None,
///         work_time_percentage: Decimal::new(80, 0),
///         profiles: vec![],
///     }],
/// };
///
/// let resolution = resolve_daily_cost(&contributor, NaiveDate::from_ymd_opt(2025, 6, 2).unwrap());
/// assert_eq!(resolution.daily_cost, Decimal::new(320, 0));
/// assert_eq!(resolution.source, RateSource::EmploymentPeriod);
/// ```
pub fn resolve_daily_cost(contributor: &Contributor, date: NaiveDate) -> CostResolution {
    let default_cost = contributor.default_daily_cost.unwrap_or(Decimal::ZERO);
    let (period, anomaly) = select_period(contributor, date);

    match period {
        Some(period) => {
            let base = period.daily_cost.unwrap_or(default_cost);
            CostResolution {
                daily_cost: base * period.work_time_percentage / Decimal::ONE_HUNDRED,
                source: RateSource::EmploymentPeriod,
                anomaly,
            }
        }
        None => CostResolution {
            daily_cost: default_cost,
            source: RateSource::ContributorDefault,
            anomaly,
        },
    }
}

/// Resolves the daily sale rate (TJM) of a contributor at `date`.
///
/// Period rate, else contributor rate, else zero. The work-time percentage
/// does not apply to sale rates.
pub fn resolve_daily_rate(contributor: &Contributor, date: NaiveDate) -> Decimal {
    let (period, _) = select_period(contributor, date);
    period
        .and_then(|period| period.daily_rate)
        .or(contributor.default_daily_rate)
        .unwrap_or(Decimal::ZERO)
}

/// Contributors indexed by id.
#[derive(Debug, Clone, Default)]
pub struct ContributorDirectory {
    contributors: HashMap<String, Contributor>,
}

impl ContributorDirectory {
    /// Builds a directory. A later contributor with the same id replaces an
    /// earlier one.
    pub fn new<I: IntoIterator<Item = Contributor>>(contributors: I) -> Self {
        Self {
            contributors: contributors
                .into_iter()
                .map(|contributor| (contributor.id.clone(), contributor))
                .collect(),
        }
    }

    /// Looks up a contributor.
    pub fn get(&self, id: &str) -> Option<&Contributor> {
        self.contributors.get(id)
    }

    /// Number of contributors.
    pub fn len(&self) -> usize {
        self.contributors.len()
    }

    /// Returns true when the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.contributors.is_empty()
    }

    /// Number of active contributors.
    pub fn active_count(&self) -> usize {
        self.contributors.values().filter(|c| c.active).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period(
        start: NaiveDate,
        end: Option<NaiveDate>,
        cost: Option<&str>,
        pct: &str,
    ) -> EmploymentPeriod {
        EmploymentPeriod {
            start_date: start,
            end_date: end,
            daily_cost: cost.map(dec),
            daily_rate: None,
            work_time_percentage: dec(pct),
            profiles: vec![],
        }
    }

    fn contributor(periods: Vec<EmploymentPeriod>) -> Contributor {
        Contributor {
            id: "ctb_001".to_string(),
            active: true,
            default_daily_cost: Some(dec("300")),
            default_daily_rate: Some(dec("600")),
            employment_periods: periods,
        }
    }

    #[test]
    fn test_period_cost_scaled_by_work_time() {
        let c = contributor(vec![period(date(2025, 1, 1), None, Some("500"), "50")]);
        let resolution = resolve_daily_cost(&c, date(2025, 2, 3));

        assert_eq!(resolution.daily_cost, dec("250"));
        assert_eq!(resolution.source, RateSource::EmploymentPeriod);
        assert!(resolution.anomaly.is_none());
    }

    #[test]
    fn test_period_without_cost_uses_contributor_default() {
        let c = contributor(vec![period(date(2025, 1, 1), None, None, "80")]);
        let resolution = resolve_daily_cost(&c, date(2025, 2, 3));

        assert_eq!(resolution.daily_cost, dec("240"));
        assert_eq!(resolution.source, RateSource::EmploymentPeriod);
    }

    #[test]
    fn test_no_matching_period_falls_back_to_default() {
        let c = contributor(vec![period(
            date(2025, 1, 1),
            Some(date(2025, 1, 31)),
            Some("500"),
            "100",
        )]);
        let resolution = resolve_daily_cost(&c, date(2025, 2, 3));

        assert_eq!(resolution.daily_cost, dec("300"));
        assert_eq!(resolution.source, RateSource::ContributorDefault);
    }

    #[test]
    fn test_no_default_gives_zero() {
        let mut c = contributor(vec![]);
        c.default_daily_cost = None;
        assert_eq!(resolve_daily_cost(&c, date(2025, 2, 3)).daily_cost, Decimal::ZERO);
    }

    #[test]
    fn test_overlap_picks_most_recent_and_flags_anomaly() {
        let c = contributor(vec![
            period(date(2024, 1, 1), None, Some("400"), "100"),
            period(date(2025, 1, 1), None, Some("450"), "100"),
        ]);
        let resolution = resolve_daily_cost(&c, date(2025, 2, 3));

        assert_eq!(resolution.daily_cost, dec("450"));
        match resolution.anomaly {
            Some(EngineError::AnomalousState { contributor_id, .. }) => {
                assert_eq!(contributor_id, "ctb_001");
            }
            other => panic!("Expected AnomalousState, got {:?}", other),
        }
    }

    #[test]
    fn test_overlap_resolution_ignores_period_order() {
        let a = period(date(2024, 1, 1), None, Some("400"), "100");
        let b = period(date(2025, 1, 1), None, Some("450"), "100");

        let forward = contributor(vec![a.clone(), b.clone()]);
        let backward = contributor(vec![b, a]);

        assert_eq!(
            resolve_daily_cost(&forward, date(2025, 2, 3)).daily_cost,
            resolve_daily_cost(&backward, date(2025, 2, 3)).daily_cost
        );
    }

    #[test]
    fn test_daily_rate_resolution() {
        let mut p = period(date(2025, 1, 1), None, Some("400"), "50");
        p.daily_rate = Some(dec("750"));
        let c = contributor(vec![p]);

        // Sale rate is not scaled by work time
        assert_eq!(resolve_daily_rate(&c, date(2025, 2, 3)), dec("750"));
        assert_eq!(resolve_daily_rate(&c, date(2024, 2, 3)), dec("600"));
    }

    #[test]
    fn test_directory_lookup() {
        let mut inactive = contributor(vec![]);
        inactive.id = "ctb_002".to_string();
        inactive.active = false;

        let directory = ContributorDirectory::new(vec![contributor(vec![]), inactive]);
        assert_eq!(directory.len(), 2);
        assert_eq!(directory.active_count(), 1);
        assert!(directory.get("ctb_002").is_some());
        assert!(directory.get("ctb_404").is_none());
    }
}
