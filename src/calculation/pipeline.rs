//! Pipeline and workload prediction.
//!
//! Scores pending quotes by win probability, projects the workload they
//! would bring on top of the confirmed plannings (and, on request, the
//! confirmed orders), and flags months where the team would be overloaded
//! or underused.

use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PipelineSettings;
use crate::models::{
    ConfirmedOrder, Contributor, LineType, OrderLine, OrderStatus, PendingQuote, PlanningRecord,
    Severity, YearMonth,
};

use super::calendar::working_days_between;
use super::rounding::{round_dp, safe_percentage, safe_ratio};
use super::time_conversion::HOURS_PER_DAY;

/// Conversion rate assumed when there is no order history.
pub const DEFAULT_CONVERSION_RATE: Decimal = Decimal::from_parts(50, 0, 0, false, 0);

const BASE_PROBABILITY: Decimal = Decimal::from_parts(50, 0, 0, false, 0);
const CLIENT_RATE_WEIGHT: Decimal = Decimal::from_parts(3, 0, 0, false, 1);
const SALESPERSON_RATE_WEIGHT: Decimal = Decimal::from_parts(2, 0, 0, false, 1);
const DAYS_PER_SPREAD_MONTH: i64 = 30;
const CONFIRMED_ORDER_DEFAULT_MONTHS: u32 = 3;

/// A pending quote with its computed win probability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteAnalysis {
    /// Order reference number.
    pub reference: String,
    /// Days since the quote was created.
    pub days_old: i64,
    /// Total amount of the quote.
    pub amount: Decimal,
    /// Win probability in percent, 1 decimal.
    pub win_probability: Decimal,
    /// Service days of the quote kept by the filter.
    pub total_days: Decimal,
}

/// Whether a month has too much or too little work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadAlertKind {
    /// Load above capacity.
    Overload,
    /// Load below half of capacity.
    Underload,
}

/// A capacity alert for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadAlert {
    /// The month concerned.
    pub month: YearMonth,
    /// Overload or underload.
    pub kind: WorkloadAlertKind,
    /// Critical above 120%, high above 100%, medium for underload.
    pub severity: Severity,
    /// Load over capacity, in percent, 1 decimal.
    pub capacity_rate: Decimal,
}

/// Projected load for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyWorkload {
    /// The month.
    pub month: YearMonth,
    /// Probability-weighted days from pending quotes.
    pub potential_days: Decimal,
    /// Days from committed plannings and, when requested, confirmed orders.
    pub confirmed_days: Decimal,
    /// Load over team capacity, in percent, 1 decimal.
    pub capacity_rate: Decimal,
}

/// Result of a pipeline analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineAnalysis {
    /// Quotes with days to deliver, most likely first.
    pub quotes: Vec<QuoteAnalysis>,
    /// Σ days × probability over the quotes above the probability
    /// threshold, 1 decimal.
    pub total_potential_days: Decimal,
    /// Monthly team capacity, in days.
    pub team_capacity: Decimal,
    /// Monthly load, in month order.
    pub workload: Vec<MonthlyWorkload>,
    /// Months flagged as overloaded or underused.
    pub alerts: Vec<WorkloadAlert>,
}

/// Restricts a workload analysis to some profiles or contributors.
///
/// Only service lines with days are counted. When profiles are set, lines
/// sold for another profile are skipped; lines without a profile are always
/// kept. Selecting contributors restricts the profiles to theirs and keeps
/// only their plannings.
///
/// # Example
///
/// ```
/// use profitability_engine::calculation::WorkloadFilter;
/// use profitability_engine::models::{LineType, OrderLine};
/// use rust_decimal::Decimal;
///
/// let filter = WorkloadFilter::new(vec!["designer".to_string()], &[]);
/// let line = OrderLine {
///     line_type: LineType::Service,
///     days: Decimal::new(5, 0),
///     daily_rate: Decimal::new(600, 0),
///     purchase_amount: None,
///     profile: Some("developer".to_string()),
/// };
/// assert!(!filter.includes_line(&line));
/// assert!(WorkloadFilter::all().includes_line(&line));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkloadFilter {
    profiles: Vec<String>,
    contributor_ids: Vec<String>,
}

impl WorkloadFilter {
    /// A filter keeping every service line and every planning.
    pub fn all() -> Self {
        Self::default()
    }

    /// Builds a filter from profile ids and the selected contributors.
    ///
    /// The profiles of the contributors' employment periods replace
    /// `profiles` when it is empty and are intersected with it otherwise.
    pub fn new(profiles: Vec<String>, contributors: &[Contributor]) -> Self {
        let mut contributor_profiles: Vec<String> = contributors
            .iter()
            .flat_map(|c| c.employment_periods.iter())
            .flat_map(|period| period.profiles.iter().cloned())
            .collect();
        contributor_profiles.sort();
        contributor_profiles.dedup();

        let profiles = if contributor_profiles.is_empty() {
            profiles
        } else if profiles.is_empty() {
            contributor_profiles
        } else {
            profiles
                .into_iter()
                .filter(|profile| contributor_profiles.contains(profile))
                .collect()
        };

        Self {
            profiles,
            contributor_ids: contributors.iter().map(|c| c.id.clone()).collect(),
        }
    }

    /// Returns true when the line's days count as workload.
    pub fn includes_line(&self, line: &OrderLine) -> bool {
        if line.line_type != LineType::Service || line.days.is_zero() {
            return false;
        }
        self.profiles.is_empty()
            || line
                .profile
                .as_ref()
                .is_none_or(|profile| self.profiles.contains(profile))
    }

    /// Returns true when the planning's contributor is selected.
    pub fn includes_planning(&self, planning: &PlanningRecord) -> bool {
        self.contributor_ids.is_empty() || self.contributor_ids.contains(&planning.contributor_id)
    }
}

/// Inputs of a filtered pipeline analysis.
#[derive(Debug, Clone, Copy)]
pub struct PipelineRequest<'a> {
    /// Quotes awaiting signature.
    pub quotes: &'a [PendingQuote],
    /// Planning records of the team; cancelled ones are ignored.
    pub plannings: &'a [PlanningRecord],
    /// Signed and won orders, loaded only when `include_confirmed` is set.
    pub confirmed_orders: &'a [ConfirmedOrder],
    /// Whether confirmed orders add to the confirmed load.
    pub include_confirmed: bool,
    /// Profile and contributor restriction.
    pub filter: &'a WorkloadFilter,
    /// Number of active contributors, for capacity.
    pub active_contributors: usize,
    /// Reference date for quote age and the first month of plannings.
    pub as_of: NaiveDate,
}

/// Estimates the probability (0 to 100) that a quote gets signed.
///
/// Starts at 50, adds 0.3 × (client rate − 50) and 0.2 × (salesperson
/// rate − 50) when those rates are known, then adjusts for the quote's age
/// and amount.
///
/// # Example
///
/// ```
/// use profitability_engine::calculation::win_probability;
/// use profitability_engine::models::PendingQuote;
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let quote = PendingQuote {
///     reference: "D-2025-042".to_string(),
///     created_at: NaiveDate::from_ymd_opt(2025, 6, 12).unwrap(),
///     total_amount: Decimal::new(8000, 0),
///     sections: vec![],
///     client_conversion_rate: None,
///     salesperson_conversion_rate: None,
///     project_start_date: None,
///     project_end_date: None,
/// };
///
/// // 50 + 5 (fresh) + 10 (small amount)
/// let as_of = NaiveDate::from_ymd_opt(2025, 6, 16).unwrap();
/// assert_eq!(win_probability(&quote, as_of), Decimal::new(65, 0));
/// ```
pub fn win_probability(quote: &PendingQuote, as_of: NaiveDate) -> Decimal {
    let mut probability = BASE_PROBABILITY;

    if let Some(rate) = quote.client_conversion_rate {
        probability += (rate - dec!(50)) * CLIENT_RATE_WEIGHT;
    }
    if let Some(rate) = quote.salesperson_conversion_rate {
        probability += (rate - dec!(50)) * SALESPERSON_RATE_WEIGHT;
    }

    let days_old = (as_of - quote.created_at).num_days();
    if days_old > 60 {
        probability -= dec!(20);
    } else if days_old > 30 {
        probability -= dec!(10);
    } else if days_old < 7 {
        probability += dec!(5);
    }

    if quote.total_amount > dec!(100000) {
        probability -= dec!(15);
    } else if quote.total_amount > dec!(50000) {
        probability -= dec!(5);
    } else if quote.total_amount < dec!(10000) {
        probability += dec!(10);
    }

    round_dp(probability.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED), 1)
}

/// Share of orders that were won, in percent, 2 decimals.
///
/// Won, signed and completed orders count as converted. Returns
/// [`DEFAULT_CONVERSION_RATE`] when there is no history.
pub fn conversion_rate(statuses: &[OrderStatus]) -> Decimal {
    if statuses.is_empty() {
        return DEFAULT_CONVERSION_RATE;
    }
    let converted = statuses.iter().filter(|s| s.counts_as_revenue()).count();
    safe_percentage(Decimal::from(converted), Decimal::from(statuses.len()))
}

/// Sums the days of the lines the filter keeps.
pub fn projected_days<'a, I>(lines: I, filter: &WorkloadFilter) -> Decimal
where
    I: IntoIterator<Item = &'a OrderLine>,
{
    lines
        .into_iter()
        .filter(|line| filter.includes_line(line))
        .map(|line| line.days)
        .sum()
}

fn months_between(start: YearMonth, end: YearMonth) -> impl Iterator<Item = YearMonth> {
    let span = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    (0..=span.max(-1)).map(move |offset| start.plus_months(offset as u32))
}

fn months_to_spread(duration_days: i64) -> i64 {
    (duration_days.max(0) + DAYS_PER_SPREAD_MONTH - 1) / DAYS_PER_SPREAD_MONTH
}

/// Adds `days` evenly over `months` months from the month of `start`.
fn spread_evenly(
    days: Decimal,
    start: NaiveDate,
    months: i64,
    load: &mut BTreeMap<YearMonth, Decimal>,
) {
    let per_month = days / Decimal::from(months);
    let first = YearMonth::from_date(start);
    for offset in 0..months {
        *load.entry(first.plus_months(offset as u32)).or_default() += per_month;
    }
}

/// Spreads a quote's weighted days over the first months of its project.
///
/// Quotes whose project has no start date add no monthly load.
fn spread_quote(
    quote: &PendingQuote,
    days: Decimal,
    probability: Decimal,
    settings: &PipelineSettings,
    load: &mut BTreeMap<YearMonth, Decimal>,
) {
    let Some(start) = quote.project_start_date else {
        return;
    };
    let duration = match quote.project_end_date {
        Some(end) => (end - start).num_days(),
        None => settings.default_project_duration_days,
    };
    let months = months_to_spread(duration).clamp(1, i64::from(settings.spread_months.max(1)));

    spread_evenly(days * probability / Decimal::ONE_HUNDRED, start, months, load);
}

/// Spreads a confirmed order's days over the whole duration of its project.
fn spread_confirmed_order(
    confirmed: &ConfirmedOrder,
    filter: &WorkloadFilter,
    load: &mut BTreeMap<YearMonth, Decimal>,
) {
    let Some(start) = confirmed.project_start_date else {
        return;
    };
    let end = confirmed
        .project_end_date
        .or_else(|| start.checked_add_months(Months::new(CONFIRMED_ORDER_DEFAULT_MONTHS)))
        .unwrap_or(start);

    let days = projected_days(confirmed.order.lines(), filter);
    if days <= Decimal::ZERO {
        return;
    }
    let months = months_to_spread((end - start).num_days()).max(1);
    spread_evenly(days, start, months, load);
}

/// Adds a planning's days, month by month, from `from` onwards.
fn spread_planning(
    planning: &PlanningRecord,
    from: NaiveDate,
    load: &mut BTreeMap<YearMonth, Decimal>,
) {
    let start = planning.start_date.max(from);
    if planning.end_date < start {
        return;
    }
    let day_ratio = planning.daily_hours / HOURS_PER_DAY;
    let months = months_between(
        YearMonth::from_date(start),
        YearMonth::from_date(planning.end_date),
    );

    for month in months {
        let (Some(first), Some(last)) = (month.first_day(), month.last_day()) else {
            continue;
        };
        let days = working_days_between(start.max(first), planning.end_date.min(last));
        if days > 0 {
            *load.entry(month).or_default() += Decimal::from(days) * day_ratio;
        }
    }
}

fn alert_for(month: YearMonth, capacity_rate: Decimal) -> Option<WorkloadAlert> {
    let (kind, severity) = if capacity_rate > dec!(120) {
        (WorkloadAlertKind::Overload, Severity::Critical)
    } else if capacity_rate > Decimal::ONE_HUNDRED {
        (WorkloadAlertKind::Overload, Severity::High)
    } else if capacity_rate < dec!(50) {
        (WorkloadAlertKind::Underload, Severity::Medium)
    } else {
        return None;
    };
    Some(WorkloadAlert {
        month,
        kind,
        severity,
        capacity_rate,
    })
}

/// Analyses pending quotes against the team's committed workload.
///
/// Every service line and every planning is counted, and confirmed orders
/// are left out. See [`analyze_pipeline_request`] for the filtered form.
///
/// # Arguments
///
/// * `quotes` - Quotes awaiting signature
/// * `plannings` - Planning records of the team; cancelled ones are ignored
/// * `active_contributors` - Number of active contributors, for capacity
/// * `as_of` - Reference date for quote age and the first month of plannings
/// * `settings` - Pipeline settings
///
/// # Returns
///
/// The scored quotes, the monthly workload (every month with potential or
/// confirmed load) and the capacity alerts.
pub fn analyze_pipeline(
    quotes: &[PendingQuote],
    plannings: &[PlanningRecord],
    active_contributors: usize,
    as_of: NaiveDate,
    settings: &PipelineSettings,
) -> PipelineAnalysis {
    let filter = WorkloadFilter::all();
    let request = PipelineRequest {
        quotes,
        plannings,
        confirmed_orders: &[],
        include_confirmed: false,
        filter: &filter,
        active_contributors,
        as_of,
    };
    analyze_pipeline_request(&request, settings)
}

/// Analyses the pipeline with a profile/contributor filter and, when
/// requested, the load of confirmed orders.
///
/// Quotes with no kept service days are dropped. Only quotes above the
/// probability threshold load the team and count in the potential total.
/// Confirmed orders must be signed or won; those without a project start
/// date are skipped, and a missing end date means three months.
pub fn analyze_pipeline_request(
    request: &PipelineRequest<'_>,
    settings: &PipelineSettings,
) -> PipelineAnalysis {
    let as_of = request.as_of;
    let mut analysed: Vec<QuoteAnalysis> = Vec::new();
    let mut potential: BTreeMap<YearMonth, Decimal> = BTreeMap::new();
    let mut total_potential_days = Decimal::ZERO;

    for quote in request.quotes {
        let days = projected_days(quote.lines(), request.filter);
        if days <= Decimal::ZERO {
            continue;
        }
        let probability = win_probability(quote, as_of);

        if probability > settings.probability_threshold {
            spread_quote(quote, days, probability, settings, &mut potential);
            total_potential_days += days * probability / Decimal::ONE_HUNDRED;
        }

        analysed.push(QuoteAnalysis {
            reference: quote.reference.clone(),
            days_old: (as_of - quote.created_at).num_days(),
            amount: quote.total_amount,
            win_probability: probability,
            total_days: days,
        });
    }
    analysed.sort_by(|a, b| b.win_probability.cmp(&a.win_probability));

    let month_start = as_of.with_day(1).unwrap_or(as_of);
    let mut confirmed: BTreeMap<YearMonth, Decimal> = BTreeMap::new();
    for planning in request.plannings.iter().filter(|p| {
        p.status.is_committed() && p.end_date >= month_start && request.filter.includes_planning(p)
    }) {
        spread_planning(planning, month_start, &mut confirmed);
    }

    if request.include_confirmed {
        for order in request
            .confirmed_orders
            .iter()
            .filter(|c| matches!(c.order.status, OrderStatus::Signed | OrderStatus::Won))
        {
            spread_confirmed_order(order, request.filter, &mut confirmed);
        }
    }

    let team_capacity = settings.team_capacity(request.active_contributors);
    let mut months: Vec<YearMonth> = potential.keys().chain(confirmed.keys()).copied().collect();
    months.sort();
    months.dedup();

    let mut workload = Vec::with_capacity(months.len());
    let mut alerts = Vec::new();
    for month in months {
        let potential_days = potential.get(&month).copied().unwrap_or_default();
        let confirmed_days = confirmed.get(&month).copied().unwrap_or_default();
        let capacity_rate = round_dp(
            safe_ratio(potential_days + confirmed_days, team_capacity) * Decimal::ONE_HUNDRED,
            1,
        );

        if let Some(alert) = alert_for(month, capacity_rate) {
            alerts.push(alert);
        }
        workload.push(MonthlyWorkload {
            month,
            potential_days: round_dp(potential_days, 1),
            confirmed_days: round_dp(confirmed_days, 1),
            capacity_rate,
        });
    }

    debug!(
        quotes = analysed.len(),
        months = workload.len(),
        alerts = alerts.len(),
        include_confirmed = request.include_confirmed,
        team_capacity = %team_capacity,
        "Analysed pipeline"
    );

    PipelineAnalysis {
        quotes: analysed,
        total_potential_days: round_dp(total_potential_days, 1),
        team_capacity,
        workload,
        alerts,
    }
}
