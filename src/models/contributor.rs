//! Contributor and employment period models.
//!
//! This module defines the [`Contributor`] and [`EmploymentPeriod`] types
//! used to resolve a contributor's daily cost (CJM) and daily sale rate
//! (TJM) at a given date.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

fn full_time() -> Decimal {
    dec!(100)
}

/// A dated employment contract for a contributor.
///
/// Periods of the same contributor never overlap; this is enforced by the
/// persistence layer. An open `end_date` means the period is still active.
///
/// # Example
///
/// ```
/// use profitability_engine::models::EmploymentPeriod;
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let period = EmploymentPeriod {
///     start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///     end_date: None,
///     daily_cost: Some(Decimal::new(35000, 2)),
///     daily_rate: None,
///     work_time_percentage: Decimal::new(100, 0),
///     profiles: vec![],
/// };
///
/// assert!(period.is_active_at(NaiveDate::from_ymd_opt(2030, 6, 1).unwrap()));
/// assert!(!period.is_active_at(NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentPeriod {
    /// First day of the period (inclusive).
    pub start_date: NaiveDate,
    /// Last day of the period (inclusive), `None` while still active.
    pub end_date: Option<NaiveDate>,
    /// Daily cost (CJM) for this period, if one was recorded.
    pub daily_cost: Option<Decimal>,
    /// Daily sale rate (TJM) for this period, if one was recorded.
    pub daily_rate: Option<Decimal>,
    /// Share of a full-time schedule worked, in percent.
    #[serde(default = "full_time")]
    pub work_time_percentage: Decimal,
    /// Job profiles attached to the period, most relevant first.
    #[serde(default)]
    pub profiles: Vec<String>,
}

impl EmploymentPeriod {
    /// Returns true when `date` falls inside the period, bounds inclusive.
    pub fn is_active_at(&self, date: NaiveDate) -> bool {
        if date < self.start_date {
            return false;
        }
        self.end_date.is_none_or(|end| date <= end)
    }
}

/// A person whose time is tracked against projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    /// Unique identifier for the contributor.
    pub id: String,
    /// Whether the contributor is currently active.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Contributor-level daily cost used when no period applies.
    pub default_daily_cost: Option<Decimal>,
    /// Contributor-level daily sale rate used when no period applies.
    pub default_daily_rate: Option<Decimal>,
    /// Employment history.
    #[serde(default)]
    pub employment_periods: Vec<EmploymentPeriod>,
}

fn default_active() -> bool {
    true
}

impl Contributor {
    /// Returns every employment period active at `date`.
    ///
    /// More than one entry means the non-overlap invariant is broken.
    pub fn periods_active_at(&self, date: NaiveDate) -> Vec<&EmploymentPeriod> {
        self.employment_periods
            .iter()
            .filter(|period| period.is_active_at(date))
            .collect()
    }
}
