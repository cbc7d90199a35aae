//! Staffing inputs and fact rows.
//!
//! A [`StaffingContributor`] bundles everything the aggregator needs about
//! one contributor; a [`StaffingFactRow`] is one aggregated record for a
//! (contributor, period, profile, granularity) key.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::safe_percentage;
use crate::error::EngineError;

use super::contributor::Contributor;
use super::pipeline::PlanningRecord;
use super::project::TimesheetFact;

/// Periodization unit for staffing aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Seven-day periods.
    Weekly,
    /// Calendar months.
    Monthly,
    /// Calendar quarters.
    Quarterly,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Weekly => write!(f, "weekly"),
            Granularity::Monthly => write!(f, "monthly"),
            Granularity::Quarterly => write!(f, "quarterly"),
        }
    }
}

impl FromStr for Granularity {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weekly" => Ok(Granularity::Weekly),
            "monthly" => Ok(Granularity::Monthly),
            "quarterly" => Ok(Granularity::Quarterly),
            other => Err(EngineError::invalid_argument(
                "granularity",
                format!("'{}' is not one of weekly, monthly, quarterly", other),
            )),
        }
    }
}

/// Approval status of a vacation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VacationStatus {
    /// Awaiting approval.
    Pending,
    /// Approved.
    Approved,
    /// Rejected.
    Rejected,
    /// Withdrawn by the contributor.
    Cancelled,
}

/// A vacation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacationRecord {
    /// First day off (inclusive).
    pub start_date: NaiveDate,
    /// Last day off (inclusive).
    pub end_date: NaiveDate,
    /// Approval status.
    pub status: VacationStatus,
}

impl VacationRecord {
    /// Returns true when the vacation reduces available capacity.
    pub fn is_approved(&self) -> bool {
        self.status == VacationStatus::Approved
    }
}

/// One contributor with the records the staffing aggregator reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffingContributor {
    /// The contributor.
    pub contributor: Contributor,
    /// Vacation requests.
    #[serde(default)]
    pub vacations: Vec<VacationRecord>,
    /// Time entries, any project.
    #[serde(default)]
    pub timesheets: Vec<TimesheetFact>,
    /// Plannings, any project.
    #[serde(default)]
    pub plannings: Vec<PlanningRecord>,
}

/// Uniqueness key of a fact row in the reporting store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FactKey {
    /// The contributor.
    pub contributor_id: String,
    /// First day of the period.
    pub period_start: NaiveDate,
    /// Job profile, if any.
    pub profile: Option<String>,
    /// The period unit.
    pub granularity: Granularity,
}

/// Aggregated staffing metrics for one contributor over one period.
///
/// # Example
///
/// ```
/// use profitability_engine::models::{Granularity, StaffingFactRow};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let row = StaffingFactRow {
///     contributor_id: "ctb_001".to_string(),
///     period_start: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
///     period_end: NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(),
///     granularity: Granularity::Weekly,
///     profile: None,
///     contributor_count: 1,
///     available_days: Decimal::new(5, 0),
///     worked_days: Decimal::new(5, 0),
///     staffed_days: Decimal::new(4, 0),
///     vacation_days: Decimal::ZERO,
///     planned_days: Decimal::new(5, 1),
///     staffing_rate: Decimal::new(80, 0),
///     tace: Decimal::new(80, 0),
/// };
/// assert_eq!(row.occupancy_rate(), Decimal::new(90, 0));
/// assert_eq!(row.remaining_capacity(), Decimal::new(5, 1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffingFactRow {
    /// The contributor.
    pub contributor_id: String,
    /// First day of the period.
    pub period_start: NaiveDate,
    /// Last day of the period.
    pub period_end: NaiveDate,
    /// The period unit.
    pub granularity: Granularity,
    /// Job profile of the employment period active at the period start.
    pub profile: Option<String>,
    /// Contributors aggregated in this row (always 1 at this level).
    pub contributor_count: u32,
    /// Working days minus approved vacation days.
    pub available_days: Decimal,
    /// Days worked; equal to available days.
    pub worked_days: Decimal,
    /// Timesheet hours converted to days.
    pub staffed_days: Decimal,
    /// Approved vacation days on working days.
    pub vacation_days: Decimal,
    /// Days scheduled by committed plannings.
    pub planned_days: Decimal,
    /// Staffed over available days, in percent.
    pub staffing_rate: Decimal,
    /// Staffed over worked days, in percent.
    pub tace: Decimal,
}

impl StaffingFactRow {
    /// Returns (staffed + planned) / available, in percent, 2 decimals.
    pub fn occupancy_rate(&self) -> Decimal {
        safe_percentage(self.staffed_days + self.planned_days, self.available_days)
    }

    /// Returns the days still free in the period, never negative.
    pub fn remaining_capacity(&self) -> Decimal {
        (self.available_days - self.staffed_days - self.planned_days).max(Decimal::ZERO)
    }

    /// Returns the uniqueness key of the row.
    pub fn key(&self) -> FactKey {
        FactKey {
            contributor_id: self.contributor_id.clone(),
            period_start: self.period_start,
            profile: self.profile.clone(),
            granularity: self.granularity,
        }
    }
}
