//! Daily cost (CJM) derivation.
//!
//! Converts a monthly gross salary into the average daily cost of a
//! contributor to the company, using the company coefficients and the
//! working calendar of the year.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::CompanyCostSettings;
use crate::error::{EngineError, EngineResult};
use crate::models::AuditTrace;

use super::calendar::{WorkingCalendar, working_calendar};
use super::rounding::round_money;

const MONTHS_PER_YEAR: Decimal = Decimal::from_parts(12, 0, 0, false, 0);

/// The result of deriving a daily cost from a monthly salary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCostResult {
    /// The monthly gross salary supplied.
    pub monthly_salary: Decimal,
    /// Monthly salary × 12.
    pub annual_salary: Decimal,
    /// Structure × employer charges coefficient, 4 decimals.
    pub global_coefficient: Decimal,
    /// Annual salary × global coefficient.
    pub annual_cost: Decimal,
    /// Working days of the year.
    pub working_days: u32,
    /// Annual cost / working days, 2 decimals.
    pub daily_cost: Decimal,
    /// How the figure was derived.
    pub audit: AuditTrace,
}

/// The calendar and coefficients behind a daily cost, for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCostReport {
    /// Day counts of the year.
    pub calendar: WorkingCalendar,
    /// Overhead coefficient.
    pub structure_cost_coefficient: Decimal,
    /// Employer charges coefficient.
    pub employer_charges_coefficient: Decimal,
    /// Product of the two coefficients, 4 decimals.
    pub global_coefficient: Decimal,
}

/// Derives the daily cost (CJM) of a contributor from a monthly salary.
///
/// `cjm = monthly_salary × 12 × global_coefficient / working_days(year)`,
/// rounded to 2 decimals half away from zero.
///
/// # Arguments
///
/// * `monthly_salary` - Monthly gross salary
/// * `year` - The year whose working calendar applies
/// * `settings` - Company coefficients and leave allowances
///
/// # Errors
///
/// Returns [`EngineError::InvalidArgument`] for a negative salary or an
/// unsupported year.
///
/// # Example
///
/// ```
/// use profitability_engine::calculation::cjm_from_monthly_salary;
/// use profitability_engine::config::CompanyCostSettings;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let result = cjm_from_monthly_salary(
///     Decimal::from_str("3000").unwrap(),
///     2025,
///     &CompanyCostSettings::default(),
/// ).unwrap();
///
/// assert_eq!(result.annual_cost, Decimal::from_str("70470").unwrap());
/// assert_eq!(result.working_days, 216);
/// assert_eq!(result.daily_cost, Decimal::from_str("326.25").unwrap());
/// ```
pub fn cjm_from_monthly_salary(
    monthly_salary: Decimal,
    year: i32,
    settings: &CompanyCostSettings,
) -> EngineResult<DailyCostResult> {
    if monthly_salary.is_sign_negative() && !monthly_salary.is_zero() {
        return Err(EngineError::invalid_argument(
            "monthly_salary",
            format!("{} is negative", monthly_salary),
        ));
    }

    let calendar = working_calendar(year, settings)?;
    let mut audit = AuditTrace::default();

    let annual_salary = monthly_salary * MONTHS_PER_YEAR;
    audit.record(
        "annual_salary",
        "Annual Salary",
        serde_json::json!({ "monthly_salary": monthly_salary.to_string() }),
        serde_json::json!({ "annual_salary": annual_salary.to_string() }),
        format!("{} x 12 months = {}", monthly_salary, annual_salary),
    );

    let global_coefficient = settings.global_coefficient();
    let annual_cost = annual_salary * global_coefficient;
    audit.record(
        "annual_cost",
        "Annual Cost",
        serde_json::json!({
            "annual_salary": annual_salary.to_string(),
            "structure_cost_coefficient": settings.structure_cost_coefficient.to_string(),
            "employer_charges_coefficient": settings.employer_charges_coefficient.to_string(),
        }),
        serde_json::json!({
            "global_coefficient": global_coefficient.to_string(),
            "annual_cost": annual_cost.to_string(),
        }),
        format!("{} x {} = {}", annual_salary, global_coefficient, annual_cost),
    );

    // working_days is at least 1
    let daily_cost = round_money(annual_cost / Decimal::from(calendar.working_days));
    audit.record(
        "daily_cost",
        "Daily Cost",
        serde_json::json!({
            "annual_cost": annual_cost.to_string(),
            "total_days": calendar.total_days,
            "weekend_days": calendar.weekend_days,
            "public_holidays": calendar.public_holidays,
            "paid_leave_days": calendar.paid_leave_days,
            "rtt_days": calendar.rtt_days,
        }),
        serde_json::json!({
            "working_days": calendar.working_days,
            "daily_cost": daily_cost.to_string(),
        }),
        format!(
            "{} / {} working days = {}",
            annual_cost, calendar.working_days, daily_cost
        ),
    );

    Ok(DailyCostResult {
        monthly_salary,
        annual_salary,
        global_coefficient,
        annual_cost,
        working_days: calendar.working_days,
        daily_cost,
        audit,
    })
}

/// Returns the working calendar and coefficients used for `year`.
pub fn daily_cost_report(
    year: i32,
    settings: &CompanyCostSettings,
) -> EngineResult<DailyCostReport> {
    Ok(DailyCostReport {
        calendar: working_calendar(year, settings)?,
        structure_cost_coefficient: settings.structure_cost_coefficient,
        employer_charges_coefficient: settings.employer_charges_coefficient,
        global_coefficient: settings.global_coefficient(),
    })
}
