//! Hour and day conversions.
//!
//! The engine uses a fixed ratio of 8 hours per day everywhere. Dividing a
//! decimal by 8 always terminates, so conversions are exact and converting
//! back and forth never loses precision.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};

use super::calendar::working_days_between;

/// Hours in one working day.
pub const HOURS_PER_DAY: Decimal = Decimal::from_parts(8, 0, 0, false, 0);

/// Converts hours to days.
///
/// # Example
///
/// ```
/// use profitability_engine::calculation::{days_to_hours, hours_to_days};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let hours = Decimal::from_str("7.25").unwrap();
/// let days = hours_to_days(hours);
/// assert_eq!(days, Decimal::from_str("0.90625").unwrap());
/// assert_eq!(days_to_hours(days), hours);
/// ```
pub fn hours_to_days(hours: Decimal) -> Decimal {
    hours / HOURS_PER_DAY
}

/// Converts days to hours.
pub fn days_to_hours(days: Decimal) -> Decimal {
    days * HOURS_PER_DAY
}

/// Returns the hours expected over `[start, end]` at `daily_hours` per
/// working day (Monday to Friday).
pub fn theoretical_hours(start: NaiveDate, end: NaiveDate, daily_hours: Decimal) -> Decimal {
    Decimal::from(working_days_between(start, end)) * daily_hours
}

/// Parses a duration typed by a user and returns it in hours.
///
/// A `j` or `d` suffix means days, an `h` suffix means hours, and a bare
/// number is read as hours. A comma is accepted as decimal separator.
///
/// # Errors
///
/// Returns [`EngineError::InvalidArgument`] when the input is not a number
/// or is negative.
///
/// # Example
///
/// ```
/// use profitability_engine::calculation::parse_duration_input;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// assert_eq!(parse_duration_input("1.5j").unwrap(), Decimal::from_str("12").unwrap());
/// assert_eq!(parse_duration_input("7,5h").unwrap(), Decimal::from_str("7.5").unwrap());
/// assert_eq!(parse_duration_input("4").unwrap(), Decimal::from_str("4").unwrap());
/// ```
pub fn parse_duration_input(input: &str) -> EngineResult<Decimal> {
    let normalized = input.trim().to_lowercase().replace(',', ".");

    let (number, in_days) = if let Some(days) = normalized
        .strip_suffix('j')
        .or_else(|| normalized.strip_suffix('d'))
    {
        (days.trim_end(), true)
    } else if let Some(hours) = normalized.strip_suffix('h') {
        (hours.trim_end(), false)
    } else {
        (normalized.as_str(), false)
    };

    let value: Decimal = number.parse().map_err(|_| {
        EngineError::invalid_argument("duration", format!("'{}' is not a duration", input))
    })?;

    if value.is_sign_negative() && !value.is_zero() {
        return Err(EngineError::invalid_argument(
            "duration",
            format!("'{}' is negative", input),
        ));
    }

    Ok(if in_days { days_to_hours(value) } else { value })
}
