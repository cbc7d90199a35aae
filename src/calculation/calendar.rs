//! Working calendar functionality.
//!
//! This module counts weekends, French public holidays and working days,
//! both for a whole year (used to derive the daily cost) and for arbitrary
//! date ranges (used for period costs and capacity).
//!
//! The two counts differ on purpose: the annual count removes public
//! holidays, paid leave and RTT days, while [`working_days_between`] counts
//! Monday to Friday only.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::config::CompanyCostSettings;
use crate::error::{EngineError, EngineResult};

/// A public holiday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicHoliday {
    /// The date of the holiday.
    pub date: NaiveDate,
    /// The name of the holiday.
    pub name: String,
}

/// Breakdown of the days of a year.
///
/// `working_days = total_days - weekend_days - public_holidays -
/// paid_leave_days - rtt_days`, never below 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingCalendar {
    /// The calendar year.
    pub year: i32,
    /// Days in the year (365 or 366).
    pub total_days: u32,
    /// Saturdays and Sundays.
    pub weekend_days: u32,
    /// Public holidays falling on a weekday.
    pub public_holidays: u32,
    /// Paid leave days granted by the company.
    pub paid_leave_days: u32,
    /// RTT days granted by the company.
    pub rtt_days: u32,
    /// Resulting working days.
    pub working_days: u32,
}

/// Returns true for Saturdays and Sundays.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Computes Easter Sunday with the Meeus/Jones/Butcher algorithm.
///
/// Returns `None` only for years chrono cannot represent.
///
/// # Example
///
/// ```
/// use profitability_engine::calculation::easter_date;
/// use chrono::NaiveDate;
///
/// assert_eq!(easter_date(2024), NaiveDate::from_ymd_opt(2024, 3, 31));
/// assert_eq!(easter_date(2025), NaiveDate::from_ymd_opt(2025, 4, 20));
/// ```
pub fn easter_date(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;

    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

/// Returns the 11 French public holidays of `year`, in calendar order.
pub fn public_holidays(year: i32) -> Vec<PublicHoliday> {
    let fixed = |month: u32, day: u32, name: &str| {
        NaiveDate::from_ymd_opt(year, month, day).map(|date| PublicHoliday {
            date,
            name: name.to_string(),
        })
    };
    let after_easter = |offset: u64, name: &str| {
        easter_date(year)
            .and_then(|easter| easter.checked_add_days(Days::new(offset)))
            .map(|date| PublicHoliday {
                date,
                name: name.to_string(),
            })
    };

    let mut holidays: Vec<PublicHoliday> = [
        fixed(1, 1, "New Year's Day"),
        after_easter(1, "Easter Monday"),
        fixed(5, 1, "Labour Day"),
        fixed(5, 8, "Victory in Europe Day"),
        after_easter(39, "Ascension Day"),
        after_easter(50, "Whit Monday"),
        fixed(7, 14, "Bastille Day"),
        fixed(8, 15, "Assumption Day"),
        fixed(11, 1, "All Saints' Day"),
        fixed(11, 11, "Armistice Day"),
        fixed(12, 25, "Christmas Day"),
    ]
    .into_iter()
    .flatten()
    .collect();

    holidays.sort_by_key(|holiday| holiday.date);
    holidays
}

/// Counts Monday to Friday days in `[start, end]`, ignoring holidays.
///
/// Returns 0 when `end` is before `start`.
///
/// # Example
///
/// ```
/// use profitability_engine::calculation::working_days_between;
/// use chrono::NaiveDate;
///
/// let monday = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
/// let sunday = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
/// assert_eq!(working_days_between(monday, sunday), 5);
/// ```
pub fn working_days_between(start: NaiveDate, end: NaiveDate) -> u32 {
    if end < start {
        return 0;
    }

    let span = (end - start).num_days() + 1;
    let full_weeks = span / 7;
    let mut count = full_weeks * 5;

    // Remaining days after the full weeks, starting on the same weekday as `start`.
    let start_offset = start.weekday().num_days_from_monday() as i64;
    for i in 0..(span % 7) {
        if (start_offset + i) % 7 < 5 {
            count += 1;
        }
    }

    count as u32
}

/// Builds the working calendar of `year` for the given company settings.
///
/// # Errors
///
/// Returns [`EngineError::InvalidArgument`] for years outside chrono's range.
///
/// # Example
///
/// ```
/// use profitability_engine::calculation::working_calendar;
/// use profitability_engine::config::CompanyCostSettings;
///
/// let calendar = working_calendar(2025, &CompanyCostSettings::default()).unwrap();
/// assert_eq!(calendar.total_days, 365);
/// assert_eq!(calendar.weekend_days, 104);
/// assert_eq!(calendar.public_holidays, 10);
/// assert_eq!(calendar.working_days, 216);
/// ```
pub fn working_calendar(
    year: i32,
    settings: &CompanyCostSettings,
) -> EngineResult<WorkingCalendar> {
    let invalid_year =
        || EngineError::invalid_argument("year", format!("{} is not a supported year", year));
    let first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid_year)?;
    let last = NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(invalid_year)?;

    let total_days = last.ordinal();
    let weekend_days = total_days - working_days_between(first, last);
    let public_holidays = public_holidays(year)
        .iter()
        .filter(|holiday| !is_weekend(holiday.date))
        .count() as u32;

    let remaining = total_days as i64
        - weekend_days as i64
        - public_holidays as i64
        - settings.annual_paid_leave_days as i64
        - settings.annual_rtt_days as i64;

    Ok(WorkingCalendar {
        year,
        total_days,
        weekend_days,
        public_holidays,
        paid_leave_days: settings.annual_paid_leave_days,
        rtt_days: settings.annual_rtt_days,
        working_days: remaining.max(1) as u32,
    })
}

/// Returns the number of working days in `year` for the given settings.
pub fn working_days_in_year(year: i32, settings: &CompanyCostSettings) -> EngineResult<u32> {
    working_calendar(year, settings).map(|calendar| calendar.working_days)
}
