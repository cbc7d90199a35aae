//! Rounding and zero-guarded division helpers.
//!
//! Every figure the engine reports goes through these helpers so that the
//! rounding mode is the same everywhere: half away from zero.

use rust_decimal::{Decimal, RoundingStrategy};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Rounds to `dp` decimal places, half away from zero.
pub fn round_dp(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

/// Rounds a monetary amount to 2 decimal places, half away from zero.
///
/// # Example
///
/// ```
/// use profitability_engine::calculation::round_money;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let cjm = Decimal::from_str("324.7465").unwrap();
/// assert_eq!(round_money(cjm), Decimal::from_str("324.75").unwrap());
///
/// let negative = Decimal::from_str("-0.125").unwrap();
/// assert_eq!(round_money(negative), Decimal::from_str("-0.13").unwrap());
/// ```
pub fn round_money(value: Decimal) -> Decimal {
    round_dp(value, 2)
}

/// Divides, returning zero when the denominator is zero.
pub fn safe_ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        Decimal::ZERO
    } else {
        numerator / denominator
    }
}

/// Returns `numerator / denominator × 100` rounded to 2 decimals, or zero
/// when the denominator is zero.
///
/// # Example
///
/// ```
/// use profitability_engine::calculation::safe_percentage;
/// use rust_decimal::Decimal;
///
/// assert_eq!(safe_percentage(Decimal::new(1, 0), Decimal::new(3, 0)), Decimal::new(3333, 2));
/// assert_eq!(safe_percentage(Decimal::new(5, 0), Decimal::ZERO), Decimal::ZERO);
/// ```
pub fn safe_percentage(numerator: Decimal, denominator: Decimal) -> Decimal {
    round_money(safe_ratio(numerator, denominator) * HUNDRED)
}
