//! Revenue forecasting.
//!
//! Forecasts monthly revenue from history by combining a weighted moving
//! average of the last three months, a 2% monthly growth assumption and a
//! per-calendar-month seasonal factor.

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{EngineError, EngineResult};
use crate::models::{MonthlyRevenue, YearMonth};

use super::rounding::{round_dp, round_money};

/// Minimum number of months of history a forecast needs.
pub const MINIMUM_HISTORY_MONTHS: usize = 6;

const MONTHLY_GROWTH: Decimal = Decimal::from_parts(2, 0, 0, false, 2);
const NEAR_TERM_BAND: Decimal = Decimal::from_parts(15, 0, 0, false, 2);
const FAR_TERM_BAND: Decimal = Decimal::from_parts(25, 0, 0, false, 2);

/// How many months ahead to forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ForecastHorizon {
    /// Three months.
    Quarter,
    /// Six months.
    HalfYear,
    /// Twelve months.
    Year,
}

impl ForecastHorizon {
    /// Number of months covered.
    pub fn months(self) -> u32 {
        match self {
            ForecastHorizon::Quarter => 3,
            ForecastHorizon::HalfYear => 6,
            ForecastHorizon::Year => 12,
        }
    }
}

impl TryFrom<u32> for ForecastHorizon {
    type Error = EngineError;

    fn try_from(months: u32) -> Result<Self, Self::Error> {
        match months {
            3 => Ok(ForecastHorizon::Quarter),
            6 => Ok(ForecastHorizon::HalfYear),
            12 => Ok(ForecastHorizon::Year),
            other => Err(EngineError::invalid_argument(
                "horizon",
                format!("{} months is not one of 3, 6, 12", other),
            )),
        }
    }
}

impl From<ForecastHorizon> for u32 {
    fn from(horizon: ForecastHorizon) -> Self {
        horizon.months()
    }
}

/// Direction of the recent revenue trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    /// Last three months more than 10% above the three before.
    Growth,
    /// Last three months more than 10% below the three before.
    Decline,
    /// Within ±10%.
    Stable,
    /// Fewer than three months of data.
    InsufficientData,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrendDirection::Growth => write!(f, "growth"),
            TrendDirection::Decline => write!(f, "decline"),
            TrendDirection::Stable => write!(f, "stable"),
            TrendDirection::InsufficientData => write!(f, "insufficient_data"),
        }
    }
}

/// Forecast for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyForecast {
    /// The forecast month.
    pub month: YearMonth,
    /// Predicted revenue, 2 decimals.
    pub predicted_revenue: Decimal,
    /// Lower bound of the confidence band.
    pub min_revenue: Decimal,
    /// Upper bound of the confidence band.
    pub max_revenue: Decimal,
}

/// A revenue forecast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueForecast {
    /// Months forecast.
    pub horizon: ForecastHorizon,
    /// One entry per forecast month, in order.
    pub months: Vec<MonthlyForecast>,
    /// Weighted moving average the forecast starts from.
    pub trend_value: Decimal,
    /// Overall confidence, in percent.
    pub confidence: Decimal,
    /// Direction of the recent trend.
    pub trend: TrendDirection,
    /// Months of history used.
    pub history_months: usize,
}

/// The forecast under three business assumptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioForecasts {
    /// Predictions × 1.10, band ±25%.
    pub optimistic: Vec<MonthlyForecast>,
    /// Predictions unchanged, band ±15%.
    pub realistic: Vec<MonthlyForecast>,
    /// Predictions × 0.85, band ±25%.
    pub pessimistic: Vec<MonthlyForecast>,
}

fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().copied().sum::<Decimal>() / Decimal::from(values.len())
}

/// Weighted moving average of the last three values, weights 1, 2, 3 with
/// the most recent heaviest. Shorter series use weights 1..=n.
pub fn weighted_moving_average(values: &[Decimal]) -> Decimal {
    let recent = &values[values.len().saturating_sub(3)..];
    let mut weighted = Decimal::ZERO;
    let mut weights = Decimal::ZERO;
    for (i, value) in recent.iter().enumerate() {
        let weight = Decimal::from(i + 1);
        weighted += *value * weight;
        weights += weight;
    }
    if weights.is_zero() {
        Decimal::ZERO
    } else {
        weighted / weights
    }
}

/// Seasonal factor per calendar month, index 0 for January.
///
/// A factor is the month's average revenue over the global average; months
/// absent from history, or a non-positive global average, give 1.
pub fn seasonal_factors(history: &[MonthlyRevenue]) -> [Decimal; 12] {
    let mut factors = [Decimal::ONE; 12];
    let values: Vec<Decimal> = history.iter().map(|h| h.actual_revenue).collect();
    let global = mean(&values);
    if global <= Decimal::ZERO {
        return factors;
    }

    for (index, factor) in factors.iter_mut().enumerate() {
        let month_values: Vec<Decimal> = history
            .iter()
            .filter(|h| h.month.month() as usize == index + 1)
            .map(|h| h.actual_revenue)
            .collect();
        if !month_values.is_empty() {
            *factor = mean(&month_values) / global;
        }
    }
    factors
}

/// Confidence in a forecast built on `values`, in percent, 1 decimal.
///
/// 40 under 6 months, 60 under 12, 75 under 24. From 24 months on it is
/// `min(95, 85 + max(0, 100 - CV × 100) × 0.1)` where CV is the coefficient
/// of variation (population standard deviation over mean).
pub fn confidence_score(values: &[Decimal]) -> Decimal {
    match values.len() {
        n if n < 6 => return dec!(40),
        n if n < 12 => return dec!(60),
        n if n < 24 => return dec!(75),
        _ => {}
    }

    let average = mean(values);
    let stability = if average > Decimal::ZERO {
        let variance = mean(
            &values
                .iter()
                .map(|v| (*v - average) * (*v - average))
                .collect::<Vec<_>>(),
        );
        let deviation = variance.sqrt().unwrap_or(Decimal::ZERO);
        let cv = deviation / average;
        (Decimal::ONE_HUNDRED - cv * Decimal::ONE_HUNDRED).max(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    round_dp((dec!(85) + stability * dec!(0.1)).min(dec!(95)), 1)
}

/// Labels the trend by comparing the last three months with the three
/// before them.
///
/// With fewer than six values the earlier window is the first three
/// values, so it overlaps the recent one.
///
/// # Example
///
/// ```
/// use profitability_engine::calculation::{trend_direction, TrendDirection};
/// use rust_decimal::Decimal;
///
/// let values: Vec<Decimal> = [100, 100, 100, 130, 130, 130]
///     .into_iter()
///     .map(Decimal::from)
///     .collect();
/// assert_eq!(trend_direction(&values), TrendDirection::Growth);
/// assert_eq!(trend_direction(&values[..2]), TrendDirection::InsufficientData);
/// ```
pub fn trend_direction(values: &[Decimal]) -> TrendDirection {
    let n = values.len();
    if n < 3 {
        return TrendDirection::InsufficientData;
    }

    let recent = &values[n - 3..];
    let previous_start = n.saturating_sub(6);
    let previous = &values[previous_start..(previous_start + 3).min(n)];

    let recent_average = mean(recent);
    let previous_average = mean(previous);

    if previous_average.is_zero() {
        return if recent_average > Decimal::ZERO {
            TrendDirection::Growth
        } else {
            TrendDirection::Stable
        };
    }

    let change = (recent_average - previous_average) / previous_average * Decimal::ONE_HUNDRED;
    if change > dec!(10) {
        TrendDirection::Growth
    } else if change < dec!(-10) {
        TrendDirection::Decline
    } else {
        TrendDirection::Stable
    }
}

fn banded(month: YearMonth, predicted: Decimal, band: Decimal) -> MonthlyForecast {
    MonthlyForecast {
        month,
        predicted_revenue: round_money(predicted),
        min_revenue: round_money(predicted * (Decimal::ONE - band)),
        max_revenue: round_money(predicted * (Decimal::ONE + band)),
    }
}

/// Forecasts monthly revenue over `horizon` months following the last
/// month of `history`.
///
/// History may be supplied in any order and is sorted by month first.
///
/// # Errors
///
/// Returns [`EngineError::InsufficientData`] with fewer than 6 months.
///
/// # Example
///
/// ```
/// use profitability_engine::calculation::{forecast_revenue, ForecastHorizon, TrendDirection};
/// use profitability_engine::models::{MonthlyRevenue, YearMonth};
/// use rust_decimal::Decimal;
///
/// let start = YearMonth::new(2024, 1).unwrap();
/// let history: Vec<MonthlyRevenue> = (0..12)
///     .map(|i| MonthlyRevenue {
///         month: start.plus_months(i),
///         actual_revenue: Decimal::new(10000, 0),
///     })
///     .collect();
///
/// let forecast = forecast_revenue(&history, ForecastHorizon::Quarter).unwrap();
/// assert_eq!(forecast.months.len(), 3);
/// assert_eq!(forecast.months[0].month.to_string(), "2025-01");
/// assert_eq!(forecast.months[0].predicted_revenue, Decimal::new(10200, 0));
/// assert_eq!(forecast.trend, TrendDirection::Stable);
/// ```
pub fn forecast_revenue(
    history: &[MonthlyRevenue],
    horizon: ForecastHorizon,
) -> EngineResult<RevenueForecast> {
    if history.len() < MINIMUM_HISTORY_MONTHS {
        return Err(EngineError::InsufficientData {
            required: MINIMUM_HISTORY_MONTHS,
            actual: history.len(),
        });
    }

    let mut sorted = history.to_vec();
    sorted.sort_by_key(|entry| entry.month);
    let values: Vec<Decimal> = sorted.iter().map(|entry| entry.actual_revenue).collect();

    let trend_value = weighted_moving_average(&values);
    let factors = seasonal_factors(&sorted);
    let last_month = sorted[sorted.len() - 1].month;

    let months = (1..=horizon.months())
        .map(|ahead| {
            let month = last_month.plus_months(ahead);
            let base = trend_value * (Decimal::ONE + MONTHLY_GROWTH * Decimal::from(ahead));
            let predicted = base * factors[month.month() as usize - 1];
            let band = if ahead <= 3 { NEAR_TERM_BAND } else { FAR_TERM_BAND };
            banded(month, predicted, band)
        })
        .collect();

    let forecast = RevenueForecast {
        horizon,
        months,
        trend_value: round_money(trend_value),
        confidence: confidence_score(&values),
        trend: trend_direction(&values),
        history_months: values.len(),
    };

    info!(
        history_months = forecast.history_months,
        horizon = horizon.months(),
        trend = %forecast.trend,
        confidence = %forecast.confidence,
        "Forecast monthly revenue"
    );

    Ok(forecast)
}

/// Derives optimistic, realistic and pessimistic variants of a forecast.
pub fn scenario_forecasts(forecast: &RevenueForecast) -> ScenarioForecasts {
    let apply = |multiplier: Decimal, band: Decimal| -> Vec<MonthlyForecast> {
        forecast
            .months
            .iter()
            .map(|m| banded(m.month, m.predicted_revenue * multiplier, band))
            .collect()
    };

    ScenarioForecasts {
        optimistic: apply(dec!(1.10), FAR_TERM_BAND),
        realistic: apply(Decimal::ONE, NEAR_TERM_BAND),
        pessimistic: apply(dec!(0.85), FAR_TERM_BAND),
    }
}

/// Accuracy of a past prediction, in percent, 2 decimals.
///
/// `(1 - |predicted - actual| / actual) × 100`; `None` when the actual
/// value is not positive.
pub fn forecast_accuracy(predicted: Decimal, actual: Decimal) -> Option<Decimal> {
    if actual <= Decimal::ZERO {
        return None;
    }
    Some(round_money(
        (Decimal::ONE - (predicted - actual).abs() / actual) * Decimal::ONE_HUNDRED,
    ))
}
