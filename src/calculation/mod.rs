//! Calculation logic for the profitability engine.
//!
//! This module contains the calculation functions for working calendars and
//! daily costs, contributor cost resolution, project profitability, margin
//! prediction, risk and health scoring, period reporting, revenue
//! forecasting, pipeline workload prediction and staffing capacity
//! aggregation.

mod calendar;
mod cost_resolver;
mod daily_cost;
mod forecast;
mod pipeline;
mod predictor;
mod profitability;
mod reporting;
mod risk;
mod rounding;
mod staffing;
mod time_conversion;

pub use calendar::{
    PublicHoliday, WorkingCalendar, easter_date, is_weekend, public_holidays, working_calendar,
    working_days_between, working_days_in_year,
};
pub use cost_resolver::{
    ContributorDirectory, CostResolution, RateSource, resolve_daily_cost, resolve_daily_rate,
    select_period,
};
pub use daily_cost::{DailyCostReport, DailyCostResult, cjm_from_monthly_salary, daily_cost_report};
pub use forecast::{
    ForecastHorizon, MINIMUM_HISTORY_MONTHS, MonthlyForecast, RevenueForecast, ScenarioForecasts,
    TrendDirection, confidence_score, forecast_accuracy, forecast_revenue, scenario_forecasts,
    seasonal_factors, trend_direction, weighted_moving_average,
};
pub use pipeline::{
    DEFAULT_CONVERSION_RATE, MonthlyWorkload, PipelineAnalysis, PipelineRequest, QuoteAnalysis,
    WorkloadAlert, WorkloadAlertKind, WorkloadFilter, analyze_pipeline, analyze_pipeline_request,
    conversion_rate, projected_days, win_probability,
};
pub use predictor::{
    BudgetDrift, INSUFFICIENT_PROGRESS_REASON, MINIMUM_PREDICTION_PROGRESS,
    MISSING_BUDGET_REASON, PredictionOutcome, PredictionScenarios, Priority,
    ProfitabilityPrediction, Recommendation, RecommendationKind, ScenarioProjection,
    drift_severity, predict_profitability, recommendations,
};
pub use profitability::{
    AlertKind, AlertLevel, ContributorPerformance, ForecastComparison, GlobalKpis,
    ProfitabilityAlert, ProjectProfitability, calculate_project_profitability,
    compare_forecast_vs_realized, contributor_performance, global_kpis, order_total,
    profitability_alerts,
};
pub use reporting::{
    BudgetBreakdown, ConsumptionTimeline, PeriodMetrics, TimelinePoint, budget_breakdown,
    consumption_timeline, period_metrics,
};
pub use risk::{
    HealthComponents, HealthLevel, HealthScore, ProjectRiskAssessment, RiskFinding, RiskKind,
    RiskLevel, analyze_project, at_risk_projects, calculate_health_score, rank_projects_by_risk,
};
pub use rounding::{round_dp, round_money, safe_percentage, safe_ratio};
pub use staffing::{
    AggregationReport, FactSink, StaffingFailure, StaffingPeriod, aggregate_staffing_metrics,
    calculate_contributor_metrics, generate_periods, is_quarter_start, period_end,
};
pub use time_conversion::{
    HOURS_PER_DAY, days_to_hours, hours_to_days, parse_duration_input, theoretical_hours,
};
