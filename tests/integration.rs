//! End-to-end tests for the profitability engine.
//!
//! These tests load the shipped configuration from `config/default`, build
//! inputs the way the persistence layer hands them over (JSON documents),
//! and run them through the public API:
//! - Daily cost derivation
//! - Project profitability, alerts and KPIs
//! - Profitability prediction
//! - Risk and health scoring
//! - Revenue forecasting
//! - Pipeline workload prediction
//! - Staffing capacity aggregation
//! - Error cases

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use profitability_engine::calculation::{
    ContributorDirectory, ForecastHorizon, HealthLevel, PredictionOutcome, RiskLevel,
    TrendDirection, WorkloadAlertKind, aggregate_staffing_metrics, analyze_pipeline,
    analyze_project, budget_breakdown, calculate_health_score, calculate_project_profitability,
    cjm_from_monthly_salary, compare_forecast_vs_realized, forecast_revenue, global_kpis,
    period_metrics, predict_profitability, profitability_alerts, scenario_forecasts,
    INSUFFICIENT_PROGRESS_REASON,
};
use profitability_engine::config::{ConfigLoader, EngineConfig};
use profitability_engine::error::EngineError;
use profitability_engine::models::{
    Contributor, FactKey, Granularity, MonthlyRevenue, PendingQuote, PlanningRecord,
    ProjectFinancialFacts, Severity, StaffingContributor, StaffingFactRow, YearMonth,
};

// =============================================================================
// Test Helpers
// =============================================================================

fn load_config() -> ConfigLoader {
    ConfigLoader::load("./config/default").expect("Failed to load config")
}

fn decimal(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(s: &str) -> NaiveDate {
    NaiveDate::from_str(s).unwrap()
}

fn from_json<T: serde::de::DeserializeOwned>(value: Value) -> T {
    serde_json::from_value(value).expect("Failed to deserialize fixture")
}

fn contributors() -> Vec<Contributor> {
    from_json(json!([
        {
            "id": "ctb_001",
            "default_daily_cost": "350",
            "default_daily_rate": "600",
            "employment_periods": [
                {
                    "start_date": "2024-01-01",
                    "end_date": null,
                    "daily_cost": "400",
                    "daily_rate": "650",
                    "profiles": ["developer"]
                }
            ]
        },
        {
            "id": "ctb_002",
            "default_daily_cost": null,
            "default_daily_rate": null,
            "employment_periods": [
                {
                    "start_date": "2025-01-01",
                    "end_date": null,
                    "daily_cost": "500",
                    "daily_rate": null,
                    "work_time_percentage": "80",
                    "profiles": ["lead"]
                }
            ]
        }
    ]))
}

fn website_project() -> ProjectFinancialFacts {
    from_json(json!({
        "project_id": "prj_001",
        "name": "Website redesign",
        "status": "in_progress",
        "start_date": "2025-02-03",
        "sold_amount": "6000",
        "sold_hours": "80",
        "estimated_cost": "3200",
        "spent_hours": "32",
        "purchases_amount": "300",
        "global_progress": "40",
        "orders": [
            {
                "reference": "D2025-014",
                "status": "signed",
                "sections": [
                    {
                        "title": "Build",
                        "lines": [{ "days": "10", "daily_rate": "600" }]
                    }
                ]
            },
            {
                "reference": "D2025-021",
                "status": "pending_signature",
                "sections": [
                    {
                        "title": "Phase 2",
                        "lines": [{ "days": "5", "daily_rate": "600" }]
                    }
                ]
            }
        ],
        "timesheets": [
            {
                "contributor_id": "ctb_001",
                "project_id": "prj_001",
                "date": "2025-03-03",
                "hours": "16",
                "task": { "task_type": "regular", "counts_for_profitability": true }
            },
            {
                "contributor_id": "ctb_002",
                "project_id": "prj_001",
                "date": "2025-03-04",
                "hours": "8"
            },
            {
                "contributor_id": "ctb_001",
                "project_id": "prj_001",
                "date": "2025-03-05",
                "hours": "8",
                "task": { "task_type": "avv", "counts_for_profitability": false }
            }
        ]
    }))
}

fn flat_history(months: u32, revenue: &str) -> Vec<MonthlyRevenue> {
    let start = YearMonth::new(2024, 1).unwrap();
    (0..months)
        .map(|i| MonthlyRevenue {
            month: start.plus_months(i),
            actual_revenue: decimal(revenue),
        })
        .collect()
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_default_config_matches_built_in_defaults() {
    let loader = load_config();
    assert_eq!(loader.config(), &EngineConfig::default());
    assert_eq!(loader.company().global_coefficient(), decimal("1.9575"));
    assert_eq!(loader.staffing().batch_size, 50);
}

#[test]
fn test_missing_config_directory() {
    match ConfigLoader::load("./config/does-not-exist") {
        Err(EngineError::ConfigNotFound { path }) => assert!(path.contains("company.yaml")),
        other => panic!("Expected ConfigNotFound error, got {:?}", other),
    }
}

// =============================================================================
// Daily Cost
// =============================================================================

#[test]
fn test_cjm_reference_salary() {
    let loader = load_config();

    let result = cjm_from_monthly_salary(decimal("3000"), 2025, loader.company()).unwrap();
    assert_eq!(result.annual_salary, decimal("36000"));
    assert_eq!(result.annual_cost, decimal("70470"));
    assert_eq!(result.working_days, 216);
    assert_eq!(result.daily_cost, decimal("326.25"));

    let leap = cjm_from_monthly_salary(decimal("3000"), 2024, loader.company()).unwrap();
    assert_eq!(leap.working_days, 217);
    assert_eq!(leap.daily_cost, decimal("324.75"));
}

// =============================================================================
// Project Profitability
// =============================================================================

#[test]
fn test_project_profitability_end_to_end() {
    let directory = ContributorDirectory::new(contributors());
    let result = calculate_project_profitability(&website_project(), &directory);

    // ctb_001: 16h x 400/8 = 800; ctb_002: 8h x (500 x 80%)/8 = 400; AVV excluded
    assert_eq!(result.revenue, decimal("6000"));
    assert_eq!(result.timesheet_cost, decimal("1200"));
    assert_eq!(result.cost, decimal("1500"));
    assert_eq!(result.margin, decimal("4500"));
    assert_eq!(result.margin_rate, decimal("75"));
    assert_eq!(result.sold_days, decimal("10"));
    assert_eq!(result.billable_days, decimal("3"));
    assert_eq!(result.worked_days, decimal("4"));
    assert_eq!(result.excluded_hours, decimal("8"));
    assert!(result.warnings.is_empty());

    let comparison = compare_forecast_vs_realized(&result);
    assert!(!comparison.is_overrun);
    assert!(profitability_alerts(&result).is_empty());
}

#[test]
fn test_internal_project_is_never_profitable_or_unprofitable() {
    let directory = ContributorDirectory::new(contributors());
    let mut internal = website_project();
    internal.project_id = "prj_internal".to_string();
    internal.is_internal = true;

    let result = calculate_project_profitability(&internal, &directory);
    assert_eq!(result.revenue, Decimal::ZERO);
    assert_eq!(result.cost, Decimal::ZERO);
    assert_eq!(result.margin, Decimal::ZERO);
    assert!(profitability_alerts(&result).is_empty());

    let external = calculate_project_profitability(&website_project(), &directory);
    let kpis = global_kpis(&[external, result]);
    assert_eq!(kpis.total_revenue, decimal("6000"));
    assert_eq!(kpis.external_projects_count, 1);
    assert_eq!(kpis.internal_projects_count, 1);
}

#[test]
fn test_unknown_contributor_costs_nothing_and_warns() {
    let directory = ContributorDirectory::new(contributors().into_iter().take(1));
    let result = calculate_project_profitability(&website_project(), &directory);

    assert_eq!(result.timesheet_cost, decimal("800"));
    assert_eq!(result.warnings.len(), 1);
    assert_eq!(result.warnings[0].code, "unknown_contributor");
}

// =============================================================================
// Prediction, Risk and Health
// =============================================================================

#[test]
fn test_prediction_needs_thirty_percent_progress() {
    let loader = load_config();
    let mut project = website_project();
    project.global_progress = decimal("10");

    match predict_profitability(&project, loader.estimation()) {
        PredictionOutcome::Unavailable { reason, current_progress } => {
            assert_eq!(reason, INSUFFICIENT_PROGRESS_REASON);
            assert_eq!(current_progress, decimal("10"));
        }
        other => panic!("Expected Unavailable, got {:?}", other),
    }
}

#[test]
fn test_prediction_projects_final_margin() {
    let loader = load_config();
    let mut project = website_project();
    project.sold_amount = decimal("20000");
    project.sold_hours = decimal("200");
    project.spent_hours = decimal("120");
    project.global_progress = decimal("50");

    let outcome = predict_profitability(&project, loader.estimation());
    let prediction = outcome.prediction().expect("prediction should be available");

    assert_eq!(prediction.projected_total_hours, decimal("240"));
    assert_eq!(prediction.projected_margin, decimal("40"));
    assert_eq!(prediction.budgeted_margin, decimal("50"));
    assert_eq!(prediction.budget_drift.severity, Severity::High);
}

#[test]
fn test_healthy_project_scores_100() {
    let loader = load_config();
    let project: ProjectFinancialFacts = from_json(json!({
        "project_id": "prj_002",
        "name": "Intranet",
        "status": "in_progress",
        "start_date": "2025-03-03",
        "end_date": null,
        "sold_amount": "20000",
        "sold_hours": "200",
        "spent_hours": "100",
        "global_progress": "50",
        "timesheets": [
            {
                "contributor_id": "ctb_001",
                "project_id": "prj_002",
                "date": "2025-06-12",
                "hours": "7"
            }
        ]
    }));
    let as_of = date("2025-06-16");

    let assessment = analyze_project(&project, as_of, loader.estimation());
    assert_eq!(assessment.health_score, 100);
    assert_eq!(assessment.risk_level, RiskLevel::Low);

    let health = calculate_health_score(&project, as_of, loader.estimation());
    assert_eq!(health.score, 100);
    assert_eq!(health.level, HealthLevel::Healthy);
}

// =============================================================================
// Revenue Forecasting
// =============================================================================

#[test]
fn test_flat_series_forecast_stays_in_band_for_every_horizon() {
    let history = flat_history(12, "25000");
    let revenue = decimal("25000");

    for months in [3, 6, 12] {
        let horizon = ForecastHorizon::try_from(months).unwrap();
        let forecast = forecast_revenue(&history, horizon).unwrap();

        assert_eq!(forecast.months.len(), months as usize);
        assert_eq!(forecast.trend, TrendDirection::Stable);
        for month in &forecast.months {
            assert!(
                month.min_revenue <= revenue && revenue <= month.max_revenue,
                "{} outside band for {}",
                revenue,
                month.month
            );
        }

        let scenarios = scenario_forecasts(&forecast);
        assert!(
            scenarios.pessimistic[0].predicted_revenue < scenarios.optimistic[0].predicted_revenue
        );
    }
}

#[test]
fn test_forecast_rejects_short_history_and_bad_horizon() {
    match forecast_revenue(&flat_history(5, "1000"), ForecastHorizon::Quarter) {
        Err(EngineError::InsufficientData { required, actual }) => {
            assert_eq!((required, actual), (6, 5));
        }
        other => panic!("Expected InsufficientData error, got {:?}", other),
    }

    assert!(matches!(
        ForecastHorizon::try_from(0),
        Err(EngineError::InvalidArgument { .. })
    ));
}

#[test]
fn test_forecast_history_from_json() {
    let history: Vec<MonthlyRevenue> = from_json(json!([
        { "month": "2024-07", "actual_revenue": "10000" },
        { "month": "2024-08", "actual_revenue": "10000" },
        { "month": "2024-09", "actual_revenue": "10000" },
        { "month": "2024-10", "actual_revenue": "14000" },
        { "month": "2024-11", "actual_revenue": "14000" },
        { "month": "2024-12", "actual_revenue": "14000" }
    ]));

    let forecast = forecast_revenue(&history, ForecastHorizon::Quarter).unwrap();
    assert_eq!(forecast.trend, TrendDirection::Growth);
    assert_eq!(forecast.confidence, decimal("60"));
    assert_eq!(forecast.months[0].month.to_string(), "2025-01");
}

// =============================================================================
// Period Reporting
// =============================================================================

#[test]
fn test_period_metrics_for_march() {
    let directory = ContributorDirectory::new(contributors());
    let metrics = period_metrics(
        &[website_project()],
        &directory,
        date("2025-03-01"),
        date("2025-03-31"),
    )
    .unwrap();

    // 16h at 650/8; ctb_002 has no sale rate
    assert_eq!(metrics.revenue, decimal("1300"));
    // 16h x 400/8 + 8h x (500 x 80%)/8
    assert_eq!(metrics.human_cost, decimal("1200"));
    assert_eq!(metrics.purchases, decimal("300"));
    assert_eq!(metrics.gross_margin_rate, decimal("76.92"));
    assert_eq!(metrics.net_margin, decimal("-200"));
    assert_eq!(metrics.net_margin_rate, decimal("-15.38"));
    assert_eq!(metrics.total_days, decimal("3"));
    assert_eq!(metrics.real_daily_rate, decimal("433.33"));
}

#[test]
fn test_budget_breakdown_of_project() {
    let breakdown = budget_breakdown(&website_project());

    assert_eq!(breakdown.margin, decimal("2500"));
    assert_eq!(breakdown.purchases, decimal("300"));
    assert_eq!(breakdown.human_cost, decimal("3200"));
}

// =============================================================================
// Pipeline
// =============================================================================

#[test]
fn test_pipeline_flags_overload_from_quotes_and_plannings() {
    let loader = load_config();
    let quotes: Vec<PendingQuote> = from_json(json!([
        {
            "reference": "D2025-030",
            "created_at": "2025-06-13",
            "total_amount": "9000",
            "sections": [
                {
                    "title": "Build",
                    "lines": [
                        { "days": "24", "daily_rate": "300", "profile": "developer" },
                        { "days": "6", "daily_rate": "300" },
                        { "line_type": "purchase", "days": "2", "daily_rate": "0" }
                    ]
                }
            ],
            "client_conversion_rate": "70",
            "project_start_date": "2025-07-01",
            "project_end_date": "2025-09-30"
        },
        {
            "reference": "D2025-011",
            "created_at": "2025-02-01",
            "total_amount": "150000",
            "sections": [
                { "title": "Run", "lines": [{ "days": "200", "daily_rate": "750" }] }
            ],
            "project_start_date": "2025-07-01"
        }
    ]));
    let plannings: Vec<PlanningRecord> = from_json(json!([
        {
            "contributor_id": "ctb_001",
            "start_date": "2025-07-01",
            "end_date": "2025-07-31",
            "daily_hours": "8",
            "status": "confirmed"
        }
    ]));

    let analysis =
        analyze_pipeline(&quotes, &plannings, 1, date("2025-06-16"), loader.pipeline());

    // 50 + 6 (client) + 5 (fresh) + 10 (small) = 71; the old large quote is at 15
    assert_eq!(analysis.quotes[0].reference, "D2025-030");
    assert_eq!(analysis.quotes[0].win_probability, decimal("71"));
    assert_eq!(analysis.quotes[0].total_days, decimal("30"));
    assert_eq!(analysis.quotes[1].win_probability, decimal("15"));

    // Only the likely quote counts: 30 x 71%
    assert_eq!(analysis.total_potential_days, decimal("21.3"));

    // July: 23 confirmed days + 30/3 x 71% = 30.1 days over 20 → 150.5%
    let july = &analysis.workload[0];
    assert_eq!(july.month.to_string(), "2025-07");
    assert_eq!(july.capacity_rate, decimal("150.5"));

    let alert = &analysis.alerts[0];
    assert_eq!(alert.kind, WorkloadAlertKind::Overload);
    assert_eq!(alert.severity, Severity::Critical);

    // August and September carry only 7.1 days each
    assert!(
        analysis.alerts[1..]
            .iter()
            .all(|a| a.kind == WorkloadAlertKind::Underload)
    );
}

// =============================================================================
// Staffing
// =============================================================================

#[test]
fn test_staffing_week_with_staffed_and_planned_days() {
    let loader = load_config();
    let staffing: Vec<StaffingContributor> = from_json(json!([
        {
            "contributor": contributors()[0],
            "timesheets": [
                { "contributor_id": "ctb_001", "project_id": "prj_001",
                  "date": "2025-03-03", "hours": "8" },
                { "contributor_id": "ctb_001", "project_id": "prj_001",
                  "date": "2025-03-04", "hours": "8" },
                { "contributor_id": "ctb_001", "project_id": "prj_001",
                  "date": "2025-03-05", "hours": "8" },
                { "contributor_id": "ctb_001", "project_id": "prj_001",
                  "date": "2025-03-06", "hours": "8" }
            ],
            "plannings": [
                {
                    "contributor_id": "ctb_001",
                    "start_date": "2025-03-07",
                    "end_date": "2025-03-07",
                    "daily_hours": "4",
                    "status": "planned"
                }
            ]
        }
    ]));

    let mut rows: Vec<StaffingFactRow> = Vec::new();
    let report = aggregate_staffing_metrics(
        &staffing,
        date("2025-03-03"),
        date("2025-03-09"),
        Granularity::Weekly,
        loader.staffing(),
        &mut rows,
    )
    .unwrap();

    assert_eq!(report.rows_written, 1);
    assert!(report.failures.is_empty());

    let row = &rows[0];
    assert_eq!(row.available_days, decimal("5"));
    assert_eq!(row.staffed_days, decimal("4"));
    assert_eq!(row.planned_days, decimal("0.5"));
    assert_eq!(row.occupancy_rate(), decimal("90"));
    assert_eq!(row.remaining_capacity(), decimal("0.5"));
    assert_eq!(row.profile.as_deref(), Some("developer"));
}

#[test]
fn test_staffing_quarter_run_into_keyed_store() {
    let loader = load_config();
    let staffing: Vec<StaffingContributor> = contributors()
        .into_iter()
        .map(|contributor| StaffingContributor {
            contributor,
            vacations: vec![],
            timesheets: vec![],
            plannings: vec![],
        })
        .collect();

    let mut store: BTreeMap<FactKey, StaffingFactRow> = BTreeMap::new();
    let granularity: Granularity = "monthly".parse().unwrap();
    let report = aggregate_staffing_metrics(
        &staffing,
        date("2025-01-01"),
        date("2025-03-31"),
        granularity,
        loader.staffing(),
        &mut store,
    )
    .unwrap();

    assert_eq!(report.rows_written, 6);
    assert_eq!(report.batches_flushed, 1);
    assert_eq!(store.len(), 6);
    assert!(store.values().all(|row| row.staffing_rate.is_zero()));
}

#[test]
fn test_unknown_granularity_rejected() {
    match "daily".parse::<Granularity>() {
        Err(EngineError::InvalidArgument { argument, .. }) => assert_eq!(argument, "granularity"),
        other => panic!("Expected InvalidArgument error, got {:?}", other),
    }
}
