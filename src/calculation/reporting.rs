//! Period reporting for project dashboards.
//!
//! Aggregates revenue, human cost and margins over a date window for a set
//! of projects, builds the cumulative cost consumption of a project against
//! a linear forecast of its estimated cost, and splits a project's budget
//! into margin, purchases and human cost.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::models::{CalculationWarning, Granularity, ProjectFinancialFacts};

use super::cost_resolver::ContributorDirectory;
use super::profitability::cost_timesheets;
use super::rounding::{round_money, safe_percentage, safe_ratio};
use super::staffing::generate_periods;
use super::time_conversion::hours_to_days;

/// Aggregates of a set of projects over a date window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodMetrics {
    /// First day of the window.
    pub start: NaiveDate,
    /// Last day of the window.
    pub end: NaiveDate,
    /// Countable hours valued at each contributor's daily sale rate.
    pub revenue: Decimal,
    /// Countable hours valued at each contributor's daily cost.
    pub human_cost: Decimal,
    /// Project and order-line purchases. Purchases are not dated, so they
    /// count in full whatever the window.
    pub purchases: Decimal,
    /// Revenue minus purchases.
    pub gross_margin: Decimal,
    /// Gross margin over revenue, in percent.
    pub gross_margin_rate: Decimal,
    /// Gross margin minus human cost.
    pub net_margin: Decimal,
    /// Net margin over revenue, in percent.
    pub net_margin_rate: Decimal,
    /// Revenue per day worked.
    pub real_daily_rate: Decimal,
    /// Countable hours in the window.
    pub total_hours: Decimal,
    /// Countable hours in days, 2 decimals.
    pub total_days: Decimal,
    /// Data problems encountered and how they were resolved.
    pub warnings: Vec<CalculationWarning>,
}

/// One point of a consumption timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelinePoint {
    /// First day of the window.
    pub start: NaiveDate,
    /// Last day of the window.
    pub end: NaiveDate,
    /// Sold amount of the project, the same at every point.
    pub budget: Decimal,
    /// Cost of the countable timesheets up to the end of the window.
    pub consumed: Decimal,
    /// Estimated cost spread linearly, cumulated up to this point.
    pub forecast: Decimal,
}

/// Cumulative cost consumption of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumptionTimeline {
    /// The project.
    pub project_id: String,
    /// Size of each window.
    pub granularity: Granularity,
    /// Points in date order.
    pub points: Vec<TimelinePoint>,
    /// Data problems encountered and how they were resolved.
    pub warnings: Vec<CalculationWarning>,
}

/// Split of a project's budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetBreakdown {
    /// Sold amount minus estimated cost and purchases, never below zero.
    pub margin: Decimal,
    /// Purchases booked on the project.
    pub purchases: Decimal,
    /// Estimated cost of the project's tasks.
    pub human_cost: Decimal,
}

fn check_window(start: NaiveDate, end: NaiveDate) -> EngineResult<()> {
    if end < start {
        return Err(EngineError::invalid_argument(
            "period",
            format!("end {} is before start {}", end, start),
        ));
    }
    Ok(())
}

fn merge_warnings(into: &mut Vec<CalculationWarning>, warnings: Vec<CalculationWarning>) {
    for warning in warnings {
        if !into.contains(&warning) {
            into.push(warning);
        }
    }
}

/// Aggregates revenue, human cost and margins of `projects` over
/// `[start, end]`.
///
/// Only countable timesheets dated inside the window are valued; revenue
/// uses the daily sale rate and human cost the daily cost in force on the
/// day worked.
///
/// # Arguments
///
/// * `projects` - The projects to aggregate
/// * `directory` - Contributors referenced by the timesheets
/// * `start` - First day of the window (inclusive)
/// * `end` - Last day of the window (inclusive)
///
/// # Returns
///
/// The [`PeriodMetrics`], or `InvalidArgument` when `end` is before `start`.
pub fn period_metrics(
    projects: &[ProjectFinancialFacts],
    directory: &ContributorDirectory,
    start: NaiveDate,
    end: NaiveDate,
) -> EngineResult<PeriodMetrics> {
    check_window(start, end)?;

    let in_window = projects
        .iter()
        .flat_map(|project| project.timesheets.iter())
        .filter(|entry| entry.date >= start && entry.date <= end);
    let totals = cost_timesheets(in_window, directory);

    let revenue = round_money(totals.sale_value);
    let human_cost = round_money(totals.cost);
    let purchases = round_money(projects.iter().map(ProjectFinancialFacts::total_purchases).sum());
    let total_hours = totals.worked_hours - totals.excluded_hours;
    let exact_days = hours_to_days(total_hours);

    let gross_margin = revenue - purchases;
    let net_margin = gross_margin - human_cost;

    debug!(
        projects = projects.len(),
        start = %start,
        end = %end,
        revenue = %revenue,
        human_cost = %human_cost,
        "Calculated period metrics"
    );

    Ok(PeriodMetrics {
        start,
        end,
        revenue,
        human_cost,
        purchases,
        gross_margin,
        gross_margin_rate: safe_percentage(gross_margin, revenue),
        net_margin,
        net_margin_rate: safe_percentage(net_margin, revenue),
        real_daily_rate: round_money(safe_ratio(revenue, exact_days)),
        total_hours,
        total_days: round_money(exact_days),
        warnings: totals.warnings,
    })
}

/// Builds the cumulative cost consumption of a project over `[start, end]`.
///
/// Windows follow [`generate_periods`] and are clipped to `[start, end]`.
/// The forecast at point `i` of `n` is `estimated_cost × i / n`.
///
/// # Example
///
/// ```
/// use profitability_engine::calculation::{ContributorDirectory, consumption_timeline};
/// use profitability_engine::models::{Granularity, ProjectFinancialFacts, ProjectStatus};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let project = ProjectFinancialFacts {
///     project_id: "prj_001".to_string(),
///     name: "Intranet".to_string(),
///     is_internal: false,
///     status: ProjectStatus::InProgress,
///     start_date: None,
///     end_date: None,
///     sold_amount: Decimal::new(12000, 0),
///     sold_hours: Decimal::new(160, 0),
///     estimated_cost: Decimal::new(8000, 0),
///     spent_hours: Decimal::ZERO,
///     purchases_amount: None,
///     global_progress: Decimal::ZERO,
///     orders: vec![],
///     timesheets: vec![],
/// };
///
/// let timeline = consumption_timeline(
///     &project,
///     &ContributorDirectory::default(),
///     NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2025, 4, 30).unwrap(),
///     Granularity::Monthly,
/// )
/// .unwrap();
///
/// assert_eq!(timeline.points.len(), 4);
/// assert_eq!(timeline.points[1].forecast, Decimal::new(4000, 0));
/// ```
pub fn consumption_timeline(
    project: &ProjectFinancialFacts,
    directory: &ContributorDirectory,
    start: NaiveDate,
    end: NaiveDate,
    granularity: Granularity,
) -> EngineResult<ConsumptionTimeline> {
    check_window(start, end)?;

    let windows = generate_periods(start, end, granularity);
    let count = Decimal::from(windows.len().max(1));
    let mut consumed = Decimal::ZERO;
    let mut warnings = Vec::new();
    let mut points = Vec::with_capacity(windows.len());

    for (index, window) in windows.iter().enumerate() {
        let window_start = window.start.max(start);
        let window_end = window.end.min(end);
        let totals = cost_timesheets(
            project
                .timesheets
                .iter()
                .filter(|entry| entry.date >= window_start && entry.date <= window_end),
            directory,
        );
        consumed += totals.cost;
        merge_warnings(&mut warnings, totals.warnings);

        points.push(TimelinePoint {
            start: window_start,
            end: window_end,
            budget: project.sold_amount,
            consumed: round_money(consumed),
            forecast: round_money(project.estimated_cost * Decimal::from(index + 1) / count),
        });
    }

    Ok(ConsumptionTimeline {
        project_id: project.project_id.clone(),
        granularity,
        points,
        warnings,
    })
}

/// Splits a project's sold amount into margin, purchases and estimated
/// human cost.
pub fn budget_breakdown(project: &ProjectFinancialFacts) -> BudgetBreakdown {
    let purchases = project.purchases_amount.unwrap_or(Decimal::ZERO);
    let margin = project.sold_amount - project.estimated_cost - purchases;

    BudgetBreakdown {
        margin: round_money(margin.max(Decimal::ZERO)),
        purchases: round_money(purchases),
        human_cost: round_money(project.estimated_cost),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Contributor, EmploymentPeriod, LineType, Order, OrderLine, OrderSection, OrderStatus,
        ProjectStatus, TaskType, TimesheetFact, TimesheetTask,
    };
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn directory() -> ContributorDirectory {
        ContributorDirectory::new(vec![
            Contributor {
                id: "ctb_001".to_string(),
                active: true,
                default_daily_cost: Some(dec("400")),
                default_daily_rate: Some(dec("640")),
                employment_periods: vec![],
            },
            Contributor {
                id: "ctb_002".to_string(),
                active: true,
                default_daily_cost: Some(dec("300")),
                default_daily_rate: Some(dec("500")),
                employment_periods: vec![EmploymentPeriod {
                    start_date: date(2025, 3, 1),
                    end_date: None,
                    daily_cost: Some(dec("360")),
                    daily_rate: Some(dec("560")),
                    work_time_percentage: dec("100"),
                    profiles: vec![],
                }],
            },
        ])
    }

    fn timesheet(
        project_id: &str,
        contributor_id: &str,
        day: NaiveDate,
        hours: &str,
    ) -> TimesheetFact {
        TimesheetFact {
            contributor_id: contributor_id.to_string(),
            project_id: project_id.to_string(),
            date: day,
            hours: dec(hours),
            task: None,
        }
    }

    fn project(project_id: &str, timesheets: Vec<TimesheetFact>) -> ProjectFinancialFacts {
        ProjectFinancialFacts {
            project_id: project_id.to_string(),
            name: "Extranet".to_string(),
            is_internal: false,
            status: ProjectStatus::InProgress,
            start_date: Some(date(2025, 1, 6)),
            end_date: None,
            sold_amount: dec("20000"),
            sold_hours: dec("240"),
            estimated_cost: dec("12000"),
            spent_hours: dec("40"),
            purchases_amount: None,
            global_progress: dec("20"),
            orders: vec![],
            timesheets,
        }
    }

    #[test]
    fn test_period_metrics_values_hours_inside_window() {
        let mut first = project(
            "prj_001",
            vec![
                timesheet("prj_001", "ctb_001", date(2025, 2, 10), "8"),
                timesheet("prj_001", "ctb_001", date(2025, 1, 31), "8"),
            ],
        );
        first.purchases_amount = Some(dec("200"));
        first.orders = vec![Order {
            reference: "D2025-001".to_string(),
            status: OrderStatus::Signed,
            contingency_percentage: None,
            sections: vec![OrderSection {
                title: "Build".to_string(),
                lines: vec![OrderLine {
                    line_type: LineType::Service,
                    days: dec("10"),
                    daily_rate: dec("600"),
                    purchase_amount: Some(dec("100")),
                    profile: None,
                }],
            }],
        }];
        let second = project(
            "prj_002",
            vec![timesheet("prj_002", "ctb_002", date(2025, 2, 20), "4")],
        );

        let metrics = period_metrics(
            &[first, second],
            &directory(),
            date(2025, 2, 1),
            date(2025, 2, 28),
        )
        .unwrap();

        // 8h × 640/8 + 4h × 500/8
        assert_eq!(metrics.revenue, dec("890"));
        // 8h × 400/8 + 4h × 300/8
        assert_eq!(metrics.human_cost, dec("550"));
        assert_eq!(metrics.purchases, dec("300"));
        assert_eq!(metrics.gross_margin, dec("590"));
        assert_eq!(metrics.gross_margin_rate, dec("66.29"));
        assert_eq!(metrics.net_margin, dec("40"));
        assert_eq!(metrics.net_margin_rate, dec("4.49"));
        assert_eq!(metrics.total_hours, dec("12"));
        assert_eq!(metrics.total_days, dec("1.5"));
        assert_eq!(metrics.real_daily_rate, dec("593.33"));
        assert!(metrics.warnings.is_empty());
    }

    #[test]
    fn test_period_metrics_skip_excluded_tasks() {
        let mut avv = timesheet("prj_001", "ctb_001", date(2025, 2, 11), "8");
        avv.task = Some(TimesheetTask::of_type(TaskType::Avv));
        let p = project(
            "prj_001",
            vec![avv, timesheet("prj_001", "ctb_002", date(2025, 3, 3), "8")],
        );

        let metrics =
            period_metrics(&[p], &directory(), date(2025, 2, 1), date(2025, 3, 31)).unwrap();

        // The employment period applies from March
        assert_eq!(metrics.revenue, dec("560"));
        assert_eq!(metrics.human_cost, dec("360"));
        assert_eq!(metrics.total_hours, dec("8"));
    }

    #[test]
    fn test_period_metrics_without_projects() {
        let metrics =
            period_metrics(&[], &directory(), date(2025, 2, 1), date(2025, 2, 28)).unwrap();

        assert_eq!(metrics.revenue, Decimal::ZERO);
        assert_eq!(metrics.gross_margin_rate, Decimal::ZERO);
        assert_eq!(metrics.real_daily_rate, Decimal::ZERO);
    }

    #[test]
    fn test_period_metrics_reversed_window() {
        let result = period_metrics(&[], &directory(), date(2025, 3, 1), date(2025, 2, 1));

        match result {
            Err(EngineError::InvalidArgument { argument, .. }) => assert_eq!(argument, "period"),
            other => panic!("Expected InvalidArgument, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_contributor_flagged_once() {
        let p = project(
            "prj_001",
            vec![
                timesheet("prj_001", "ctb_404", date(2025, 2, 10), "8"),
                timesheet("prj_001", "ctb_404", date(2025, 2, 11), "8"),
            ],
        );

        let metrics =
            period_metrics(&[p], &directory(), date(2025, 2, 1), date(2025, 2, 28)).unwrap();
        assert_eq!(metrics.human_cost, Decimal::ZERO);
        assert_eq!(metrics.warnings.len(), 1);
        assert_eq!(metrics.warnings[0].code, "unknown_contributor");
    }

    #[test]
    fn test_weekly_timeline_accumulates_cost() {
        let p = project(
            "prj_001",
            vec![
                timesheet("prj_001", "ctb_001", date(2025, 2, 3), "8"),
                timesheet("prj_001", "ctb_001", date(2025, 2, 12), "4"),
                timesheet("prj_001", "ctb_001", date(2025, 2, 24), "8"),
            ],
        );

        let timeline = consumption_timeline(
            &p,
            &directory(),
            date(2025, 2, 3),
            date(2025, 2, 23),
            Granularity::Weekly,
        )
        .unwrap();

        let consumed: Vec<Decimal> = timeline.points.iter().map(|pt| pt.consumed).collect();
        let forecast: Vec<Decimal> = timeline.points.iter().map(|pt| pt.forecast).collect();
        assert_eq!(consumed, vec![dec("400"), dec("600"), dec("600")]);
        assert_eq!(forecast, vec![dec("4000"), dec("8000"), dec("12000")]);
        assert!(timeline.points.iter().all(|pt| pt.budget == dec("20000")));
        assert_eq!(timeline.points[2].end, date(2025, 2, 23));
    }

    #[test]
    fn test_monthly_timeline_clips_first_window() {
        let p = project(
            "prj_001",
            vec![
                timesheet("prj_001", "ctb_001", date(2025, 1, 10), "8"),
                timesheet("prj_001", "ctb_001", date(2025, 1, 20), "8"),
            ],
        );

        let timeline = consumption_timeline(
            &p,
            &directory(),
            date(2025, 1, 15),
            date(2025, 2, 28),
            Granularity::Monthly,
        )
        .unwrap();

        assert_eq!(timeline.points.len(), 2);
        assert_eq!(timeline.points[0].start, date(2025, 1, 15));
        assert_eq!(timeline.points[0].consumed, dec("400"));
        assert_eq!(timeline.points[1].consumed, dec("400"));
    }

    #[test]
    fn test_budget_breakdown() {
        let mut p = project("prj_001", vec![]);
        p.purchases_amount = Some(dec("1500"));

        let breakdown = budget_breakdown(&p);
        assert_eq!(breakdown.margin, dec("6500"));
        assert_eq!(breakdown.purchases, dec("1500"));
        assert_eq!(breakdown.human_cost, dec("12000"));
    }

    #[test]
    fn test_budget_breakdown_margin_never_negative() {
        let mut p = project("prj_001", vec![]);
        p.estimated_cost = dec("19000");
        p.purchases_amount = Some(dec("2500"));

        assert_eq!(budget_breakdown(&p).margin, Decimal::ZERO);
    }
}
