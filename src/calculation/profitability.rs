//! Project profitability calculation.
//!
//! Revenue comes from orders whose status counts as revenue; cost comes
//! from countable timesheets (valued at each contributor's daily cost on
//! the day worked) plus purchases. Internal projects are tracked for time
//! but never evaluated for profit.

use std::collections::HashSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{
    AuditTrace, CalculationWarning, Contributor, Order, ProjectFinancialFacts, Severity,
    TimesheetFact,
};

use super::cost_resolver::{ContributorDirectory, resolve_daily_cost, resolve_daily_rate};
use super::rounding::{round_dp, round_money, safe_percentage, safe_ratio};
use super::time_conversion::{HOURS_PER_DAY, hours_to_days};

const LOW_MARGIN_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 0);
const OVERRUN_ALERT_PERCENTAGE: Decimal = Decimal::from_parts(10, 0, 0, false, 0);

/// Profitability of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectProfitability {
    /// The project.
    pub project_id: String,
    /// Whether the project is internal.
    pub is_internal: bool,
    /// Revenue from signed, won and completed orders.
    pub revenue: Decimal,
    /// Timesheet cost plus purchases.
    pub cost: Decimal,
    /// Cost of the countable timesheets alone.
    pub timesheet_cost: Decimal,
    /// Revenue minus cost.
    pub margin: Decimal,
    /// Margin over revenue, in percent.
    pub margin_rate: Decimal,
    /// Days sold on revenue orders.
    pub sold_days: Decimal,
    /// All hours booked on the project.
    pub worked_hours: Decimal,
    /// Worked hours in days, 2 decimals.
    pub worked_days: Decimal,
    /// Hours on tasks excluded from profitability.
    pub excluded_hours: Decimal,
    /// Worked hours minus excluded hours.
    pub billable_hours: Decimal,
    /// Billable hours in days, 2 decimals.
    pub billable_days: Decimal,
    /// Number of orders attached to the project, any status.
    pub orders_count: usize,
    /// Purchases booked directly on the project.
    pub purchases_amount: Decimal,
    /// Data problems encountered and how they were resolved.
    pub warnings: Vec<CalculationWarning>,
    /// How revenue and cost were derived.
    pub audit: AuditTrace,
}

/// Sold versus realised days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastComparison {
    /// Days sold.
    pub sold_days: Decimal,
    /// Days worked.
    pub worked_days: Decimal,
    /// Days worked on countable tasks.
    pub billable_days: Decimal,
    /// Billable minus sold days.
    pub days_overrun: Decimal,
    /// Overrun over sold days, in percent, 1 decimal.
    pub overrun_percentage: Decimal,
    /// True when more days were spent than sold.
    pub is_overrun: bool,
    /// Sold over billable days, in percent, 1 decimal.
    pub efficiency_rate: Decimal,
}

/// Visual level of a profitability alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    /// Needs attention.
    Warning,
    /// Losing money.
    Danger,
}

/// Condition that raised a profitability alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Margin below zero.
    NegativeMargin,
    /// Margin rate below 10%.
    LowMarginRate,
    /// Billable days exceed sold days by more than 10%.
    BudgetOverrun,
}

/// An alert raised on a project's profitability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitabilityAlert {
    /// The condition.
    pub kind: AlertKind,
    /// The level.
    pub level: AlertLevel,
    /// Short title.
    pub title: String,
    /// Explanation with the figures involved.
    pub message: String,
}

/// Totals across a portfolio of projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalKpis {
    /// Revenue of external projects.
    pub total_revenue: Decimal,
    /// Cost of external projects.
    pub total_cost: Decimal,
    /// Revenue minus cost.
    pub total_margin: Decimal,
    /// Margin over revenue, in percent.
    pub global_margin_rate: Decimal,
    /// Number of external projects.
    pub external_projects_count: usize,
    /// Number of internal projects.
    pub internal_projects_count: usize,
}

/// Performance of one contributor over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorPerformance {
    /// The contributor.
    pub contributor_id: String,
    /// All hours in range.
    pub total_hours: Decimal,
    /// Hours on countable tasks.
    pub billable_hours: Decimal,
    /// Hours on excluded tasks.
    pub non_billable_hours: Decimal,
    /// Billable over total hours, in percent.
    pub billability_rate: Decimal,
    /// Billable hours valued at the daily sale rate.
    pub estimated_revenue: Decimal,
    /// Billable hours valued at the daily cost.
    pub total_cost: Decimal,
    /// Estimated revenue minus cost.
    pub margin: Decimal,
    /// Margin over estimated revenue, in percent.
    pub margin_rate: Decimal,
    /// Distinct projects worked on.
    pub projects_count: usize,
    /// Data problems encountered.
    pub warnings: Vec<CalculationWarning>,
}

/// Returns the total of an order: `Σ days × daily_rate` less its contingency.
///
/// # Example
///
/// ```
/// use profitability_engine::calculation::order_total;
/// use profitability_engine::models::{LineType, Order, OrderLine, OrderSection, OrderStatus};
/// use rust_decimal::Decimal;
///
/// let order = Order {
///     reference: "D2025-001".to_string(),
///     status: OrderStatus::Signed,
///     contingency_percentage: Some(Decimal::new(10, 0)),
///     sections: vec![OrderSection {
///         title: "Build".to_string(),
///         lines: vec![OrderLine {
///             line_type: LineType::Service,
///             days: Decimal::new(10, 0),
///             daily_rate: Decimal::new(500, 0),
///             purchase_amount: None,
///             profile: None,
///         }],
///     }],
/// };
///
/// assert_eq!(order_total(&order), Decimal::new(4500, 0));
/// ```
pub fn order_total(order: &Order) -> Decimal {
    let gross: Decimal = order.lines().map(|line| line.days * line.daily_rate).sum();
    match order.contingency_percentage {
        Some(contingency) if !contingency.is_zero() => {
            gross - gross * contingency / Decimal::ONE_HUNDRED
        }
        _ => gross,
    }
}

pub(super) struct TimesheetTotals {
    pub(super) worked_hours: Decimal,
    pub(super) excluded_hours: Decimal,
    pub(super) cost: Decimal,
    pub(super) sale_value: Decimal,
    pub(super) warnings: Vec<CalculationWarning>,
}

/// Values the countable timesheets at cost and at sale rate, and tallies
/// hours.
pub(super) fn cost_timesheets<'a, I>(
    timesheets: I,
    directory: &ContributorDirectory,
) -> TimesheetTotals
where
    I: IntoIterator<Item = &'a TimesheetFact>,
{
    let mut totals = TimesheetTotals {
        worked_hours: Decimal::ZERO,
        excluded_hours: Decimal::ZERO,
        cost: Decimal::ZERO,
        sale_value: Decimal::ZERO,
        warnings: Vec::new(),
    };
    let mut reported = HashSet::new();

    for entry in timesheets {
        totals.worked_hours += entry.hours;
        if !entry.counts_for_profitability() {
            totals.excluded_hours += entry.hours;
            continue;
        }

        let Some(contributor) = directory.get(&entry.contributor_id) else {
            if reported.insert(format!("unknown:{}", entry.contributor_id)) {
                warn!(
                    contributor_id = %entry.contributor_id,
                    project_id = %entry.project_id,
                    "Timesheet for unknown contributor, costed at zero"
                );
                totals.warnings.push(CalculationWarning {
                    code: "unknown_contributor".to_string(),
                    message: format!(
                        "Contributor '{}' is unknown; their hours are costed at zero",
                        entry.contributor_id
                    ),
                    severity: Severity::Medium,
                });
            }
            continue;
        };

        let resolution = resolve_daily_cost(contributor, entry.date);
        if let Some(anomaly) = &resolution.anomaly {
            let warning = CalculationWarning::from(anomaly);
            if reported.insert(warning.message.clone()) {
                totals.warnings.push(warning);
            }
        }
        totals.cost += entry.hours * resolution.daily_cost / HOURS_PER_DAY;
        let daily_rate = resolve_daily_rate(contributor, entry.date);
        totals.sale_value += entry.hours * daily_rate / HOURS_PER_DAY;
    }

    totals
}

/// Calculates the profitability of a project.
///
/// # Arguments
///
/// * `project` - The project's orders, purchases and timesheets
/// * `directory` - Contributors referenced by the timesheets
///
/// # Returns
///
/// A [`ProjectProfitability`]. Internal projects report zero revenue, cost,
/// margin, margin rate and sold days but still report hours, orders and
/// purchases. Timesheets of unknown contributors are costed at zero and
/// flagged in `warnings`.
pub fn calculate_project_profitability(
    project: &ProjectFinancialFacts,
    directory: &ContributorDirectory,
) -> ProjectProfitability {
    let purchases_amount = project.purchases_amount.unwrap_or(Decimal::ZERO);
    let mut audit = AuditTrace::default();

    if project.is_internal {
        let worked_hours: Decimal = project.timesheets.iter().map(|t| t.hours).sum();
        let excluded_hours: Decimal = project
            .timesheets
            .iter()
            .filter(|t| !t.counts_for_profitability())
            .map(|t| t.hours)
            .sum();
        let billable_hours = worked_hours - excluded_hours;

        audit.record(
            "internal_project",
            "Internal Project",
            serde_json::json!({ "project_id": project.project_id }),
            serde_json::json!({ "worked_hours": worked_hours.to_string() }),
            "Internal projects are not evaluated for profit".to_string(),
        );

        return ProjectProfitability {
            project_id: project.project_id.clone(),
            is_internal: true,
            revenue: Decimal::ZERO,
            cost: Decimal::ZERO,
            timesheet_cost: Decimal::ZERO,
            margin: Decimal::ZERO,
            margin_rate: Decimal::ZERO,
            sold_days: Decimal::ZERO,
            worked_hours,
            worked_days: round_money(hours_to_days(worked_hours)),
            excluded_hours,
            billable_hours,
            billable_days: round_money(hours_to_days(billable_hours)),
            orders_count: project.orders.len(),
            purchases_amount,
            warnings: Vec::new(),
            audit,
        };
    }

    let revenue = round_money(project.revenue_orders().map(order_total).sum());
    let sold_days: Decimal = project
        .revenue_orders()
        .flat_map(Order::lines)
        .map(|line| line.days)
        .sum();
    audit.record(
        "revenue",
        "Order Revenue",
        serde_json::json!({
            "orders": project.orders.len(),
            "revenue_orders": project.revenue_orders().count(),
        }),
        serde_json::json!({
            "revenue": revenue.to_string(),
            "sold_days": sold_days.to_string(),
        }),
        "Sum of signed, won and completed orders less contingency".to_string(),
    );

    let totals = cost_timesheets(&project.timesheets, directory);
    let timesheet_cost = round_money(totals.cost);
    let line_purchases: Decimal = project
        .all_lines()
        .filter_map(|line| line.purchase_amount)
        .sum();
    let cost = round_money(timesheet_cost + purchases_amount + line_purchases);
    audit.record(
        "cost",
        "Project Cost",
        serde_json::json!({
            "countable_hours": (totals.worked_hours - totals.excluded_hours).to_string(),
            "project_purchases": purchases_amount.to_string(),
            "line_purchases": line_purchases.to_string(),
        }),
        serde_json::json!({
            "timesheet_cost": timesheet_cost.to_string(),
            "cost": cost.to_string(),
        }),
        format!(
            "{} (timesheets) + {} (project purchases) + {} (order purchases) = {}",
            timesheet_cost, purchases_amount, line_purchases, cost
        ),
    );

    let margin = revenue - cost;
    let margin_rate = safe_percentage(margin, revenue);
    let billable_hours = totals.worked_hours - totals.excluded_hours;

    debug!(
        project_id = %project.project_id,
        revenue = %revenue,
        cost = %cost,
        margin_rate = %margin_rate,
        "Calculated project profitability"
    );

    ProjectProfitability {
        project_id: project.project_id.clone(),
        is_internal: false,
        revenue,
        cost,
        timesheet_cost,
        margin,
        margin_rate,
        sold_days,
        worked_hours: totals.worked_hours,
        worked_days: round_money(hours_to_days(totals.worked_hours)),
        excluded_hours: totals.excluded_hours,
        billable_hours,
        billable_days: round_money(hours_to_days(billable_hours)),
        orders_count: project.orders.len(),
        purchases_amount,
        warnings: totals.warnings,
        audit,
    }
}

/// Compares sold days against billable days.
pub fn compare_forecast_vs_realized(profitability: &ProjectProfitability) -> ForecastComparison {
    let days_overrun = profitability.billable_days - profitability.sold_days;
    let overrun_percentage = round_dp(
        safe_ratio(days_overrun, profitability.sold_days) * Decimal::ONE_HUNDRED,
        1,
    );
    let efficiency_rate = round_dp(
        safe_ratio(profitability.sold_days, profitability.billable_days) * Decimal::ONE_HUNDRED,
        1,
    );

    ForecastComparison {
        sold_days: profitability.sold_days,
        worked_days: profitability.worked_days,
        billable_days: profitability.billable_days,
        days_overrun,
        overrun_percentage,
        is_overrun: days_overrun > Decimal::ZERO,
        efficiency_rate,
    }
}

/// Raises alerts on negative margins, low margin rates and day overruns.
///
/// Internal projects never raise alerts.
pub fn profitability_alerts(profitability: &ProjectProfitability) -> Vec<ProfitabilityAlert> {
    let mut alerts = Vec::new();
    if profitability.is_internal {
        return alerts;
    }

    if profitability.margin < Decimal::ZERO {
        alerts.push(ProfitabilityAlert {
            kind: AlertKind::NegativeMargin,
            level: AlertLevel::Danger,
            title: "Negative margin".to_string(),
            message: format!(
                "The project shows a negative margin of {}",
                round_money(profitability.margin)
            ),
        });
    }

    let rate = profitability.margin_rate;
    if rate >= Decimal::ZERO && rate < LOW_MARGIN_RATE {
        alerts.push(ProfitabilityAlert {
            kind: AlertKind::LowMarginRate,
            level: AlertLevel::Warning,
            title: "Low margin rate".to_string(),
            message: format!("The margin rate is only {}%", round_dp(rate, 1)),
        });
    }

    let comparison = compare_forecast_vs_realized(profitability);
    if comparison.overrun_percentage > OVERRUN_ALERT_PERCENTAGE {
        alerts.push(ProfitabilityAlert {
            kind: AlertKind::BudgetOverrun,
            level: AlertLevel::Warning,
            title: "Budget overrun".to_string(),
            message: format!(
                "The project exceeds its initial budget by {}% ({} days)",
                comparison.overrun_percentage,
                round_money(comparison.days_overrun)
            ),
        });
    }

    alerts
}

/// Sums revenue and cost over external projects and counts both kinds.
pub fn global_kpis(projects: &[ProjectProfitability]) -> GlobalKpis {
    let mut kpis = GlobalKpis {
        total_revenue: Decimal::ZERO,
        total_cost: Decimal::ZERO,
        total_margin: Decimal::ZERO,
        global_margin_rate: Decimal::ZERO,
        external_projects_count: 0,
        internal_projects_count: 0,
    };

    for project in projects {
        if project.is_internal {
            kpis.internal_projects_count += 1;
            continue;
        }
        kpis.total_revenue += project.revenue;
        kpis.total_cost += project.cost;
        kpis.external_projects_count += 1;
    }

    kpis.total_margin = kpis.total_revenue - kpis.total_cost;
    kpis.global_margin_rate = safe_percentage(kpis.total_margin, kpis.total_revenue);
    kpis
}

/// Calculates a contributor's billability and estimated margin over
/// `[start, end]`.
///
/// Only countable hours generate revenue (at the daily sale rate) and cost
/// (at the daily cost), both valued on the day worked.
pub fn contributor_performance(
    contributor: &Contributor,
    timesheets: &[TimesheetFact],
    start: NaiveDate,
    end: NaiveDate,
) -> ContributorPerformance {
    let mut total_hours = Decimal::ZERO;
    let mut billable_hours = Decimal::ZERO;
    let mut revenue = Decimal::ZERO;
    let mut cost = Decimal::ZERO;
    let mut projects = HashSet::new();
    let mut warnings: Vec<CalculationWarning> = Vec::new();

    let in_range = timesheets.iter().filter(|t| {
        t.contributor_id == contributor.id && t.date >= start && t.date <= end
    });

    for entry in in_range {
        total_hours += entry.hours;
        projects.insert(entry.project_id.as_str());

        if !entry.counts_for_profitability() {
            continue;
        }
        billable_hours += entry.hours;

        let resolution = resolve_daily_cost(contributor, entry.date);
        if let Some(anomaly) = &resolution.anomaly {
            let warning = CalculationWarning::from(anomaly);
            if !warnings.contains(&warning) {
                warnings.push(warning);
            }
        }
        cost += entry.hours * resolution.daily_cost / HOURS_PER_DAY;
        revenue += entry.hours * resolve_daily_rate(contributor, entry.date) / HOURS_PER_DAY;
    }

    let estimated_revenue = round_money(revenue);
    let total_cost = round_money(cost);
    let margin = estimated_revenue - total_cost;

    ContributorPerformance {
        contributor_id: contributor.id.clone(),
        total_hours,
        billable_hours,
        non_billable_hours: total_hours - billable_hours,
        billability_rate: safe_percentage(billable_hours, total_hours),
        estimated_revenue,
        total_cost,
        margin,
        margin_rate: safe_percentage(margin, estimated_revenue),
        projects_count: projects.len(),
        warnings,
    }
}
