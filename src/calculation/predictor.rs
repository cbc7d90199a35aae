//! Final margin prediction.
//!
//! Extrapolates a project's final hours from its burn rate (hours spent per
//! point of progress) and values them with the flat daily cost of
//! [`EstimationSettings`]. Projects below 30% progress, or without a sold
//! amount or sold hours, cannot be predicted; that is a normal outcome
//! carried as [`PredictionOutcome::Unavailable`], not an error.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::EstimationSettings;
use crate::models::{ProjectFinancialFacts, Severity};

use super::rounding::{round_dp, round_money, safe_ratio};
use super::time_conversion::HOURS_PER_DAY;

/// Minimum progress, in percent, before a prediction is attempted.
pub const MINIMUM_PREDICTION_PROGRESS: Decimal = Decimal::from_parts(30, 0, 0, false, 0);

/// Reason given when the project has not progressed enough.
pub const INSUFFICIENT_PROGRESS_REASON: &str = "Not enough data (progress below 30%)";

/// Reason given when the project has no sold amount or sold hours.
pub const MISSING_BUDGET_REASON: &str = "Insufficient data (sold amount or sold hours missing)";

/// Urgency of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Can wait.
    Low,
    /// Should be scheduled.
    Medium,
    /// Act now.
    High,
}

/// Area a recommendation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    /// Hours are running ahead of progress.
    BudgetControl,
    /// The final margin is too low.
    Profitability,
    /// The project is doing better than budgeted.
    Positive,
}

/// A recommendation with its action checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Urgency.
    pub priority: Priority,
    /// Area addressed.
    pub kind: RecommendationKind,
    /// Headline.
    pub title: String,
    /// Actions to take.
    pub actions: Vec<String>,
}

/// Hours spent compared with the hours expected at the current progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetDrift {
    /// True when more hours were spent than expected.
    pub has_overrun: bool,
    /// Spent minus expected hours, 1 decimal.
    pub overrun_hours: Decimal,
    /// Overrun over expected hours, in percent, 2 decimals.
    pub overrun_percentage: Decimal,
    /// Graded severity of the overrun.
    pub severity: Severity,
    /// Sold hours × progress, 1 decimal.
    pub expected_hours: Decimal,
    /// Hours actually spent.
    pub actual_hours: Decimal,
}

/// Outcome of one what-if scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioProjection {
    /// Projected total hours, 1 decimal.
    pub total_hours: Decimal,
    /// Projected total cost, 0 decimals.
    pub total_cost: Decimal,
    /// Projected margin, in percent, 2 decimals.
    pub margin: Decimal,
    /// Sold amount minus projected cost, 0 decimals.
    pub profit: Decimal,
}

/// The three what-if scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionScenarios {
    /// Realistic hours × 0.85.
    pub optimistic: ScenarioProjection,
    /// Burn-rate extrapolation.
    pub realistic: ScenarioProjection,
    /// Realistic hours × 1.20.
    pub pessimistic: ScenarioProjection,
}

/// A successful margin prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitabilityPrediction {
    /// Progress the prediction is based on.
    pub current_progress: Decimal,
    /// Hours spent per point of progress.
    pub burn_rate: Decimal,
    /// Hours at 100% progress, 1 decimal.
    pub projected_total_hours: Decimal,
    /// Projected hours valued at the flat daily cost, 0 decimals.
    pub projected_total_cost: Decimal,
    /// Final margin if the burn rate holds, 2 decimals.
    pub projected_margin: Decimal,
    /// Margin if exactly the sold hours are spent, 2 decimals.
    pub budgeted_margin: Decimal,
    /// Projected minus budgeted margin.
    pub margin_difference: Decimal,
    /// Margin on the hours spent so far, 2 decimals.
    pub current_margin: Decimal,
    /// Drift of spent hours against progress.
    pub budget_drift: BudgetDrift,
    /// What-if scenarios.
    pub scenarios: PredictionScenarios,
    /// Recommendations from the rule table.
    pub recommendations: Vec<Recommendation>,
}

/// Result of a prediction attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum PredictionOutcome {
    /// The project cannot be predicted yet.
    Unavailable {
        /// Why no prediction was made.
        reason: String,
        /// Progress of the project.
        current_progress: Decimal,
    },
    /// The prediction.
    Available(Box<ProfitabilityPrediction>),
}

impl PredictionOutcome {
    /// Returns true when a prediction was made.
    pub fn can_predict(&self) -> bool {
        matches!(self, PredictionOutcome::Available(_))
    }

    /// Returns the prediction, if any.
    pub fn prediction(&self) -> Option<&ProfitabilityPrediction> {
        match self {
            PredictionOutcome::Available(prediction) => Some(prediction),
            PredictionOutcome::Unavailable { .. } => None,
        }
    }
}

struct CostModel {
    sold_amount: Decimal,
    daily_cost: Decimal,
}

impl CostModel {
    fn cost(&self, hours: Decimal) -> Decimal {
        hours / HOURS_PER_DAY * self.daily_cost
    }

    fn margin(&self, hours: Decimal) -> Decimal {
        safe_ratio(self.sold_amount - self.cost(hours), self.sold_amount) * Decimal::ONE_HUNDRED
    }

    fn scenario(&self, hours: Decimal) -> ScenarioProjection {
        let cost = self.cost(hours);
        ScenarioProjection {
            total_hours: round_dp(hours, 1),
            total_cost: round_dp(cost, 0),
            margin: round_money(self.margin(hours)),
            profit: round_dp(self.sold_amount - cost, 0),
        }
    }
}

/// Grades an overrun percentage.
///
/// # Example
///
/// ```
/// use profitability_engine::calculation::drift_severity;
/// use profitability_engine::models::Severity;
/// use rust_decimal::Decimal;
///
/// assert_eq!(drift_severity(Decimal::new(31, 0)), Severity::Critical);
/// assert_eq!(drift_severity(Decimal::new(30, 0)), Severity::High);
/// assert_eq!(drift_severity(Decimal::new(5, 0)), Severity::Low);
/// ```
pub fn drift_severity(overrun_percentage: Decimal) -> Severity {
    if overrun_percentage > dec!(30) {
        Severity::Critical
    } else if overrun_percentage > dec!(15) {
        Severity::High
    } else if overrun_percentage > dec!(5) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn budget_drift(project: &ProjectFinancialFacts) -> BudgetDrift {
    let expected = project.sold_hours * project.global_progress / Decimal::ONE_HUNDRED;
    let overrun = project.spent_hours - expected;
    let percentage = safe_ratio(overrun, expected) * Decimal::ONE_HUNDRED;

    BudgetDrift {
        has_overrun: overrun > Decimal::ZERO,
        overrun_hours: round_dp(overrun, 1),
        overrun_percentage: round_money(percentage),
        severity: drift_severity(percentage),
        expected_hours: round_dp(expected, 1),
        actual_hours: project.spent_hours,
    }
}

fn recommendation(
    priority: Priority,
    kind: RecommendationKind,
    title: &str,
    actions: &[&str],
) -> Recommendation {
    Recommendation {
        priority,
        kind,
        title: title.to_string(),
        actions: actions.iter().map(|a| a.to_string()).collect(),
    }
}

/// Applies the recommendation rule table.
///
/// Drift rules and margin rules fire independently; the positive rule only
/// fires when nothing else did and the projection beats the budget.
pub fn recommendations(
    drift_severity: Severity,
    projected_margin: Decimal,
    budgeted_margin: Decimal,
) -> Vec<Recommendation> {
    let mut rules = Vec::new();

    match drift_severity {
        Severity::Critical => rules.push(recommendation(
            Priority::High,
            RecommendationKind::BudgetControl,
            "Urgent action required",
            &[
                "Analyse overloaded tasks",
                "Identify the causes of the overrun",
                "Reduce scope where possible",
                "Negotiate a change order with the client",
            ],
        )),
        Severity::High => rules.push(recommendation(
            Priority::Medium,
            RecommendationKind::BudgetControl,
            "Close monitoring required",
            &[
                "Strengthen weekly follow-up",
                "Optimise resource allocation",
                "Prioritise essential features",
            ],
        )),
        Severity::Medium | Severity::Low => {}
    }

    if projected_margin < dec!(10) {
        rules.push(recommendation(
            Priority::High,
            RecommendationKind::Profitability,
            "Predicted final margin is very low",
            &[
                "Cut secondary features",
                "Assign less expensive profiles where possible",
                "Negotiate a change order to increase the budget",
                "Document the reasons for the overrun",
            ],
        ));
    } else if projected_margin < dec!(20) {
        rules.push(recommendation(
            Priority::Medium,
            RecommendationKind::Profitability,
            "Predicted final margin below target",
            &[
                "Streamline delivery processes",
                "Avoid unnecessary polishing",
                "Reuse existing components",
            ],
        ));
    }

    if rules.is_empty() && projected_margin > budgeted_margin {
        rules.push(recommendation(
            Priority::Low,
            RecommendationKind::Positive,
            "Excellent performance",
            &[
                "Document good practices",
                "Share learnings with the team",
                "Build on this momentum",
            ],
        ));
    }

    rules
}

/// Predicts the final margin of a project.
///
/// # Arguments
///
/// * `project` - Sold amount, sold and spent hours and progress of the project
/// * `settings` - The flat daily cost used to value hours
///
/// # Example
///
/// ```
/// use profitability_engine::calculation::{
///     INSUFFICIENT_PROGRESS_REASON, PredictionOutcome, predict_profitability,
/// };
/// use profitability_engine::config::EstimationSettings;
/// use profitability_engine::models::{ProjectFinancialFacts, ProjectStatus};
/// use rust_decimal::Decimal;
///
/// let project = ProjectFinancialFacts {
///     project_id: "prj_001".to_string(),
///     name: "Mobile app".to_string(),
///     is_internal: false,
///     status: ProjectStatus::InProgress,
///     start_date: None,
///     end_date: None,
///     sold_amount: Decimal::new(20000, 0),
///     sold_hours: Decimal::new(200, 0),
///     estimated_cost: Decimal::ZERO,
///     spent_hours: Decimal::new(20, 0),
///     purchases_amount: None,
///     global_progress: Decimal::new(10, 0),
///     orders: vec![],
///     timesheets: vec![],
/// };
///
/// match predict_profitability(&project, &EstimationSettings::default()) {
///     PredictionOutcome::Unavailable { reason, .. } => {
///         assert_eq!(reason, INSUFFICIENT_PROGRESS_REASON)
///     }
///     PredictionOutcome::Available(_) => panic!("a 10% project cannot be predicted"),
/// }
/// ```
pub fn predict_profitability(
    project: &ProjectFinancialFacts,
    settings: &EstimationSettings,
) -> PredictionOutcome {
    let progress = project.global_progress;

    if progress < MINIMUM_PREDICTION_PROGRESS {
        return PredictionOutcome::Unavailable {
            reason: INSUFFICIENT_PROGRESS_REASON.to_string(),
            current_progress: progress,
        };
    }
    if project.sold_amount <= Decimal::ZERO || project.sold_hours <= Decimal::ZERO {
        return PredictionOutcome::Unavailable {
            reason: MISSING_BUDGET_REASON.to_string(),
            current_progress: progress,
        };
    }

    let model = CostModel {
        sold_amount: project.sold_amount,
        daily_cost: settings.assumed_daily_cost,
    };

    let burn_rate = project.spent_hours / progress;
    let projected_hours = burn_rate * Decimal::ONE_HUNDRED;

    let projected_margin = model.margin(projected_hours);
    let budgeted_margin = model.margin(project.sold_hours);
    let drift = budget_drift(project);
    let recommendations = recommendations(drift.severity, projected_margin, budgeted_margin);

    let projected_margin = round_money(projected_margin);
    let budgeted_margin = round_money(budgeted_margin);

    PredictionOutcome::Available(Box::new(ProfitabilityPrediction {
        current_progress: progress,
        burn_rate: round_dp(burn_rate, 4),
        projected_total_hours: round_dp(projected_hours, 1),
        projected_total_cost: round_dp(model.cost(projected_hours), 0),
        projected_margin,
        budgeted_margin,
        margin_difference: projected_margin - budgeted_margin,
        current_margin: round_money(model.margin(project.spent_hours)),
        budget_drift: drift,
        scenarios: PredictionScenarios {
            optimistic: model.scenario(projected_hours * dec!(0.85)),
            realistic: model.scenario(projected_hours),
            pessimistic: model.scenario(projected_hours * dec!(1.20)),
        },
        recommendations,
    }))
}
