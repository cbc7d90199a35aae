//! Project risk analysis.
//!
//! Five independent checks (budget, schedule, profitability, timesheet
//! completeness and stagnation) each subtract a penalty from a score of
//! 100. A second, weighted view scores four components of project health.
//! The analysis date is always passed in; nothing here reads the clock.

use chrono::{Days, Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EstimationSettings;
use crate::models::{ProjectFinancialFacts, ProjectStatus, Severity};

use super::rounding::{round_dp, safe_ratio};
use super::time_conversion::HOURS_PER_DAY;

const RECENT_TIMESHEET_DAYS: u64 = 14;

/// Kind of risk detected on a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskKind {
    /// Spent hours exceed sold hours by more than 10%.
    BudgetOverrun,
    /// Spent hours exceed sold hours.
    BudgetWarning,
    /// End date has passed.
    ScheduleDelay,
    /// Progress lags elapsed time by more than 20 points.
    ScheduleRisk,
    /// Estimated margin below zero.
    NegativeMargin,
    /// Estimated margin below 10%.
    LowMargin,
    /// Estimated margin below 20%.
    MarginWarning,
    /// In-progress project without any timesheet.
    NoTimesheets,
    /// In-progress project without a timesheet in the last 14 days.
    MissingTimesheets,
    /// No progress a month after start.
    NotStarted,
    /// Progress at 100% but the project is still open.
    CompletionPending,
}

/// One risk found on a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFinding {
    /// The kind of risk.
    pub kind: RiskKind,
    /// How serious it is.
    pub severity: Severity,
    /// Explanation with the figures involved.
    pub message: String,
    /// Points subtracted from the health score.
    pub penalty: u32,
}

/// Overall risk level derived from the health score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    /// Score of 80 or more.
    Low,
    /// Score of 60 or more.
    Medium,
    /// Score of 40 or more.
    High,
    /// Score below 40.
    Critical,
}

impl RiskLevel {
    /// Maps a health score to a risk level.
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => RiskLevel::Low,
            60..=79 => RiskLevel::Medium,
            40..=59 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }
}

/// Risk assessment of one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRiskAssessment {
    /// The project.
    pub project_id: String,
    /// Project name.
    pub project_name: String,
    /// 100 minus the penalties, never below 0.
    pub health_score: u32,
    /// Level derived from the score.
    pub risk_level: RiskLevel,
    /// Risks found, in check order.
    pub risks: Vec<RiskFinding>,
}

/// Health level of the weighted component score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLevel {
    /// Score above 80.
    Healthy,
    /// Score of 50 or more.
    Warning,
    /// Score below 50.
    Critical,
}

/// Component sub-scores, each on 0-100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthComponents {
    /// Spent versus sold hours (40%).
    pub budget: u32,
    /// Progress versus elapsed time (30%).
    pub timeline: u32,
    /// Recent activity (20%).
    pub velocity: u32,
    /// Estimated margin (10%).
    pub quality: u32,
}

/// Weighted health score of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthScore {
    /// The project.
    pub project_id: String,
    /// Weighted score, rounded.
    pub score: u32,
    /// Level derived from the score.
    pub level: HealthLevel,
    /// The four sub-scores.
    pub components: HealthComponents,
    /// Advice for every component below 70.
    pub recommendations: Vec<String>,
}

fn budget_overrun_percentage(project: &ProjectFinancialFacts) -> Option<Decimal> {
    if project.sold_hours.is_zero() {
        return None;
    }
    Some((project.spent_hours - project.sold_hours) / project.sold_hours * Decimal::ONE_HUNDRED)
}

/// Margin if spent hours were valued at the flat daily cost.
fn estimated_margin(
    project: &ProjectFinancialFacts,
    settings: &EstimationSettings,
) -> Option<Decimal> {
    if project.sold_amount.is_zero() {
        return None;
    }
    let cost = project.spent_hours / HOURS_PER_DAY * settings.assumed_daily_cost;
    Some(safe_ratio(project.sold_amount - cost, project.sold_amount) * Decimal::ONE_HUNDRED)
}

/// Elapsed share of the planned duration, in percent, when the project has
/// started and has a positive duration.
fn expected_progress(project: &ProjectFinancialFacts, as_of: NaiveDate) -> Option<Decimal> {
    let start = project.start_date?;
    let end = project.end_date?;
    if start > as_of {
        return None;
    }
    let total = (end - start).num_days();
    if total <= 0 {
        return None;
    }
    let elapsed = (as_of - start).num_days();
    Some(Decimal::from(elapsed) / Decimal::from(total) * Decimal::ONE_HUNDRED)
}

fn has_recent_timesheet(project: &ProjectFinancialFacts, as_of: NaiveDate) -> bool {
    let Some(threshold) = as_of.checked_sub_days(Days::new(RECENT_TIMESHEET_DAYS)) else {
        return true;
    };
    project.timesheets.iter().any(|t| t.date >= threshold)
}

/// True when the project started more than a month before `as_of`.
fn started_over_a_month_ago(project: &ProjectFinancialFacts, as_of: NaiveDate) -> bool {
    match (project.start_date, as_of.checked_sub_months(Months::new(1))) {
        (Some(start), Some(month_ago)) => start < month_ago,
        _ => false,
    }
}

fn is_running(status: ProjectStatus) -> bool {
    matches!(status, ProjectStatus::InProgress | ProjectStatus::Active)
}

fn check_budget(project: &ProjectFinancialFacts) -> Option<RiskFinding> {
    let overrun = budget_overrun_percentage(project)?;
    let (kind, severity, penalty) = if overrun > dec!(20) {
        (RiskKind::BudgetOverrun, Severity::Critical, 30)
    } else if overrun > dec!(10) {
        (RiskKind::BudgetOverrun, Severity::High, 20)
    } else if overrun > Decimal::ZERO {
        (RiskKind::BudgetWarning, Severity::Medium, 10)
    } else {
        return None;
    };

    Some(RiskFinding {
        kind,
        severity,
        message: format!(
            "Budget exceeded by {}% ({}h spent of {}h sold)",
            round_dp(overrun, 1),
            project.spent_hours,
            project.sold_hours
        ),
        penalty,
    })
}

fn check_schedule(project: &ProjectFinancialFacts, as_of: NaiveDate) -> Option<RiskFinding> {
    let end = project.end_date?;
    if project.status == ProjectStatus::Completed {
        return None;
    }

    if end < as_of {
        return Some(RiskFinding {
            kind: RiskKind::ScheduleDelay,
            severity: Severity::Critical,
            message: format!(
                "End date {} has passed by {} days",
                end,
                (as_of - end).num_days()
            ),
            penalty: 25,
        });
    }

    let expected = expected_progress(project, as_of)?;
    let gap = expected - project.global_progress;
    if gap > dec!(20) {
        return Some(RiskFinding {
            kind: RiskKind::ScheduleRisk,
            severity: Severity::High,
            message: format!(
                "Progress is {}% against {}% expected",
                project.global_progress,
                round_dp(expected, 1)
            ),
            penalty: 15,
        });
    }
    None
}

fn check_profitability(
    project: &ProjectFinancialFacts,
    settings: &EstimationSettings,
) -> Option<RiskFinding> {
    let margin = estimated_margin(project, settings)?;
    let (kind, severity, penalty) = if margin < Decimal::ZERO {
        (RiskKind::NegativeMargin, Severity::Critical, 30)
    } else if margin < dec!(10) {
        (RiskKind::LowMargin, Severity::High, 20)
    } else if margin < dec!(20) {
        (RiskKind::MarginWarning, Severity::Medium, 10)
    } else {
        return None;
    };

    Some(RiskFinding {
        kind,
        severity,
        message: format!("Estimated margin is {}%", round_dp(margin, 1)),
        penalty,
    })
}

fn check_timesheets(project: &ProjectFinancialFacts, as_of: NaiveDate) -> Option<RiskFinding> {
    if project.status != ProjectStatus::InProgress {
        return None;
    }

    if project.timesheets.is_empty() {
        return Some(RiskFinding {
            kind: RiskKind::NoTimesheets,
            severity: Severity::High,
            message: "No time has been recorded on this in-progress project".to_string(),
            penalty: 15,
        });
    }

    if !has_recent_timesheet(project, as_of) {
        return Some(RiskFinding {
            kind: RiskKind::MissingTimesheets,
            severity: Severity::Medium,
            message: format!("No time recorded in the last {} days", RECENT_TIMESHEET_DAYS),
            penalty: 10,
        });
    }
    None
}

fn check_stagnation(project: &ProjectFinancialFacts, as_of: NaiveDate) -> Option<RiskFinding> {
    if !is_running(project.status) {
        return None;
    }

    if project.global_progress.is_zero() && started_over_a_month_ago(project, as_of) {
        return Some(RiskFinding {
            kind: RiskKind::NotStarted,
            severity: Severity::High,
            message: "No progress more than a month after the start date".to_string(),
            penalty: 20,
        });
    }

    if project.global_progress >= Decimal::ONE_HUNDRED {
        return Some(RiskFinding {
            kind: RiskKind::CompletionPending,
            severity: Severity::Low,
            message: "Progress is at 100% but the project is not closed".to_string(),
            penalty: 5,
        });
    }
    None
}

/// Runs the five risk checks on a project.
///
/// # Arguments
///
/// * `project` - The project facts
/// * `as_of` - The analysis date
/// * `settings` - The flat daily cost used to estimate the margin
///
/// # Returns
///
/// A [`ProjectRiskAssessment`] whose score is 100 minus the penalties of the
/// risks found, floored at 0.
pub fn analyze_project(
    project: &ProjectFinancialFacts,
    as_of: NaiveDate,
    settings: &EstimationSettings,
) -> ProjectRiskAssessment {
    let risks: Vec<RiskFinding> = [
        check_budget(project),
        check_schedule(project, as_of),
        check_profitability(project, settings),
        check_timesheets(project, as_of),
        check_stagnation(project, as_of),
    ]
    .into_iter()
    .flatten()
    .collect();

    let penalties: u32 = risks.iter().map(|risk| risk.penalty).sum();
    let health_score = 100u32.saturating_sub(penalties);

    debug!(
        project_id = %project.project_id,
        health_score,
        risks = risks.len(),
        "Analyzed project risks"
    );

    ProjectRiskAssessment {
        project_id: project.project_id.clone(),
        project_name: project.name.clone(),
        health_score,
        risk_level: RiskLevel::from_score(health_score),
        risks,
    }
}

/// Assesses every project and sorts them riskiest first.
///
/// Projects with equal scores keep their input order.
pub fn rank_projects_by_risk(
    projects: &[ProjectFinancialFacts],
    as_of: NaiveDate,
    settings: &EstimationSettings,
) -> Vec<ProjectRiskAssessment> {
    let mut assessments: Vec<ProjectRiskAssessment> = projects
        .iter()
        .map(|project| analyze_project(project, as_of, settings))
        .collect();
    assessments.sort_by_key(|assessment| assessment.health_score);
    assessments
}

/// Returns only the projects scoring below 80, riskiest first.
pub fn at_risk_projects(
    projects: &[ProjectFinancialFacts],
    as_of: NaiveDate,
    settings: &EstimationSettings,
) -> Vec<ProjectRiskAssessment> {
    rank_projects_by_risk(projects, as_of, settings)
        .into_iter()
        .filter(|assessment| assessment.health_score < 80)
        .collect()
}

fn budget_score(project: &ProjectFinancialFacts) -> u32 {
    let Some(overrun) = budget_overrun_percentage(project) else {
        return 100;
    };
    if overrun <= Decimal::ZERO {
        100
    } else if overrun <= dec!(10) {
        80
    } else if overrun <= dec!(20) {
        60
    } else if overrun <= dec!(30) {
        40
    } else {
        20
    }
}

fn timeline_score(project: &ProjectFinancialFacts, as_of: NaiveDate) -> u32 {
    let Some(end) = project.end_date else {
        return 100;
    };
    if project.status == ProjectStatus::Completed {
        return 100;
    }

    if end < as_of {
        let days_late = (as_of - end).num_days();
        return if days_late > 30 {
            20
        } else if days_late > 14 {
            40
        } else {
            60
        };
    }

    let Some(expected) = expected_progress(project, as_of) else {
        return 100;
    };
    let gap = expected - project.global_progress;
    if gap <= dec!(5) {
        100
    } else if gap <= dec!(15) {
        80
    } else if gap <= dec!(30) {
        60
    } else if gap <= dec!(50) {
        40
    } else {
        20
    }
}

fn velocity_score(project: &ProjectFinancialFacts, as_of: NaiveDate) -> u32 {
    let in_progress = project.status == ProjectStatus::InProgress;

    if in_progress && project.timesheets.is_empty() {
        return 30;
    }
    if in_progress && !has_recent_timesheet(project, as_of) {
        return 50;
    }
    if project.global_progress.is_zero() && started_over_a_month_ago(project, as_of) {
        return 40;
    }
    if project.global_progress >= Decimal::ONE_HUNDRED
        && project.status != ProjectStatus::Completed
    {
        return 70;
    }
    100
}

fn quality_score(project: &ProjectFinancialFacts, settings: &EstimationSettings) -> u32 {
    match estimated_margin(project, settings) {
        Some(margin) if margin < Decimal::ZERO => 70,
        Some(margin) if margin < dec!(10) => 80,
        Some(margin) if margin < dec!(20) => 90,
        _ => 100,
    }
}

/// Scores project health on four weighted components.
///
/// Weights are budget 40%, timeline 30%, velocity 20% and quality 10%. The
/// level is healthy above 80, warning from 50 and critical below.
/// Recommendations are attached for components under 70, and for a quality
/// score of 80 or less (margin under 10%).
pub fn calculate_health_score(
    project: &ProjectFinancialFacts,
    as_of: NaiveDate,
    settings: &EstimationSettings,
) -> HealthScore {
    let components = HealthComponents {
        budget: budget_score(project),
        timeline: timeline_score(project, as_of),
        velocity: velocity_score(project, as_of),
        quality: quality_score(project, settings),
    };

    let weighted = Decimal::from(components.budget) * dec!(0.4)
        + Decimal::from(components.timeline) * dec!(0.3)
        + Decimal::from(components.velocity) * dec!(0.2)
        + Decimal::from(components.quality) * dec!(0.1);
    let score = round_dp(weighted, 0).to_u32().unwrap_or(0).min(100);

    let level = if score > 80 {
        HealthLevel::Healthy
    } else if score >= 50 {
        HealthLevel::Warning
    } else {
        HealthLevel::Critical
    };

    let mut recommendations = Vec::new();
    if components.budget < 70 {
        recommendations.push(format!(
            "Budget exceeded ({:.1}h / {:.1}h): review the scope or negotiate a change order",
            project.spent_hours, project.sold_hours
        ));
    }
    if components.timeline < 70 {
        recommendations
            .push("Project behind schedule: hold a progress review with the client".to_string());
        recommendations.push("Identify blocking tasks and prioritise them".to_string());
    }
    if components.velocity < 70 {
        recommendations.push("Low activity: check that timesheets are up to date".to_string());
        recommendations.push("Contact the team to identify potential blockers".to_string());
    }
    if components.quality <= 80 {
        recommendations.push("Low margin: monitor time spent and optimise processes".to_string());
    }

    HealthScore {
        project_id: project.project_id.clone(),
        score,
        level,
        components,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TimesheetFact;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn as_of() -> NaiveDate {
        date(2025, 6, 16)
    }

    fn timesheet_on(day: NaiveDate) -> TimesheetFact {
        TimesheetFact {
            contributor_id: "ctb_001".to_string(),
            project_id: "prj_001".to_string(),
            date: day,
            hours: dec("7"),
            task: None,
        }
    }

    /// A project with no risk at all: on budget, no end date, 50% margin,
    /// fresh timesheets, 50% progress.
    fn healthy() -> ProjectFinancialFacts {
        ProjectFinancialFacts {
            project_id: "prj_001".to_string(),
            name: "Intranet".to_string(),
            is_internal: false,
            status: ProjectStatus::InProgress,
            start_date: Some(date(2025, 3, 3)),
            end_date: None,
            sold_amount: dec("20000"),
            sold_hours: dec("200"),
            estimated_cost: Decimal::ZERO,
            spent_hours: dec("100"),
            purchases_amount: None,
            global_progress: dec("50"),
            orders: vec![],
            timesheets: vec![timesheet_on(date(2025, 6, 12))],
        }
    }

    fn kinds(assessment: &ProjectRiskAssessment) -> Vec<RiskKind> {
        assessment.risks.iter().map(|r| r.kind).collect()
    }

    #[test]
    fn test_healthy_project_scores_100() {
        let assessment = analyze_project(&healthy(), as_of(), &EstimationSettings::default());
        assert_eq!(assessment.health_score, 100);
        assert_eq!(assessment.risk_level, RiskLevel::Low);
        assert!(assessment.risks.is_empty());
    }

    #[test]
    fn test_budget_thresholds() {
        let settings = EstimationSettings::default();
        let mut p = healthy();
        p.sold_amount = dec("100000");

        p.spent_hours = dec("250");
        let a = analyze_project(&p, as_of(), &settings);
        assert_eq!(kinds(&a), vec![RiskKind::BudgetOverrun]);
        assert_eq!(a.risks[0].severity, Severity::Critical);
        assert_eq!(a.health_score, 70);

        p.spent_hours = dec("230");
        let a = analyze_project(&p, as_of(), &settings);
        assert_eq!(a.risks[0].severity, Severity::High);
        assert_eq!(a.health_score, 80);

        p.spent_hours = dec("201");
        let a = analyze_project(&p, as_of(), &settings);
        assert_eq!(kinds(&a), vec![RiskKind::BudgetWarning]);
        assert_eq!(a.health_score, 90);
    }

    #[test]
    fn test_no_sold_hours_skips_budget_check() {
        let mut p = healthy();
        p.sold_hours = Decimal::ZERO;
        let a = analyze_project(&p, as_of(), &EstimationSettings::default());
        assert!(!kinds(&a).contains(&RiskKind::BudgetOverrun));
        assert!(!kinds(&a).contains(&RiskKind::BudgetWarning));
    }

    #[test]
    fn test_schedule_delay() {
        let mut p = healthy();
        p.end_date = Some(date(2025, 6, 1));
        let a = analyze_project(&p, as_of(), &EstimationSettings::default());
        assert_eq!(kinds(&a), vec![RiskKind::ScheduleDelay]);
        assert_eq!(a.health_score, 75);
        assert_eq!(a.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn test_completed_project_has_no_schedule_risk() {
        let mut p = healthy();
        p.status = ProjectStatus::Completed;
        p.end_date = Some(date(2025, 6, 1));
        let a = analyze_project(&p, as_of(), &EstimationSettings::default());
        assert!(a.risks.is_empty());
    }

    #[test]
    fn test_schedule_risk_when_progress_lags() {
        let mut p = healthy();
        // 105 of 120 days elapsed, 87.5% expected vs 50% done
        p.end_date = Some(date(2025, 7, 1));
        let a = analyze_project(&p, as_of(), &EstimationSettings::default());
        assert_eq!(kinds(&a), vec![RiskKind::ScheduleRisk]);
        assert_eq!(a.health_score, 85);
    }

    #[test]
    fn test_margin_thresholds() {
        let settings = EstimationSettings::default();
        let mut p = healthy();
        // 100h spent = 5000 estimated cost

        p.sold_amount = dec("4000");
        assert_eq!(kinds(&analyze_project(&p, as_of(), &settings)), vec![RiskKind::NegativeMargin]);

        p.sold_amount = dec("5500");
        assert_eq!(kinds(&analyze_project(&p, as_of(), &settings)), vec![RiskKind::LowMargin]);

        p.sold_amount = dec("6000");
        assert_eq!(kinds(&analyze_project(&p, as_of(), &settings)), vec![RiskKind::MarginWarning]);

        p.sold_amount = dec("6250");
        assert!(analyze_project(&p, as_of(), &settings).risks.is_empty());
    }

    #[test]
    fn test_timesheet_checks() {
        let settings = EstimationSettings::default();
        let mut p = healthy();

        p.timesheets.clear();
        let a = analyze_project(&p, as_of(), &settings);
        assert_eq!(kinds(&a), vec![RiskKind::NoTimesheets]);
        assert_eq!(a.health_score, 85);

        p.timesheets = vec![timesheet_on(date(2025, 5, 30))];
        assert_eq!(
            kinds(&analyze_project(&p, as_of(), &settings)),
            vec![RiskKind::MissingTimesheets]
        );

        // Exactly 14 days ago still counts as recent
        p.timesheets = vec![timesheet_on(date(2025, 6, 2))];
        assert!(analyze_project(&p, as_of(), &settings).risks.is_empty());
    }

    #[test]
    fn test_stagnation_checks() {
        let settings = EstimationSettings::default();
        let mut p = healthy();

        p.global_progress = Decimal::ZERO;
        assert_eq!(kinds(&analyze_project(&p, as_of(), &settings)), vec![RiskKind::NotStarted]);

        p.start_date = Some(date(2025, 6, 1));
        assert!(analyze_project(&p, as_of(), &settings).risks.is_empty());

        p.global_progress = dec("100");
        let a = analyze_project(&p, as_of(), &settings);
        assert_eq!(kinds(&a), vec![RiskKind::CompletionPending]);
        assert_eq!(a.risks[0].severity, Severity::Low);
    }

    #[test]
    fn test_score_floored_at_zero() {
        let mut p = healthy();
        p.spent_hours = dec("400");
        p.sold_amount = dec("1000");
        p.end_date = Some(date(2025, 5, 1));
        p.timesheets.clear();
        p.global_progress = Decimal::ZERO;
        p.start_date = Some(date(2025, 1, 6));

        // 30 + 25 + 30 + 15 + 20 = 120 points
        let a = analyze_project(&p, as_of(), &EstimationSettings::default());
        assert_eq!(a.health_score, 0);
        assert_eq!(a.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_risk_level_boundaries() {
        assert_eq!(RiskLevel::from_score(80), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(79), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(60), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(59), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(40), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(39), RiskLevel::Critical);
    }

    #[test]
    fn test_ranking_and_at_risk_filter() {
        let healthy_project = healthy();
        let mut late = healthy();
        late.project_id = "prj_late".to_string();
        late.end_date = Some(date(2025, 6, 1));
        let mut broke = healthy();
        broke.project_id = "prj_broke".to_string();
        broke.sold_amount = dec("4000");
        broke.end_date = Some(date(2025, 6, 1));

        let projects = vec![healthy_project, late, broke];
        let settings = EstimationSettings::default();

        let ranked = rank_projects_by_risk(&projects, as_of(), &settings);
        let order: Vec<&str> = ranked.iter().map(|a| a.project_id.as_str()).collect();
        assert_eq!(order, vec!["prj_broke", "prj_late", "prj_001"]);

        let at_risk = at_risk_projects(&projects, as_of(), &settings);
        assert_eq!(at_risk.len(), 2);
        assert_eq!(at_risk[0].health_score, 45);
    }

    #[test]
    fn test_health_score_healthy() {
        let health = calculate_health_score(&healthy(), as_of(), &EstimationSettings::default());
        assert_eq!(health.score, 100);
        assert_eq!(health.level, HealthLevel::Healthy);
        assert!(health.recommendations.is_empty());
    }

    #[test]
    fn test_health_score_weighting() {
        let mut p = healthy();
        p.spent_hours = dec("250"); // 25% over: budget 40
        p.end_date = Some(date(2025, 6, 10)); // 6 days late: timeline 60
        p.timesheets.clear(); // velocity 30
        p.sold_amount = dec("100000"); // quality 100

        let health = calculate_health_score(&p, as_of(), &EstimationSettings::default());

        assert_eq!(
            health.components,
            HealthComponents {
                budget: 40,
                timeline: 60,
                velocity: 30,
                quality: 100
            }
        );
        // 16 + 18 + 6 + 10
        assert_eq!(health.score, 50);
        assert_eq!(health.level, HealthLevel::Warning);
        assert_eq!(health.recommendations.len(), 5);
        assert!(health.recommendations[0].starts_with("Budget exceeded (250.0h / 200.0h)"));
    }

    #[test]
    fn test_health_quality_component() {
        let mut p = healthy();
        p.sold_amount = dec("4000");
        let health = calculate_health_score(&p, as_of(), &EstimationSettings::default());
        assert_eq!(health.components.quality, 70);
        // 40 + 30 + 20 + 7
        assert_eq!(health.score, 97);
        assert_eq!(
            health.recommendations,
            vec!["Low margin: monitor time spent and optimise processes".to_string()]
        );
    }

    #[test]
    fn test_low_margin_recommendation_fires_from_80() {
        let settings = EstimationSettings::default();
        let low_margin = "Low margin: monitor time spent and optimise processes".to_string();

        // 100 hours at 400 a day cost 5000
        let mut p = healthy();
        p.sold_amount = dec("5400");
        let health = calculate_health_score(&p, as_of(), &settings);
        assert_eq!(health.components.quality, 80);
        assert_eq!(health.recommendations, vec![low_margin]);

        p.sold_amount = dec("6000");
        let health = calculate_health_score(&p, as_of(), &settings);
        assert_eq!(health.components.quality, 90);
        assert!(health.recommendations.is_empty());
    }

    #[test]
    fn test_health_timeline_gap_bands() {
        let mut p = healthy();
        p.start_date = Some(date(2025, 6, 6));
        p.end_date = Some(date(2025, 6, 26));
        // 10 of 20 days elapsed, 50% expected

        p.global_progress = dec("45");
        assert_eq!(timeline_score(&p, as_of()), 100);

        p.global_progress = dec("30");
        assert_eq!(timeline_score(&p, as_of()), 60);

        p.global_progress = dec("5");
        assert_eq!(timeline_score(&p, as_of()), 40);
    }
}
