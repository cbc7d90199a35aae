//! Core data models for the profitability engine.
//!
//! This module contains the value objects the engine consumes (contributors,
//! projects, revenue series, quotes, plannings, vacations) and the shared
//! types it produces (audit steps, severities, warnings, fact rows).

mod audit;
mod contributor;
mod forecast;
mod pipeline;
mod project;
mod staffing;
mod warning;

pub use audit::{AuditStep, AuditTrace};
pub use contributor::{Contributor, EmploymentPeriod};
pub use forecast::{MonthlyRevenue, YearMonth};
pub use pipeline::{ConfirmedOrder, PendingQuote, PlanningRecord, PlanningStatus};
pub use project::{
    LineType, Order, OrderLine, OrderSection, OrderStatus, ProjectFinancialFacts, ProjectStatus,
    TaskType, TimesheetFact, TimesheetTask,
};
pub use staffing::{
    FactKey, Granularity, StaffingContributor, StaffingFactRow, VacationRecord, VacationStatus,
};
pub use warning::{CalculationWarning, Severity};
