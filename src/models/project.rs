//! Project, order and timesheet models.
//!
//! This module defines the financial facts of a project: its orders (quotes)
//! with their sections and lines, and the timesheets recorded against it.
//! Orders and task categories are closed enumerations so that a new status
//! has to be handled explicitly wherever it matters.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Lifecycle status of an order (quote).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Being drafted, not yet sent.
    Draft,
    /// Sent to the client, awaiting signature.
    PendingSignature,
    /// Verbally won, signature pending.
    Won,
    /// Signed by the client.
    Signed,
    /// Delivered and closed.
    Completed,
    /// Lost to a competitor or declined.
    Lost,
    /// Put on hold by the client.
    Standby,
    /// Abandoned before signature.
    Abandoned,
}

impl OrderStatus {
    /// Returns true for statuses whose amount is recognised as revenue.
    ///
    /// # Example
    ///
    /// ```
    /// use profitability_engine::models::OrderStatus;
    ///
    /// assert!(OrderStatus::Signed.counts_as_revenue());
    /// assert!(!OrderStatus::PendingSignature.counts_as_revenue());
    /// ```
    pub fn counts_as_revenue(self) -> bool {
        match self {
            OrderStatus::Won | OrderStatus::Signed | OrderStatus::Completed => true,
            OrderStatus::Draft
            | OrderStatus::PendingSignature
            | OrderStatus::Lost
            | OrderStatus::Standby
            | OrderStatus::Abandoned => false,
        }
    }
}

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// Opened but not yet staffed.
    Planned,
    /// Active (generic).
    Active,
    /// Delivery under way.
    InProgress,
    /// Paused.
    OnHold,
    /// Delivered.
    Completed,
    /// Stopped before delivery.
    Cancelled,
}

/// Category of the task a timesheet is booked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Regular sold work.
    Regular,
    /// Pre-sales work (AVV), excluded from profitability.
    Avv,
    /// Work that was never sold, excluded from profitability.
    NonBillable,
}

impl TaskType {
    /// Returns whether tasks of this type count for profitability unless
    /// configured otherwise.
    pub fn counts_for_profitability_by_default(self) -> bool {
        match self {
            TaskType::Regular => true,
            TaskType::Avv | TaskType::NonBillable => false,
        }
    }
}

/// The task a timesheet entry is booked on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimesheetTask {
    /// The task category.
    pub task_type: TaskType,
    /// Whether hours on this task enter cost and margin computations.
    pub counts_for_profitability: bool,
}

impl TimesheetTask {
    /// Creates a task whose countability follows its type.
    pub fn of_type(task_type: TaskType) -> Self {
        Self {
            task_type,
            counts_for_profitability: task_type.counts_for_profitability_by_default(),
        }
    }
}

/// A single time entry.
///
/// # Example
///
/// ```
/// use profitability_engine::models::{TaskType, TimesheetFact, TimesheetTask};
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
///
/// let entry = TimesheetFact {
///     contributor_id: "ctb_001".to_string(),
///     project_id: "prj_001".to_string(),
///     date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
///     hours: Decimal::new(75, 1),
///     task: Some(TimesheetTask::of_type(TaskType::Avv)),
/// };
/// assert!(!entry.counts_for_profitability());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimesheetFact {
    /// The contributor who recorded the time.
    pub contributor_id: String,
    /// The project the time was booked on.
    pub project_id: String,
    /// The day worked.
    pub date: NaiveDate,
    /// Hours worked.
    pub hours: Decimal,
    /// The task the time was booked on, if any.
    #[serde(default)]
    pub task: Option<TimesheetTask>,
}

impl TimesheetFact {
    /// Returns true unless the associated task explicitly opts out of
    /// profitability. Entries without a task are countable.
    pub fn counts_for_profitability(&self) -> bool {
        self.task.is_none_or(|task| task.counts_for_profitability)
    }
}

/// Kind of an order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineType {
    /// Days of work sold at a daily rate.
    #[default]
    Service,
    /// A purchase resold to the client.
    Purchase,
    /// A fixed-price item.
    FixedAmount,
}

/// A line of an order section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// The kind of line.
    #[serde(default)]
    pub line_type: LineType,
    /// Days sold on this line.
    pub days: Decimal,
    /// Daily sale rate (TJM) of this line.
    pub daily_rate: Decimal,
    /// Purchase cost attached to the line, if any.
    #[serde(default)]
    pub purchase_amount: Option<Decimal>,
    /// Job profile the days are sold for, if any.
    #[serde(default)]
    pub profile: Option<String>,
}

/// A group of lines within an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSection {
    /// Section title.
    pub title: String,
    /// Lines of the section.
    #[serde(default)]
    pub lines: Vec<OrderLine>,
}

/// An order (quote) attached to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Order reference number.
    pub reference: String,
    /// Current status.
    pub status: OrderStatus,
    /// Contingency deducted from the total, in percent.
    #[serde(default)]
    pub contingency_percentage: Option<Decimal>,
    /// Sections of the order.
    #[serde(default)]
    pub sections: Vec<OrderSection>,
}

impl Order {
    /// Iterates over every line of every section.
    pub fn lines(&self) -> impl Iterator<Item = &OrderLine> {
        self.sections.iter().flat_map(|section| section.lines.iter())
    }
}

/// Financial facts of a single project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFinancialFacts {
    /// Unique identifier for the project.
    pub project_id: String,
    /// Project name.
    pub name: String,
    /// Internal projects are tracked but not evaluated for profit.
    #[serde(default)]
    pub is_internal: bool,
    /// Current status.
    pub status: ProjectStatus,
    /// Planned start date.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    /// Planned end date.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    /// Total sold amount of the project's tasks.
    pub sold_amount: Decimal,
    /// Total hours sold across the project's tasks.
    pub sold_hours: Decimal,
    /// Total estimated cost of the project's tasks.
    #[serde(default)]
    pub estimated_cost: Decimal,
    /// Total hours spent across the project's tasks.
    pub spent_hours: Decimal,
    /// Purchases booked directly on the project.
    #[serde(default)]
    pub purchases_amount: Option<Decimal>,
    /// Global completion, in percent.
    pub global_progress: Decimal,
    /// Orders attached to the project.
    #[serde(default)]
    pub orders: Vec<Order>,
    /// Time entries booked on the project.
    #[serde(default)]
    pub timesheets: Vec<TimesheetFact>,
}

impl ProjectFinancialFacts {
    /// Iterates over the orders whose amount counts as revenue.
    pub fn revenue_orders(&self) -> impl Iterator<Item = &Order> {
        self.orders
            .iter()
            .filter(|order| order.status.counts_as_revenue())
    }

    /// Iterates over every line of every order, whatever its status.
    pub fn all_lines(&self) -> impl Iterator<Item = &OrderLine> {
        self.orders.iter().flat_map(Order::lines)
    }

    /// Purchases booked on the project plus those attached to order lines.
    pub fn total_purchases(&self) -> Decimal {
        let line_purchases: Decimal = self.all_lines().filter_map(|l| l.purchase_amount).sum();
        self.purchases_amount.unwrap_or(Decimal::ZERO) + line_purchases
    }
}
