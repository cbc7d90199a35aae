//! Pending quotes, confirmed orders and planning records.
//!
//! All three feed the workload projections: quotes as potential load
//! weighted by their win probability, confirmed orders and plannings as
//! confirmed load.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::project::{Order, OrderLine, OrderSection};

/// A quote awaiting the client's signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingQuote {
    /// Order reference number.
    pub reference: String,
    /// Day the quote was created.
    pub created_at: NaiveDate,
    /// Total amount of the quote.
    pub total_amount: Decimal,
    /// Sections of the quote; the projected days come from its service lines.
    #[serde(default)]
    pub sections: Vec<OrderSection>,
    /// Historical conversion rate of the client, in percent.
    #[serde(default)]
    pub client_conversion_rate: Option<Decimal>,
    /// Historical conversion rate of the salesperson, in percent.
    #[serde(default)]
    pub salesperson_conversion_rate: Option<Decimal>,
    /// Start date of the project the quote belongs to.
    #[serde(default)]
    pub project_start_date: Option<NaiveDate>,
    /// End date of the project the quote belongs to.
    #[serde(default)]
    pub project_end_date: Option<NaiveDate>,
}

impl PendingQuote {
    /// Iterates over every line of every section.
    pub fn lines(&self) -> impl Iterator<Item = &OrderLine> {
        self.sections.iter().flat_map(|section| section.lines.iter())
    }
}

/// A signed or won order, with the dates of its project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedOrder {
    /// The order.
    pub order: Order,
    /// Start date of the project the order belongs to.
    #[serde(default)]
    pub project_start_date: Option<NaiveDate>,
    /// End date of the project the order belongs to.
    #[serde(default)]
    pub project_end_date: Option<NaiveDate>,
}

/// Status of a planning record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanningStatus {
    /// Pencilled in.
    Planned,
    /// Confirmed with the contributor.
    Confirmed,
    /// Cancelled; carries no load.
    Cancelled,
}

impl PlanningStatus {
    /// Returns true for plannings that represent actual load.
    pub fn is_committed(self) -> bool {
        match self {
            PlanningStatus::Planned | PlanningStatus::Confirmed => true,
            PlanningStatus::Cancelled => false,
        }
    }
}

/// A contributor scheduled on a project over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanningRecord {
    /// The scheduled contributor.
    pub contributor_id: String,
    /// First scheduled day (inclusive).
    pub start_date: NaiveDate,
    /// Last scheduled day (inclusive).
    pub end_date: NaiveDate,
    /// Hours scheduled per working day.
    pub daily_hours: Decimal,
    /// Current status.
    pub status: PlanningStatus,
}
