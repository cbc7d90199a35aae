//! Configuration types for the profitability engine.
//!
//! This module contains the strongly-typed settings structures that are
//! deserialized from YAML configuration files. Every calculation receives
//! the settings it needs as an explicit argument; nothing here is global.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Company-wide cost coefficients and leave allowances.
///
/// Supplied once per company and immutable for the duration of a
/// calculation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanyCostSettings {
    /// Overhead coefficient applied on top of salaries (e.g. 1.35).
    pub structure_cost_coefficient: Decimal,
    /// Employer social charges coefficient (e.g. 1.45).
    pub employer_charges_coefficient: Decimal,
    /// Paid leave days granted per year.
    pub annual_paid_leave_days: u32,
    /// Reduced-working-time (RTT) days granted per year.
    pub annual_rtt_days: u32,
}

impl CompanyCostSettings {
    /// Returns the global charge coefficient, the product of the structure
    /// and employer charges coefficients rounded to 4 decimals.
    ///
    /// # Example
    ///
    /// ```
    /// use profitability_engine::config::CompanyCostSettings;
    /// use rust_decimal::Decimal;
    /// use std::str::FromStr;
    ///
    /// let settings = CompanyCostSettings::default();
    /// assert_eq!(settings.global_coefficient(), Decimal::from_str("1.9575").unwrap());
    /// ```
    pub fn global_coefficient(&self) -> Decimal {
        (self.structure_cost_coefficient * self.employer_charges_coefficient)
            .round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl Default for CompanyCostSettings {
    fn default() -> Self {
        Self {
            structure_cost_coefficient: dec!(1.35),
            employer_charges_coefficient: dec!(1.45),
            annual_paid_leave_days: 25,
            annual_rtt_days: 10,
        }
    }
}

/// Settings for the simplified cost model used by the predictor and the
/// risk analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimationSettings {
    /// Flat daily cost used to turn hours into an estimated cost.
    ///
    /// This is deliberately distinct from the per-contributor daily cost
    /// used by the profitability calculator.
    pub assumed_daily_cost: Decimal,
}

impl Default for EstimationSettings {
    fn default() -> Self {
        Self {
            assumed_daily_cost: dec!(400),
        }
    }
}

/// Settings for the pipeline and workload predictor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Capacity contributed by each active contributor, in days per month.
    pub days_per_contributor_per_month: Decimal,
    /// Floor applied to the team capacity, in days per month.
    pub minimum_team_capacity: Decimal,
    /// Quotes must exceed this win probability (percent) to load the team.
    pub probability_threshold: Decimal,
    /// Maximum number of months a quote's days are spread across.
    pub spread_months: u32,
    /// Duration assumed for projects without an end date.
    pub default_project_duration_days: i64,
}

impl PipelineSettings {
    /// Returns the monthly team capacity for the given number of active
    /// contributors.
    pub fn team_capacity(&self, active_contributors: usize) -> Decimal {
        let capacity =
            Decimal::from(active_contributors as u64) * self.days_per_contributor_per_month;
        capacity.max(self.minimum_team_capacity)
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            days_per_contributor_per_month: dec!(20),
            minimum_team_capacity: dec!(20),
            probability_threshold: dec!(30),
            spread_months: 3,
            default_project_duration_days: 90,
        }
    }
}

/// Settings for the staffing capacity aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StaffingSettings {
    /// Number of fact rows handed to the sink per flush.
    pub batch_size: usize,
}

impl Default for StaffingSettings {
    fn default() -> Self {
        Self { batch_size: 50 }
    }
}

/// Company settings file structure (`company.yaml`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyConfig {
    /// Company cost coefficients and leave allowances.
    #[serde(default)]
    pub cost: CompanyCostSettings,
}

/// Analytics settings file structure (`analytics.yaml`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsConfig {
    /// Simplified cost model settings.
    #[serde(default)]
    pub estimation: EstimationSettings,
    /// Pipeline predictor settings.
    #[serde(default)]
    pub pipeline: PipelineSettings,
    /// Staffing aggregator settings.
    #[serde(default)]
    pub staffing: StaffingSettings,
}

/// The complete engine configuration.
///
/// Aggregates the settings loaded from the YAML files of a configuration
/// directory. `Default` yields the values shipped in `config/default`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    company: CompanyCostSettings,
    estimation: EstimationSettings,
    pipeline: PipelineSettings,
    staffing: StaffingSettings,
}

impl EngineConfig {
    /// Creates a new EngineConfig from its component parts.
    pub fn new(
        company: CompanyCostSettings,
        estimation: EstimationSettings,
        pipeline: PipelineSettings,
        staffing: StaffingSettings,
    ) -> Self {
        Self {
            company,
            estimation,
            pipeline,
            staffing,
        }
    }

    /// Returns the company cost settings.
    pub fn company(&self) -> &CompanyCostSettings {
        &self.company
    }

    /// Returns the simplified cost model settings.
    pub fn estimation(&self) -> &EstimationSettings {
        &self.estimation
    }

    /// Returns the pipeline predictor settings.
    pub fn pipeline(&self) -> &PipelineSettings {
        &self.pipeline
    }

    /// Returns the staffing aggregator settings.
    pub fn staffing(&self) -> &StaffingSettings {
        &self.staffing
    }
}
