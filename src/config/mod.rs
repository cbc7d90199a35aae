//! Configuration loading and management for the profitability engine.
//!
//! This module provides the typed settings every calculator receives
//! (company cost coefficients, the simplified estimation cost model,
//! pipeline capacity and staffing batch settings) and a loader that reads
//! them from YAML files.
//!
//! # Example
//!
//! ```no_run
//! use profitability_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/default").unwrap();
//! println!("Paid leave days: {}", config.company().annual_paid_leave_days);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{
    AnalyticsConfig, CompanyConfig, CompanyCostSettings, EngineConfig, EstimationSettings,
    PipelineSettings, StaffingSettings,
};
