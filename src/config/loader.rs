//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading engine
//! settings from YAML files.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};

use super::types::{
    AnalyticsConfig, CompanyConfig, CompanyCostSettings, EngineConfig, EstimationSettings,
    PipelineSettings, StaffingSettings,
};

/// Loads and provides access to engine configuration.
///
/// The `ConfigLoader` reads YAML configuration files from a directory and
/// exposes the typed settings each calculator expects.
///
/// # Directory Structure
///
/// ```text
/// config/default/
/// ├── company.yaml    # Cost coefficients, paid leave and RTT days
/// └── analytics.yaml  # Estimation, pipeline and staffing settings
/// ```
///
/// # Example
///
/// ```no_run
/// use profitability_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/default")?;
/// println!("Global coefficient: {}", loader.company().global_coefficient());
/// # Ok::<(), profitability_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: EngineConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration directory (e.g., "./config/default")
    ///
    /// # Returns
    ///
    /// Returns a `ConfigLoader` instance on success, or an error if:
    /// - `company.yaml` or `analytics.yaml` is missing
    /// - Either file contains invalid YAML
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let path = path.as_ref();

        let company = Self::load_yaml::<CompanyConfig>(&path.join("company.yaml"))?;
        let analytics = Self::load_yaml::<AnalyticsConfig>(&path.join("analytics.yaml"))?;

        let config = EngineConfig::new(
            company.cost,
            analytics.estimation,
            analytics.pipeline,
            analytics.staffing,
        );

        Ok(Self { config })
    }

    /// Wraps an in-memory configuration.
    pub fn from_config(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Loads and parses a YAML file.
    fn load_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> EngineResult<T> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Returns the underlying engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the company cost settings.
    pub fn company(&self) -> &CompanyCostSettings {
        self.config.company()
    }

    /// Returns the simplified cost model settings.
    pub fn estimation(&self) -> &EstimationSettings {
        self.config.estimation()
    }

    /// Returns the pipeline predictor settings.
    pub fn pipeline(&self) -> &PipelineSettings {
        self.config.pipeline()
    }

    /// Returns the staffing aggregator settings.
    pub fn staffing(&self) -> &StaffingSettings {
        self.config.staffing()
    }
}
