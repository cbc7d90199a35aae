//! Severity levels and calculation warnings.
//!
//! This module contains the [`Severity`] scale shared by drift analysis,
//! risk findings and workload alerts, and the [`CalculationWarning`] type
//! used to flag inconsistent input data without failing a calculation.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Graded severity used throughout the engine.
///
/// Variants are ordered from least to most severe, so severities can be
/// compared directly.
///
/// # Example
///
/// ```
/// use profitability_engine::models::Severity;
///
/// assert!(Severity::Critical > Severity::High);
/// assert_eq!(Severity::Medium.to_string(), "medium");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational; no action needed.
    Low,
    /// Worth monitoring.
    Medium,
    /// Needs attention soon.
    High,
    /// Needs immediate attention.
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A warning generated during calculation.
///
/// Warnings indicate inconsistent input data that the engine resolved
/// deterministically; they never prevent a result from being produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level.
    pub severity: Severity,
}

impl From<&EngineError> for CalculationWarning {
    fn from(error: &EngineError) -> Self {
        let code = match error {
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => "config",
            EngineError::InsufficientData { .. } => "insufficient_data",
            EngineError::InvalidArgument { .. } => "invalid_argument",
            EngineError::AnomalousState { .. } => "anomalous_state",
        };

        CalculationWarning {
            code: code.to_string(),
            message: error.to_string(),
            severity: Severity::Medium,
        }
    }
}
