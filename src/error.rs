//! Error types for the profitability engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for all error conditions that can occur while computing profitability,
//! forecasting and staffing metrics.

use thiserror::Error;

/// The main error type for the profitability engine.
///
/// Only a handful of situations are genuine errors: configuration problems,
/// a revenue history that is too short to forecast from, and invalid
/// arguments. Partial data (a project at 10% progress, a contributor with no
/// employment period) is a normal state and is reported through structured
/// results instead.
///
/// # Example
///
/// ```
/// use profitability_engine::error::EngineError;
///
/// let error = EngineError::InsufficientData {
///     required: 6,
///     actual: 4,
/// };
/// assert_eq!(
///     error.to_string(),
///     "Insufficient historical data: 6 months required, 4 supplied"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// Not enough history was supplied to run a forecast.
    #[error("Insufficient historical data: {required} months required, {actual} supplied")]
    InsufficientData {
        /// The minimum number of months needed.
        required: usize,
        /// The number of months actually supplied.
        actual: usize,
    },

    /// An argument was outside the accepted domain.
    #[error("Invalid argument '{argument}': {message}")]
    InvalidArgument {
        /// The name of the offending argument.
        argument: String,
        /// A description of what made the argument invalid.
        message: String,
    },

    /// Source data violates an invariant that is normally enforced upstream.
    ///
    /// This variant is carried as a value in batch reports and warnings; the
    /// engine resolves the situation deterministically instead of failing.
    #[error("Anomalous state for contributor '{contributor_id}': {message}")]
    AnomalousState {
        /// The contributor whose records are inconsistent.
        contributor_id: String,
        /// A description of the anomaly.
        message: String,
    },
}

impl EngineError {
    /// Builds an [`EngineError::InvalidArgument`] from any displayable parts.
    pub fn invalid_argument(argument: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::InvalidArgument {
            argument: argument.into(),
            message: message.into(),
        }
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
