//! Profitability, forecasting and capacity analytics engine
//!
//! This crate derives contributor daily costs from salaries and company
//! coefficients, computes project profitability from orders and timesheets,
//! predicts final margins, scores project risk, forecasts revenue, projects
//! pipeline workload and aggregates staffing capacity facts.

#![warn(missing_docs)]

pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
