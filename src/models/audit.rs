//! Audit trail types.
//!
//! Calculations that derive a figure in several stages (the daily cost and
//! project profitability) record each stage as an [`AuditStep`] so the
//! final number can be traced back to its inputs.

use serde::{Deserialize, Serialize};

/// A single step in the audit trail of a calculation.
///
/// # Example
///
/// ```
/// use profitability_engine::models::AuditStep;
///
/// let step = AuditStep {
///     step_number: 1,
///     rule_id: "annual_salary".to_string(),
///     rule_name: "Annual Salary".to_string(),
///     input: serde_json::json!({"monthly_salary": "3000"}),
///     output: serde_json::json!({"annual_salary": "36000"}),
///     reasoning: "3000 x 12 months = 36000".to_string(),
/// };
/// assert_eq!(step.rule_id, "annual_salary");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// Order of the step within its calculation, starting at 1.
    pub step_number: u32,
    /// Machine-readable identifier of the rule applied.
    pub rule_id: String,
    /// Human-readable name of the rule applied.
    pub rule_name: String,
    /// Inputs consumed by the step.
    pub input: serde_json::Value,
    /// Outputs produced by the step.
    pub output: serde_json::Value,
    /// Explanation of how the output was obtained.
    pub reasoning: String,
}

/// Accumulates audit steps, numbering them in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditTrace {
    /// Recorded steps.
    pub steps: Vec<AuditStep>,
}

impl AuditTrace {
    /// Appends a step and returns its number.
    pub fn record(
        &mut self,
        rule_id: &str,
        rule_name: &str,
        input: serde_json::Value,
        output: serde_json::Value,
        reasoning: String,
    ) -> u32 {
        let step_number = self.steps.len() as u32 + 1;
        self.steps.push(AuditStep {
            step_number,
            rule_id: rule_id.to_string(),
            rule_name: rule_name.to_string(),
            input,
            output,
            reasoning,
        });
        step_number
    }

    /// Finds the first step recorded for a rule.
    pub fn step(&self, rule_id: &str) -> Option<&AuditStep> {
        self.steps.iter().find(|step| step.rule_id == rule_id)
    }
}
