//! # Planner Errors
//!
//! Runtime evaluation failures raised while planning a mutation. A failure
//! discards the partial plan.

use thiserror::Error;

/// Result type for planner operations
pub type PlanResult<T> = Result<T, PlanError>;

/// Planner errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    /// Equation names a field the record does not have
    #[error("Equation '{equation}' references missing field '{field}'")]
    MissingField { field: String, equation: String },

    /// Equation text does not follow the arithmetic grammar
    #[error("Malformed equation '{equation}': {reason}")]
    InvalidEquation { equation: String, reason: String },

    /// `-`, `*` or `/` applied to text
    #[error("Equation '{equation}' applies '{operator}' to a non-numeric operand")]
    NonNumericOperand { equation: String, operator: char },

    /// Division by zero or overflow
    #[error("Equation '{0}' does not produce a finite number")]
    NonFinite(String),
}

impl PlanError {
    pub(crate) fn invalid(equation: &str, reason: impl Into<String>) -> Self {
        PlanError::InvalidEquation {
            equation: equation.to_string(),
            reason: reason.into(),
        }
    }
}
