//! # Executor Errors
//!
//! Unified failure taxonomy for one `execute` call:
//!
//! - Parse: malformed statement, raised before any fetch
//! - RuntimeEvaluation: bad equation or LIKE pattern; the partial plan is
//!   discarded
//! - Backend: subscription or write failure, surfaced verbatim
//! - Cancelled: superseded by a newer query; produces no result

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::parser::ParseError;
use crate::planner::PlanError;
use crate::store::StoreError;

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;

/// Error category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Parse,
    RuntimeEvaluation,
    Backend,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Parse => "PARSE",
            ErrorKind::RuntimeEvaluation => "RUNTIME_EVALUATION",
            ErrorKind::Backend => "BACKEND",
            ErrorKind::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Executor errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// LIKE pattern does not compile
    #[error("Invalid like pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Subquery produced no delivery in time
    #[error("Subquery on '{path}' produced no result within {timeout_ms} ms")]
    SubqueryTimeout { path: String, timeout_ms: u64 },

    /// Store closed the subscription before its first delivery
    #[error("Subscription on '{0}' ended before delivering")]
    SubscriptionEnded(String),

    /// No async runtime to drive the execution
    #[error("No tokio runtime available to run the query")]
    NoRuntime,

    /// Superseded by a newer query
    #[error("Query superseded by a newer execution")]
    Cancelled,
}

impl ExecutorError {
    /// Returns the error category
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExecutorError::Parse(_) => ErrorKind::Parse,
            ExecutorError::Plan(_) | ExecutorError::InvalidPattern { .. } => {
                ErrorKind::RuntimeEvaluation
            }
            ExecutorError::Store(_)
            | ExecutorError::SubqueryTimeout { .. }
            | ExecutorError::SubscriptionEnded(_)
            | ExecutorError::NoRuntime => ErrorKind::Backend,
            ExecutorError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorError::Parse(err) => err.code().code(),
            ExecutorError::Plan(_) => "EVAL_EQUATION_FAILED",
            ExecutorError::InvalidPattern { .. } => "EVAL_INVALID_PATTERN",
            ExecutorError::Store(StoreError::WriteRejected { .. }) => "BACKEND_WRITE_REJECTED",
            ExecutorError::Store(_) | ExecutorError::SubscriptionEnded(_) => {
                "BACKEND_SUBSCRIPTION_FAILED"
            }
            ExecutorError::SubqueryTimeout { .. } => "BACKEND_TIMEOUT",
            ExecutorError::NoRuntime => "BACKEND_NO_RUNTIME",
            ExecutorError::Cancelled => "CANCELLED",
        }
    }

    /// Returns true if the execution was superseded
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecutorError::Cancelled)
    }
}

/// Error as carried on a result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultError {
    pub kind: ErrorKind,
    pub code: String,
    pub message: String,
}

impl From<&ExecutorError> for ResultError {
    fn from(err: &ExecutorError) -> Self {
        Self {
            kind: err.kind(),
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let parse: ExecutorError = ParseError::unrecognized_comparator("a ~ b").into();
        assert_eq!(parse.kind(), ErrorKind::Parse);
        assert_eq!(parse.code(), "QUERY_INVALID_COMPARATOR");

        let plan: ExecutorError = PlanError::NonFinite("a / 0".into()).into();
        assert_eq!(plan.kind(), ErrorKind::RuntimeEvaluation);

        let store: ExecutorError = StoreError::rejected("users", "read-only").into();
        assert_eq!(store.kind(), ErrorKind::Backend);
        assert_eq!(store.code(), "BACKEND_WRITE_REJECTED");

        assert!(ExecutorError::Cancelled.is_cancelled());
        assert_eq!(ExecutorError::NoRuntime.kind(), ErrorKind::Backend);
    }

    #[test]
    fn test_result_error_serialization() {
        let err = ExecutorError::InvalidPattern {
            pattern: "(".into(),
            reason: "unclosed group".into(),
        };
        let json = serde_json::to_value(ResultError::from(&err)).unwrap();
        assert_eq!(json["kind"], "RUNTIME_EVALUATION");
        assert_eq!(json["code"], "EVAL_INVALID_PATTERN");
    }
}
