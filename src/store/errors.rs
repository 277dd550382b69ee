//! # Store Errors
//!
//! Backend failures surfaced verbatim to the caller.

use thiserror::Error;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Subscription could not be opened
    #[error("Subscription to '{path}' failed: {reason}")]
    SubscriptionFailed { path: String, reason: String },

    /// Handle does not name an open subscription
    #[error("Subscription not found: {0}")]
    SubscriptionNotFound(String),

    /// Backend refused a write
    #[error("Write to '{path}' rejected: {reason}")]
    WriteRejected { path: String, reason: String },

    /// Path cannot be used for this operation
    #[error("Invalid path: '{0}'")]
    InvalidPath(String),
}

impl StoreError {
    pub(crate) fn rejected(path: &str, reason: impl Into<String>) -> Self {
        StoreError::WriteRejected {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
