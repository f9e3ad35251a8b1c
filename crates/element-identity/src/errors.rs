//! Error types for document access

use thiserror::Error;

/// Errors surfaced by a [`DocumentDriver`](crate::DocumentDriver).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Handle no longer refers to live content
    #[error("stale element: {0}")]
    StaleElement(String),

    /// Locator could not be evaluated
    #[error("query '{locator}' failed: {reason}")]
    Query { locator: String, reason: String },

    /// Driver-side deadline exceeded
    #[error("driver timeout: {0}")]
    Timeout(String),

    #[error("internal driver error: {0}")]
    Internal(String),
}

impl DriverError {
    pub fn is_stale(&self) -> bool {
        matches!(self, DriverError::StaleElement(_))
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, DriverError::Timeout(_))
    }

    pub fn query(locator: impl ToString, reason: impl Into<String>) -> Self {
        DriverError::Query {
            locator: locator.to_string(),
            reason: reason.into(),
        }
    }
}
