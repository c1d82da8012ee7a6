//! Error types for the kicker core
//!
//! This module defines all error types using anyhow for consistent error handling
//! throughout the application. Callers that need to branch on the kind of failure
//! downcast to [`KickerError`] (see [`KickerError::of`]).

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for match lifecycle and rating scenarios
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KickerError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Invariant violated: {reason}")]
    InvariantViolation { reason: String },

    #[error("Required argument missing: {name}")]
    MissingArgument { name: &'static str },

    #[error("Concurrent modification of {entity} {id}, retry the operation")]
    Conflict { entity: &'static str, id: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl KickerError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Find the kicker error behind an `anyhow::Error`, if there is one
    pub fn of(error: &anyhow::Error) -> Option<&KickerError> {
        error.downcast_ref::<KickerError>()
    }

    /// Whether the caller may retry the same request unchanged
    pub fn is_retryable(&self) -> bool {
        matches!(self, KickerError::Conflict { .. })
    }
}
