//! Error types for policy parsing and translation

use thiserror::Error;

/// Policy error types.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Statement uses an action no builder is registered for
    #[error("Unknown policy action: {0}")]
    UnknownAction(String),

    /// Statement resource pattern cannot be parsed
    #[error("Invalid resource pattern: {0}")]
    InvalidResource(String),

    /// A builder is already registered for this action
    #[error("Action already registered: {0}")]
    DuplicateAction(String),

    /// Statement JSON is malformed
    #[error("Malformed statement: {0}")]
    Malformed(String),
}

/// Result type for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

impl PolicyError {
    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            PolicyError::UnknownAction(_) => "UNKNOWN_ACTION",
            PolicyError::InvalidResource(_) => "INVALID_RESOURCE",
            PolicyError::DuplicateAction(_) => "DUPLICATE_ACTION",
            PolicyError::Malformed(_) => "MALFORMED_STATEMENT",
        }
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            PolicyError::DuplicateAction(_) => 409,
            _ => 400,
        }
    }
}
