//! Error types for access resolution operations
//!
//! This module defines the error taxonomy shared by the resource,
//! merge, and engine layers. Persistence failures are deliberately
//! not part of it: store writes report success as a boolean so that
//! repeated identical writes can no-op successfully.

use thiserror::Error;

/// Access resolution error types.
///
/// Validation errors are raised before any state mutation; read and
/// merge paths never fail and degrade to defaults instead.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Requested entity or resource instance does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input detected before any mutation
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation violates a domain invariant
    #[error("Conflict: {0}")]
    LogicConflict(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for access resolution operations.
pub type AccessResult<T> = Result<T, AccessError>;

impl AccessError {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AccessError::NotFound(_) => 404,
            AccessError::InvalidArgument(_) => 400,
            AccessError::LogicConflict(_) => 409,
            AccessError::ConfigError(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AccessError::NotFound(_) => "NOT_FOUND",
            AccessError::InvalidArgument(_) => "INVALID_ARGUMENT",
            AccessError::LogicConflict(_) => "CONFLICT",
            AccessError::ConfigError(_) => "CONFIG_ERROR",
        }
    }
}
