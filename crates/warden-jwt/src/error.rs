//! Error types for token operations
//!
//! Validation deliberately exposes a single opaque invalid-token
//! error: expired, not-yet-valid, bad signature and malformed tokens
//! are indistinguishable to callers so the error channel cannot be
//! used as an oracle. The distinguishing detail is emitted to the
//! structured log instead.

use thiserror::Error;

/// Token error types.
#[derive(Debug, Error)]
pub enum JwtError {
    /// Token failed validation (any reason)
    #[error("Invalid token")]
    InvalidToken,

    /// Malformed input to an issuance or conversion call
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Signature or token encoding failed
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Key material or algorithm configuration problem
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for token operations.
pub type JwtResult<T> = Result<T, JwtError>;

impl JwtError {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            JwtError::InvalidToken => 401,
            JwtError::InvalidArgument(_) => 400,
            JwtError::Encoding(_) | JwtError::ConfigError(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            JwtError::InvalidToken => "INVALID_TOKEN",
            JwtError::InvalidArgument(_) => "INVALID_ARGUMENT",
            JwtError::Encoding(_) => "ENCODING_ERROR",
            JwtError::ConfigError(_) => "CONFIG_ERROR",
        }
    }
}
