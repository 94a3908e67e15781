//! Error types for authguard.

use thiserror::Error;

/// Main error type for authguard operations.
///
/// Rate limit decisions and IP resolution never fail; these variants cover
/// configuration loading and the internals of audit logging.
#[derive(Error, Debug)]
pub enum AuthGuardError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Audit record serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for authguard operations.
pub type Result<T> = std::result::Result<T, AuthGuardError>;
