//! Error types shared across the ScmLink crates.

use thiserror::Error;

/// Unified error type for ScmLink operations
#[derive(Debug, Error)]
pub enum ScmLinkError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    /// Non-success HTTP response from an Oracle endpoint. Carries the status
    /// code and response body for diagnostics.
    #[error("HTTP {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("Authentication error: {0}")]
    Auth(String),

    /// Interactive authorization did not produce a code within the window.
    #[error("authorization timed out after {0} seconds")]
    AuthTimeout(u64),

    #[error("Security error: {0}")]
    Security(String),

    /// A structurally valid HTTP response was missing an expected element
    /// (file ID, data chunk, offset). Distinct from transport failures.
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Platform error: {0}")]
    Platform(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for ScmLink operations
pub type Result<T> = std::result::Result<T, ScmLinkError>;
