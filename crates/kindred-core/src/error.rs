//! Error types for Kindred Core.

use thiserror::Error;

/// Errors raised while handling core data.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("empty change payload")]
    EmptyPayload,

    #[error("decoding error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
