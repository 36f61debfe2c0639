//! Error types for the remote module.

use thiserror::Error;

use crate::traits::Operation;

/// Errors reported by the remote store.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    /// The request never got an answer.
    #[error("transport error: {0}")]
    Transport(String),

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store refused the write.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The change-event channel is gone.
    #[error("subscription closed")]
    SubscriptionClosed,

    /// A payload from the store could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Failure injected by a test backend.
    #[error("injected failure in {0}")]
    Injected(Operation),
}

impl From<kindred_core::CoreError> for RemoteError {
    fn from(e: kindred_core::CoreError) -> Self {
        RemoteError::Decode(e.to_string())
    }
}

/// Result type for remote operations.
pub type Result<T> = std::result::Result<T, RemoteError>;
