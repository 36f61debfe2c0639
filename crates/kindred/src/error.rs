//! Error types for sessions.

use kindred_remote::RemoteError;
use kindred_sync::SyncError;
use thiserror::Error;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Sync error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Remote store error.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Configuration could not be parsed.
    #[error("invalid config: {0}")]
    Config(#[from] serde_json::Error),

    /// The session was shut down.
    #[error("session is shut down")]
    ShutDown,
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
