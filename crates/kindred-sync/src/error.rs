//! Error types for the sync module.

use kindred_remote::RemoteError;
use thiserror::Error;

/// Errors that can occur during sync operations.
///
/// Name-resolution failures never appear here; they degrade to a
/// placeholder label.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// A bulk query failed. The previous list is kept.
    #[error("load failed: {0}")]
    Load(#[source] RemoteError),

    /// The outbound write failed. Nothing was appended.
    #[error("send failed: {0}")]
    Send(#[source] RemoteError),

    /// The change-event channel could not be opened.
    #[error("subscribe failed: {0}")]
    Subscribe(#[source] RemoteError),

    /// Empty or whitespace-only message text.
    #[error("message is empty")]
    EmptyMessage,

    /// The synchronizer was torn down.
    #[error("synchronizer is shut down")]
    ShutDown,
}

impl SyncError {
    /// The human-readable message placed in a synchronizer's `error` field.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Load(_) => "Couldn't refresh. Pull down to try again.".into(),
            SyncError::Send(_) => "Message not sent. Tap to try again.".into(),
            SyncError::Subscribe(_) => "Live updates are unavailable right now.".into(),
            SyncError::EmptyMessage => "Type a message first.".into(),
            SyncError::ShutDown => "This chat is no longer open.".into(),
        }
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
