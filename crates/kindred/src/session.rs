//! The Session: per-identity wiring of the synchronizers.
//!
//! A session owns the conversation list of the signed-in identity and hands
//! out one message stream per opened conversation. Switching identity tears
//! the old list down before the new one subscribes, so at most one list
//! subscription is ever open per session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use kindred_core::{ConversationId, UserId};
use kindred_remote::Remote;
use kindred_sync::{ConversationListSync, MessageStreamSync, SyncConfig};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// Configuration for a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Synchronizer configuration, shared by the list and every stream.
    pub sync: SyncConfig,
}

impl SessionConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A signed-in identity's live view of the remote store.
pub struct Session<R: Remote> {
    remote: Arc<R>,
    config: SessionConfig,
    identity: UserId,
    list: ConversationListSync<R>,
    closed: AtomicBool,
}

impl<R: Remote> Session<R> {
    /// Start a session for `identity`, activating its conversation list.
    pub async fn start(remote: Arc<R>, identity: UserId, config: SessionConfig) -> Self {
        tracing::info!(identity = %identity, "session started");
        let list =
            ConversationListSync::start(Arc::clone(&remote), identity.clone(), config.sync.clone())
                .await;
        Self {
            remote,
            config,
            identity,
            list,
            closed: AtomicBool::new(false),
        }
    }

    /// The signed-in identity.
    pub fn identity(&self) -> &UserId {
        &self.identity
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get the remote reference.
    pub fn remote(&self) -> &Arc<R> {
        &self.remote
    }

    /// The conversation list of the signed-in identity.
    pub fn conversations(&self) -> &ConversationListSync<R> {
        &self.list
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Open a conversation.
    ///
    /// Every call creates an independent stream with its own subscription and
    /// name cache. The caller owns it; dropping it releases the subscription.
    pub async fn open_conversation(
        &self,
        conversation: impl Into<ConversationId>,
    ) -> Result<MessageStreamSync<R>> {
        if self.is_shut_down() {
            return Err(SessionError::ShutDown);
        }
        let conversation = conversation.into();
        tracing::debug!(identity = %self.identity, conversation = %conversation, "opening conversation");
        Ok(MessageStreamSync::start(
            Arc::clone(&self.remote),
            self.identity.clone(),
            conversation,
            self.config.sync.clone(),
        )
        .await)
    }

    /// Sign in as `identity` instead.
    ///
    /// The current list is shut down, releasing its subscription, before the
    /// new identity's list is activated. Streams opened earlier are untouched.
    pub async fn switch_identity(&mut self, identity: UserId) -> Result<()> {
        if self.is_shut_down() {
            return Err(SessionError::ShutDown);
        }
        tracing::info!(from = %self.identity, to = %identity, "switching identity");

        self.list.shutdown();
        self.list = ConversationListSync::start(
            Arc::clone(&self.remote),
            identity.clone(),
            self.config.sync.clone(),
        )
        .await;
        self.identity = identity;
        Ok(())
    }

    /// Stop the conversation list. Idempotent.
    pub fn shutdown(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::info!(identity = %self.identity, "session shut down");
        }
        self.list.shutdown();
    }
}

impl<R: Remote> Drop for Session<R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use kindred_core::Conversation;
    use kindred_remote::{MemoryRemote, Operation};

    #[test]
    fn test_config_from_json() {
        let config = SessionConfig::from_json(
            r#"{"sync": {"debounce_window_ms": 200, "resolve_names": false}}"#,
        )
        .unwrap();
        assert_eq!(config.sync.debounce_window, Duration::from_millis(200));
        assert!(!config.sync.resolve_names);
        assert!(config.sync.mark_read_on_load);

        assert_eq!(SessionConfig::from_json("{}").unwrap(), SessionConfig::default());
        assert!(matches!(
            SessionConfig::from_json("not json"),
            Err(SessionError::Config(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_after_shutdown_fails() {
        let remote = Arc::new(MemoryRemote::new());
        let session = Session::start(remote, UserId::new("me"), SessionConfig::default()).await;

        session.shutdown();
        session.shutdown();
        assert!(matches!(
            session.open_conversation("c1").await,
            Err(SessionError::ShutDown)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_identity_replaces_list() {
        let remote = Arc::new(MemoryRemote::new());
        remote.add_conversation(&UserId::new("a"), Conversation::new("c1", "Bo"));
        remote.add_conversation(&UserId::new("b"), Conversation::new("c2", "Ann"));

        let mut session =
            Session::start(Arc::clone(&remote), UserId::new("a"), SessionConfig::default()).await;
        assert_eq!(session.conversations().conversations()[0].id.as_str(), "c1");

        session.switch_identity(UserId::new("b")).await.unwrap();
        assert_eq!(session.identity().as_str(), "b");
        assert_eq!(session.conversations().conversations()[0].id.as_str(), "c2");
        assert_eq!(remote.open_subscriptions(), 1);
        assert_eq!(remote.calls(Operation::Unsubscribe), 1);
    }
}
