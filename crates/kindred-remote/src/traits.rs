//! Remote trait: the abstract interface to the remote data store.
//!
//! The synchronizers consume this contract and never define it. Every call
//! may fail with a transport error; retry policy belongs to the
//! implementation, not to the callers.

use std::fmt;

use async_trait::async_trait;
use kindred_core::{ChangeEvent, Conversation, ConversationId, MessageRecord, Scope, UserId};
use tokio::sync::mpsc;

use crate::error::Result;

/// Identifier of one open subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// An open live channel to a scoped change-event stream.
///
/// Events are pushed into an unbounded channel so delivery never blocks the
/// store. Dropping the receiver does not release the channel on the store
/// side; call [`Remote::unsubscribe`] for that.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub scope: Scope,
    pub events: mpsc::UnboundedReceiver<ChangeEvent>,
}

/// Remote operations, used for call accounting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    LoadConversations,
    LoadMessages,
    MarkRead,
    SendMessage,
    ResolveDisplayName,
    Subscribe,
    Unsubscribe,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::LoadConversations => "load_conversations",
            Operation::LoadMessages => "load_messages",
            Operation::MarkRead => "mark_read",
            Operation::SendMessage => "send_message",
            Operation::ResolveDisplayName => "resolve_display_name",
            Operation::Subscribe => "subscribe",
            Operation::Unsubscribe => "unsubscribe",
        };
        f.write_str(name)
    }
}

/// The Remote trait: async interface to the remote data store.
///
/// # Design Notes
///
/// - **Bulk queries** return whole lists; callers replace their state wholesale.
/// - **`mark_read`** is fire-and-forget from the caller's point of view.
/// - **`resolve_display_name`** returns `Ok(None)` for unknown users.
/// - **`unsubscribe`** is synchronous so it can run from `Drop`, and must be
///   a no-op for ids that are already released.
#[async_trait]
pub trait Remote: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────
    // Bulk Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Conversations visible to `identity`.
    async fn load_conversations(&self, identity: &UserId) -> Result<Vec<Conversation>>;

    /// All messages of a conversation, in any order.
    async fn load_messages(
        &self,
        conversation: &ConversationId,
        identity: &UserId,
    ) -> Result<Vec<MessageRecord>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Mark every message of a conversation as read for `identity`.
    async fn mark_read(&self, conversation: &ConversationId, identity: &UserId) -> Result<()>;

    /// Write a new message and return the stored record.
    async fn send_message(
        &self,
        conversation: &ConversationId,
        identity: &UserId,
        text: &str,
    ) -> Result<MessageRecord>;

    // ─────────────────────────────────────────────────────────────────────────
    // Single-record Lookups
    // ─────────────────────────────────────────────────────────────────────────

    /// Display name of a user, if the user exists.
    async fn resolve_display_name(&self, user: &UserId) -> Result<Option<String>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Change Feed
    // ─────────────────────────────────────────────────────────────────────────

    /// Open a live channel for `scope`.
    async fn subscribe(&self, scope: Scope) -> Result<Subscription>;

    /// Release a channel. Returns true if it was still open.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
