//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use kindred_core::{Conversation, ConversationId, MessageId, MessageRecord, OrderingKey, UserId};
use kindred_remote::MemoryRemote;
use kindred_sync::{ConversationListSync, MessageStreamSync, SyncConfig};

/// Display name registered for [`TestFixture::friend`].
pub const FRIEND_NAME: &str = "Alex";

/// A signed-in identity, one friend, and a shared conversation, all backed
/// by an in-memory remote.
pub struct TestFixture {
    pub me: UserId,
    pub friend: UserId,
    pub conversation: ConversationId,
    pub remote: Arc<MemoryRemote>,
    pub config: SyncConfig,
}

impl TestFixture {
    /// Create a fixture with `me`, friend `u9` ("Alex"), and conversation
    /// `c1` in both parties' lists.
    pub fn new() -> Self {
        let fixture = Self::empty();
        fixture.remote.add_profile(&fixture.friend, FRIEND_NAME);
        fixture.remote.add_conversation(
            &fixture.me,
            Conversation::new(fixture.conversation.clone(), FRIEND_NAME),
        );
        fixture.remote.add_conversation(
            &fixture.friend,
            Conversation::new(fixture.conversation.clone(), "Me"),
        );
        fixture
    }

    /// Same identities, nothing seeded.
    pub fn empty() -> Self {
        Self {
            me: UserId::new("me"),
            friend: UserId::new("u9"),
            conversation: ConversationId::new("c1"),
            remote: Arc::new(MemoryRemote::new()),
            config: SyncConfig::default(),
        }
    }

    /// Replace the sync config used by the `*_sync` helpers.
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// A record in the fixture conversation.
    pub fn record(&self, id: &str, sender: &UserId, text: &str, at: i64) -> MessageRecord {
        MessageRecord {
            id: MessageId::new(id),
            conversation_id: self.conversation.clone(),
            sender_id: sender.clone(),
            sender_name: None,
            text: text.to_string(),
            sent_at: OrderingKey::from_millis(at),
        }
    }

    /// A record from the friend.
    pub fn incoming(&self, id: &str, at: i64) -> MessageRecord {
        self.record(id, &self.friend, &format!("hello {}", id), at)
    }

    /// Store and publish a message from the friend.
    pub fn friend_says(&self, id: &str, at: i64) -> usize {
        self.remote.insert_message(self.incoming(id, at))
    }

    /// Activate a conversation list for `me`.
    pub async fn list_sync(&self) -> ConversationListSync<MemoryRemote> {
        ConversationListSync::start(Arc::clone(&self.remote), self.me.clone(), self.config.clone())
            .await
    }

    /// Activate the fixture conversation's stream for `me`.
    pub async fn stream_sync(&self) -> MessageStreamSync<MemoryRemote> {
        MessageStreamSync::start(
            Arc::clone(&self.remote),
            self.me.clone(),
            self.conversation.clone(),
            self.config.clone(),
        )
        .await
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Distinct user ids `user-0`, `user-1`, ...
pub fn users(count: usize) -> Vec<UserId> {
    (0..count).map(|i| UserId::new(format!("user-{}", i))).collect()
}
