//! In-memory implementation of the Remote trait.
//!
//! This is primarily for testing and demos. It behaves like a realtime-enabled
//! store: writes are published to every open subscription whose scope matches,
//! including the writer's own subscriptions. It also supports failure
//! injection, artificial latency, and per-operation call counts.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use kindred_core::{
    ChangeEvent, Conversation, ConversationId, MessageId, MessageRecord, OrderingKey, Scope,
    UserId,
};

use crate::error::{RemoteError, Result};
use crate::traits::{Operation, Remote, Subscription, SubscriptionId};

/// In-memory remote store.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryRemote {
    inner: RwLock<MemoryRemoteInner>,
}

#[derive(Default)]
struct MemoryRemoteInner {
    /// Conversation summaries per identity.
    conversations: HashMap<UserId, Vec<Conversation>>,

    /// Message records per conversation, in write order.
    messages: HashMap<ConversationId, Vec<MessageRecord>>,

    /// Profile directory: user -> display name.
    profiles: HashMap<UserId, String>,

    /// Open change-feed channels.
    subscribers: HashMap<SubscriptionId, (Scope, mpsc::UnboundedSender<ChangeEvent>)>,

    next_subscription: u64,
    next_message: u64,

    /// Whether a write is published back to the writer's subscriptions too.
    echo_writes: bool,

    /// `mark_read` calls, in order.
    read_marks: Vec<(ConversationId, UserId)>,

    failing: HashSet<Operation>,
    latency: HashMap<Operation, Duration>,
    calls: HashMap<Operation, usize>,
}

impl MemoryRemote {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryRemoteInner {
                echo_writes: true,
                ..MemoryRemoteInner::default()
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, MemoryRemoteInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MemoryRemoteInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call, wait out any configured latency, then apply injected failure.
    async fn enter(&self, op: Operation) -> Result<()> {
        let (delay, failing) = {
            let mut inner = self.write();
            *inner.calls.entry(op).or_default() += 1;
            (inner.latency.get(&op).copied(), inner.failing.contains(&op))
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if failing {
            return Err(RemoteError::Injected(op));
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Seeding
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the conversation list of `identity`.
    pub fn set_conversations(&self, identity: &UserId, conversations: Vec<Conversation>) {
        self.write()
            .conversations
            .insert(identity.clone(), conversations);
    }

    /// Add one conversation to the list of `identity`.
    pub fn add_conversation(&self, identity: &UserId, conversation: Conversation) {
        self.write()
            .conversations
            .entry(identity.clone())
            .or_default()
            .push(conversation);
    }

    /// Register a user's display name.
    pub fn add_profile(&self, user: &UserId, name: impl Into<String>) {
        self.write().profiles.insert(user.clone(), name.into());
    }

    /// Store a record without publishing it.
    pub fn seed_message(&self, record: MessageRecord) {
        self.write()
            .messages
            .entry(record.conversation_id.clone())
            .or_default()
            .push(record);
    }

    /// Control whether writes are published to the writer's own subscriptions.
    pub fn set_echo_writes(&self, echo: bool) {
        self.write().echo_writes = echo;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Simulating Other Parties
    // ─────────────────────────────────────────────────────────────────────────

    /// Store a record written by another party and publish its insert event.
    ///
    /// Returns the number of subscriptions the event was delivered to.
    pub fn insert_message(&self, record: MessageRecord) -> usize {
        let mut inner = self.write();
        inner
            .messages
            .entry(record.conversation_id.clone())
            .or_default()
            .push(record.clone());
        Self::bump_summaries(&mut inner, &record);
        Self::publish_locked(&mut inner, ChangeEvent::insert(record))
    }

    /// Publish an event without touching stored data.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        Self::publish_locked(&mut self.write(), event)
    }

    /// Decode a realtime JSON payload and publish it.
    pub fn publish_json(&self, payload: &str) -> Result<usize> {
        let event = ChangeEvent::from_json(payload)?;
        Ok(self.publish(event))
    }

    /// Drop every open channel, as if the realtime connection went away.
    pub fn close_subscriptions(&self) {
        self.write().subscribers.clear();
    }

    fn publish_locked(inner: &mut MemoryRemoteInner, event: ChangeEvent) -> usize {
        let mut delivered = 0;
        inner.subscribers.retain(|id, (scope, sender)| {
            if !event.matches(scope) {
                return true;
            }
            if sender.send(event.clone()).is_err() {
                tracing::debug!(subscription = %id, "dropping subscriber with closed receiver");
                return false;
            }
            delivered += 1;
            true
        });
        delivered
    }

    fn bump_summaries(inner: &mut MemoryRemoteInner, record: &MessageRecord) {
        for (owner, list) in inner.conversations.iter_mut() {
            for conversation in list
                .iter_mut()
                .filter(|c| c.id == record.conversation_id)
            {
                *conversation = conversation
                    .clone()
                    .with_last_message(record.text.clone(), format_time(record.sent_at));
                if owner != &record.sender_id {
                    conversation.unread_count += 1;
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Test Controls
    // ─────────────────────────────────────────────────────────────────────────

    /// Make `op` fail (or stop failing).
    pub fn set_failing(&self, op: Operation, failing: bool) {
        let mut inner = self.write();
        if failing {
            inner.failing.insert(op);
        } else {
            inner.failing.remove(&op);
        }
    }

    /// Delay every call to `op` by `delay`.
    pub fn set_latency(&self, op: Operation, delay: Duration) {
        self.write().latency.insert(op, delay);
    }

    /// Number of calls made to `op`.
    pub fn calls(&self, op: Operation) -> usize {
        self.read().calls.get(&op).copied().unwrap_or_default()
    }

    /// Forget all call counts.
    pub fn reset_calls(&self) {
        self.write().calls.clear();
    }

    /// Number of open channels.
    pub fn open_subscriptions(&self) -> usize {
        self.read().subscribers.len()
    }

    /// Scopes of the open channels.
    pub fn open_scopes(&self) -> Vec<Scope> {
        self.read()
            .subscribers
            .values()
            .map(|(scope, _)| scope.clone())
            .collect()
    }

    /// `mark_read` calls received so far.
    pub fn read_marks(&self) -> Vec<(ConversationId, UserId)> {
        self.read().read_marks.clone()
    }

    /// Stored records of a conversation.
    pub fn stored_messages(&self, conversation: &ConversationId) -> Vec<MessageRecord> {
        self.read()
            .messages
            .get(conversation)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Remote for MemoryRemote {
    async fn load_conversations(&self, identity: &UserId) -> Result<Vec<Conversation>> {
        self.enter(Operation::LoadConversations).await?;
        Ok(self
            .read()
            .conversations
            .get(identity)
            .cloned()
            .unwrap_or_default())
    }

    async fn load_messages(
        &self,
        conversation: &ConversationId,
        _identity: &UserId,
    ) -> Result<Vec<MessageRecord>> {
        self.enter(Operation::LoadMessages).await?;
        let inner = self.read();

        // Join sender profiles the way a bulk query would.
        let records = inner
            .messages
            .get(conversation)
            .map(|records| {
                records
                    .iter()
                    .cloned()
                    .map(|mut record| {
                        if record.sender_name.is_none() {
                            record.sender_name = inner.profiles.get(&record.sender_id).cloned();
                        }
                        record
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(records)
    }

    async fn mark_read(&self, conversation: &ConversationId, identity: &UserId) -> Result<()> {
        self.enter(Operation::MarkRead).await?;
        let mut inner = self.write();
        inner
            .read_marks
            .push((conversation.clone(), identity.clone()));
        if let Some(list) = inner.conversations.get_mut(identity) {
            for c in list.iter_mut().filter(|c| &c.id == conversation) {
                c.unread_count = 0;
            }
        }
        Ok(())
    }

    async fn send_message(
        &self,
        conversation: &ConversationId,
        identity: &UserId,
        text: &str,
    ) -> Result<MessageRecord> {
        self.enter(Operation::SendMessage).await?;
        let mut inner = self.write();

        inner.next_message += 1;
        let record = MessageRecord {
            id: MessageId::new(format!("msg-{}", inner.next_message)),
            conversation_id: conversation.clone(),
            sender_id: identity.clone(),
            sender_name: inner.profiles.get(identity).cloned(),
            text: text.to_owned(),
            sent_at: OrderingKey::now(),
        };

        inner
            .messages
            .entry(conversation.clone())
            .or_default()
            .push(record.clone());
        Self::bump_summaries(&mut inner, &record);

        if inner.echo_writes {
            Self::publish_locked(&mut inner, ChangeEvent::insert(record.clone()));
        }

        Ok(record)
    }

    async fn resolve_display_name(&self, user: &UserId) -> Result<Option<String>> {
        self.enter(Operation::ResolveDisplayName).await?;
        Ok(self.read().profiles.get(user).cloned())
    }

    async fn subscribe(&self, scope: Scope) -> Result<Subscription> {
        self.enter(Operation::Subscribe).await?;
        let (tx, rx) = mpsc::unbounded_channel();

        let mut inner = self.write();
        inner.next_subscription += 1;
        let id = SubscriptionId(inner.next_subscription);
        inner.subscribers.insert(id, (scope.clone(), tx));

        Ok(Subscription {
            id,
            scope,
            events: rx,
        })
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.write();
        *inner.calls.entry(Operation::Unsubscribe).or_default() += 1;
        inner.subscribers.remove(&id).is_some()
    }
}

/// Format a send time as `HH:MM` (UTC), the way list summaries display it.
fn format_time(at: OrderingKey) -> String {
    let minutes = at.as_millis().div_euclid(60_000);
    let (h, m) = (minutes.div_euclid(60).rem_euclid(24), minutes.rem_euclid(60));
    format!("{:02}:{:02}", h, m)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, conversation: &str, sender: &str, at: i64) -> MessageRecord {
        MessageRecord {
            id: MessageId::new(id),
            conversation_id: ConversationId::new(conversation),
            sender_id: UserId::new(sender),
            sender_name: None,
            text: format!("text {}", id),
            sent_at: OrderingKey::from_millis(at),
        }
    }

    #[tokio::test]
    async fn test_scoped_subscription_only_sees_its_conversation() {
        let remote = MemoryRemote::new();
        let mut all = remote.subscribe(Scope::AllMessages).await.unwrap();
        let mut scoped = remote
            .subscribe(Scope::Conversation(ConversationId::new("c1")))
            .await
            .unwrap();

        assert_eq!(remote.insert_message(record("m1", "c2", "u1", 1)), 1);
        assert_eq!(remote.insert_message(record("m2", "c1", "u1", 2)), 2);

        assert_eq!(all.events.recv().await.unwrap().record.id.as_str(), "m1");
        assert_eq!(all.events.recv().await.unwrap().record.id.as_str(), "m2");
        assert_eq!(scoped.events.recv().await.unwrap().record.id.as_str(), "m2");
        assert!(scoped.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let remote = MemoryRemote::new();
        let sub = remote.subscribe(Scope::AllMessages).await.unwrap();
        assert_eq!(remote.open_subscriptions(), 1);

        assert!(remote.unsubscribe(sub.id));
        assert!(!remote.unsubscribe(sub.id));
        assert_eq!(remote.open_subscriptions(), 0);
        assert_eq!(remote.calls(Operation::Unsubscribe), 2);
    }

    #[tokio::test]
    async fn test_send_echoes_to_writer() {
        let remote = MemoryRemote::new();
        let conv = ConversationId::new("c1");
        let me = UserId::new("me");
        let mut sub = remote.subscribe(Scope::Conversation(conv.clone())).await.unwrap();

        let stored = remote.send_message(&conv, &me, "hello").await.unwrap();
        let echo = sub.events.recv().await.unwrap();
        assert_eq!(echo.record, stored);

        remote.set_echo_writes(false);
        remote.send_message(&conv, &me, "quiet").await.unwrap();
        assert!(sub.events.try_recv().is_err());
        assert_eq!(remote.stored_messages(&conv).len(), 2);
    }

    #[tokio::test]
    async fn test_injected_failure_still_counts_call() {
        let remote = MemoryRemote::new();
        remote.set_failing(Operation::LoadConversations, true);

        let err = remote
            .load_conversations(&UserId::new("me"))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Injected(Operation::LoadConversations)));
        assert_eq!(remote.calls(Operation::LoadConversations), 1);
    }

    #[tokio::test]
    async fn test_load_messages_joins_profiles() {
        let remote = MemoryRemote::new();
        remote.add_profile(&UserId::new("u1"), "Alex");
        remote.seed_message(record("m1", "c1", "u1", 1));
        remote.seed_message(record("m2", "c1", "u2", 2));

        let records = remote
            .load_messages(&ConversationId::new("c1"), &UserId::new("me"))
            .await
            .unwrap();
        assert_eq!(records[0].sender_name.as_deref(), Some("Alex"));
        assert_eq!(records[1].sender_name, None);
    }

    #[tokio::test]
    async fn test_insert_updates_summaries() {
        let remote = MemoryRemote::new();
        let me = UserId::new("me");
        remote.add_conversation(&me, Conversation::new("c1", "Alex"));

        remote.insert_message(record("m1", "c1", "u1", 90 * 60_000));
        let list = remote.load_conversations(&me).await.unwrap();
        assert_eq!(list[0].last_message.preview(), "text m1");
        assert_eq!(list[0].last_message_time, "01:30");
        assert_eq!(list[0].unread_count, 1);

        remote.mark_read(&ConversationId::new("c1"), &me).await.unwrap();
        let list = remote.load_conversations(&me).await.unwrap();
        assert_eq!(list[0].unread_count, 0);
    }

    #[tokio::test]
    async fn test_closed_receiver_is_pruned() {
        let remote = MemoryRemote::new();
        let sub = remote.subscribe(Scope::AllMessages).await.unwrap();
        drop(sub.events);

        assert_eq!(remote.insert_message(record("m1", "c1", "u1", 1)), 0);
        assert_eq!(remote.open_subscriptions(), 0);
    }
}
