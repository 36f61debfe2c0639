//! Messages and the ordered message list.
//!
//! The list exposed to readers upholds three invariants:
//! - entries are sorted ascending by [`OrderingKey`]
//! - no two entries share a [`MessageId`]
//! - there is exactly one entry per remote message delivered to this client
//!
//! [`insert_sorted`] is the only way entries are added, so the first two hold
//! by construction.

use serde::{Deserialize, Serialize};

use crate::types::{ConversationId, MessageId, OrderingKey, UserId};

/// Number of id characters kept in a provisional sender label.
pub const PLACEHOLDER_ID_CHARS: usize = 6;

/// Delivery status. `Sent` is the only state this layer produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    #[default]
    Sent,
}

/// Where a message entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Returned by a bulk load.
    Loaded,
    /// Appended after a successful local send.
    LocalSend,
    /// Merged from an inbound change event.
    RemoteEvent,
}

/// A message record as the remote store returns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    /// Present on bulk loads that join the sender's profile.
    #[serde(default)]
    pub sender_name: Option<String>,
    pub text: String,
    /// Authoritative send time.
    pub sent_at: OrderingKey,
}

/// A message entry in a conversation's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub sender_id: UserId,
    /// Display name; may be a provisional placeholder until resolved.
    pub sender_name: String,
    /// Sort key only; never displayed.
    pub ordering_key: OrderingKey,
    /// True iff `sender_id` is the owning identity.
    pub is_me: bool,
    pub status: MessageStatus,
    pub provenance: Provenance,
}

impl Message {
    /// Build an entry from a bulk-loaded record.
    pub fn from_record(record: &MessageRecord, identity: &UserId) -> Self {
        let sender_name = record
            .sender_name
            .clone()
            .unwrap_or_else(|| placeholder_name(&record.sender_id));
        Self {
            id: record.id.clone(),
            text: record.text.clone(),
            sender_id: record.sender_id.clone(),
            sender_name,
            ordering_key: record.sent_at,
            is_me: &record.sender_id == identity,
            status: MessageStatus::Sent,
            provenance: Provenance::Loaded,
        }
    }

    /// Build an entry for an inbound event from another party.
    pub fn inbound(record: &MessageRecord, sender_name: String) -> Self {
        Self {
            id: record.id.clone(),
            text: record.text.clone(),
            sender_id: record.sender_id.clone(),
            sender_name,
            ordering_key: record.sent_at,
            is_me: false,
            status: MessageStatus::Sent,
            provenance: Provenance::RemoteEvent,
        }
    }

    /// Build an entry for a message this identity just sent.
    ///
    /// The ordering key is the moment of local construction, not the
    /// store's timestamp.
    pub fn local(
        id: MessageId,
        text: impl Into<String>,
        identity: &UserId,
        sender_name: impl Into<String>,
    ) -> Self {
        Self {
            id,
            text: text.into(),
            sender_id: identity.clone(),
            sender_name: sender_name.into(),
            ordering_key: OrderingKey::now(),
            is_me: true,
            status: MessageStatus::Sent,
            provenance: Provenance::LocalSend,
        }
    }
}

/// Deterministic provisional label for a sender whose name is unknown.
pub fn placeholder_name(sender: &UserId) -> String {
    let short: String = sender.as_str().chars().take(PLACEHOLDER_ID_CHARS).collect();
    format!("User {}", short)
}

/// Insert `message` keeping `messages` sorted by ordering key.
///
/// Returns false, leaving the list untouched, if an entry with the same id is
/// already present. Ties on the ordering key keep arrival order.
pub fn insert_sorted(messages: &mut Vec<Message>, message: Message) -> bool {
    if messages.iter().any(|m| m.id == message.id) {
        return false;
    }
    let at = messages.partition_point(|m| m.ordering_key <= message.ordering_key);
    messages.insert(at, message);
    true
}

/// Sort a freshly loaded list and drop duplicate ids (first occurrence wins).
pub fn normalize(mut messages: Vec<Message>) -> Vec<Message> {
    messages.sort_by_key(|m| m.ordering_key);
    let mut seen = std::collections::HashSet::with_capacity(messages.len());
    messages.retain(|m| seen.insert(m.id.clone()));
    messages
}

/// Check the sort invariant.
pub fn is_ordered(messages: &[Message]) -> bool {
    messages
        .windows(2)
        .all(|pair| pair[0].ordering_key <= pair[1].ordering_key)
}
