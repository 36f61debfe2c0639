//! Change events pushed by the remote store.
//!
//! The remote store emits one event per insert, update, or delete on the
//! message entity. Only the fields below are relied on; anything else in the
//! payload is ignored.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::message::MessageRecord;
use crate::types::ConversationId;

/// Kind of change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A structured change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub record: MessageRecord,
}

impl ChangeEvent {
    pub fn insert(record: MessageRecord) -> Self {
        Self {
            kind: ChangeKind::Insert,
            record,
        }
    }

    pub fn update(record: MessageRecord) -> Self {
        Self {
            kind: ChangeKind::Update,
            record,
        }
    }

    pub fn delete(record: MessageRecord) -> Self {
        Self {
            kind: ChangeKind::Delete,
            record,
        }
    }

    /// Decode a realtime payload of the form `{"type": "INSERT", "record": {..}}`.
    pub fn from_json(payload: &str) -> Result<Self> {
        if payload.trim().is_empty() {
            return Err(CoreError::EmptyPayload);
        }
        Ok(serde_json::from_str(payload)?)
    }

    /// Encode as a realtime payload.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Whether this event is delivered to a subscriber of `scope`.
    pub fn matches(&self, scope: &Scope) -> bool {
        match scope {
            Scope::AllMessages => true,
            Scope::Conversation(id) => {
                self.kind == ChangeKind::Insert && &self.record.conversation_id == id
            }
        }
    }
}

/// What a subscription listens to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    /// Every insert, update, or delete anywhere in the message entity.
    AllMessages,
    /// Inserts into a single conversation.
    Conversation(ConversationId),
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::AllMessages => f.write_str("messages:*"),
            Scope::Conversation(id) => write!(f, "messages:{}", id),
        }
    }
}
