//! Conversation summaries as shown in the conversation list.
//!
//! A conversation summary is created transiently on every full reload of the
//! list and replaced wholesale; it has no local identity across reloads.

use serde::{Deserialize, Serialize};

use crate::types::ConversationId;

/// Preview of the latest message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum LastMessage {
    /// Text of the most recent message.
    Text(String),
    /// The conversation has no messages yet.
    NoMessagesYet,
}

impl LastMessage {
    /// Preview text for display.
    pub fn preview(&self) -> &str {
        match self {
            LastMessage::Text(text) => text,
            LastMessage::NoMessagesYet => "No messages yet",
        }
    }
}

/// A one-to-one or group chat surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub display_name: String,
    pub is_group: bool,
    pub is_online: bool,
    pub last_message: LastMessage,
    /// Preformatted by the remote query.
    pub last_message_time: String,
    pub unread_count: u32,
}

impl Conversation {
    /// Create a conversation with no messages and nothing unread.
    pub fn new(id: impl Into<ConversationId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            is_group: false,
            is_online: false,
            last_message: LastMessage::NoMessagesYet,
            last_message_time: String::new(),
            unread_count: 0,
        }
    }

    /// Set the latest message preview and its formatted time.
    pub fn with_last_message(mut self, text: impl Into<String>, time: impl Into<String>) -> Self {
        self.last_message = LastMessage::Text(text.into());
        self.last_message_time = time.into();
        self
    }

    pub fn with_unread(mut self, unread_count: u32) -> Self {
        self.unread_count = unread_count;
        self
    }

    pub fn group(mut self) -> Self {
        self.is_group = true;
        self
    }

    pub fn online(mut self, is_online: bool) -> Self {
        self.is_online = is_online;
        self
    }
}
