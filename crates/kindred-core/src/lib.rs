//! # Kindred Core
//!
//! Data model for Kindred live sync: conversation summaries, messages, and
//! the change events a remote store pushes about them.
//!
//! This crate contains no I/O and no tasks. It is pure data plus the ordering
//! rules the synchronizers rely on.
//!
//! ## Key Types
//!
//! - [`Conversation`] - A row in the conversation list
//! - [`Message`] - An entry in a conversation's ordered message list
//! - [`MessageRecord`] - A message as the remote store returns it
//! - [`ChangeEvent`] - A push notification about the message entity
//! - [`Scope`] - What a subscription listens to
//!
//! ## Ordering
//!
//! Message lists are kept sorted by [`OrderingKey`] with unique ids. See
//! [`message::insert_sorted`].

pub mod conversation;
pub mod error;
pub mod event;
pub mod message;
pub mod types;

pub use conversation::{Conversation, LastMessage};
pub use error::{CoreError, Result};
pub use event::{ChangeEvent, ChangeKind, Scope};
pub use message::{
    insert_sorted, is_ordered, normalize, placeholder_name, Message, MessageRecord,
    MessageStatus, Provenance,
};
pub use types::{ConversationId, MessageId, OrderingKey, UserId};
