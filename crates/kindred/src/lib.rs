//! # Kindred
//!
//! Live synchronization of a chat client's conversation list and message
//! streams against a realtime-enabled remote store.
//!
//! ## Overview
//!
//! Kindred keeps two views current for a signed-in identity:
//!
//! - **Conversation list**: reloaded in full once a burst of change events
//!   goes quiet
//! - **Message stream**: one per open conversation, patched per inbound
//!   message, with sender names resolved in the background
//!
//! ## Key Concepts
//!
//! - **Session**: the per-identity owner of the list; opens streams on demand
//! - **Remote**: the store collaborator; queries, writes, and a change feed
//! - **Self-echo**: the store's notification of a write this client made;
//!   dropped, since the write's own result is already listed
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use kindred::{Session, SessionConfig};
//! use kindred::core::UserId;
//! use kindred::remote::MemoryRemote;
//!
//! async fn example() {
//!     let remote = Arc::new(MemoryRemote::new());
//!     let session = Session::start(remote, UserId::new("me"), SessionConfig::default()).await;
//!
//!     for conversation in session.conversations().conversations() {
//!         println!("{}: {}", conversation.display_name, conversation.last_message.preview());
//!     }
//!
//!     let chat = session.open_conversation("c1").await.unwrap();
//!     chat.send("hello").await.unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `kindred::core` - Data model (Conversation, Message, ChangeEvent, etc.)
//! - `kindred::remote` - Remote trait and in-memory store
//! - `kindred::sync` - The synchronizers

pub mod error;
pub mod session;

// Re-export component crates
pub use kindred_core as core;
pub use kindred_remote as remote;
pub use kindred_sync as sync;

// Re-export main types for convenience
pub use error::{Result, SessionError};
pub use session::{Session, SessionConfig};

pub use kindred_core::{
    ChangeEvent, Conversation, ConversationId, LastMessage, Message, MessageId, UserId,
};
pub use kindred_remote::{MemoryRemote, Remote};
pub use kindred_sync::{
    ConversationListState, ConversationListSync, MessageStreamState, MessageStreamSync,
    SyncConfig, SyncError, SyncStats,
};
