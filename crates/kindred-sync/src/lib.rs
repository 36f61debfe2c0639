//! # Kindred Sync
//!
//! Live synchronizers that keep a conversation list and a conversation's
//! message stream consistent with a remote store.
//!
//! ## Overview
//!
//! Two strategies, one per surface:
//!
//! - [`ConversationListSync`] listens to every message change, and after the
//!   event burst goes quiet it reloads the whole list once. It never patches.
//! - [`MessageStreamSync`] listens to one conversation's inserts and merges
//!   each into the ordered list as it arrives. Its own sends are appended
//!   from the write result; their echoes are dropped.
//!
//! ## Key Properties
//!
//! - **Ordered**: message lists stay sorted by send time with unique ids
//! - **No self-duplication**: a sent message appears exactly once
//! - **Coalesced**: a burst of list events costs one reload
//! - **Single release**: each subscription is released exactly once, on
//!   `shutdown` or drop
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use kindred_core::{ConversationId, UserId};
//! use kindred_remote::MemoryRemote;
//! use kindred_sync::{ConversationListSync, MessageStreamSync, SyncConfig};
//!
//! async fn example() {
//!     let remote = Arc::new(MemoryRemote::new());
//!     let me = UserId::new("me");
//!
//!     let list = ConversationListSync::start(Arc::clone(&remote), me.clone(), SyncConfig::default()).await;
//!     let stream = MessageStreamSync::start(
//!         remote,
//!         me,
//!         ConversationId::new("c1"),
//!         SyncConfig::default(),
//!     )
//!     .await;
//!
//!     stream.send("hello").await.unwrap();
//!     println!("{} unread", list.unread_total());
//! }
//! ```

pub mod config;
pub mod conversation_list;
pub mod debounce;
pub mod error;
pub mod message_stream;
pub mod resolver;
pub mod stats;
pub mod subscription;

pub use config::{SyncConfig, DEFAULT_DEBOUNCE_WINDOW};
pub use conversation_list::{ConversationListState, ConversationListSync};
pub use debounce::Debouncer;
pub use error::{Result, SyncError};
pub use message_stream::{MessageStreamState, MessageStreamSync};
pub use resolver::SenderNameResolver;
pub use stats::SyncStats;
pub use subscription::SubscriptionGuard;
