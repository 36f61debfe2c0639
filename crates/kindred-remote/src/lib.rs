//! # Kindred Remote
//!
//! The collaborator contract between the live-sync layer and the remote data
//! store, plus an in-memory implementation.
//!
//! ## Overview
//!
//! The sync layer never talks to a concrete backend. It consumes the
//! [`Remote`] trait: bulk queries, an outbound write, a single-record name
//! lookup, and a push-based change feed. The persistence format behind it is
//! not this crate's concern.
//!
//! ## Key Types
//!
//! - [`Remote`] - The async trait for all remote operations
//! - [`Subscription`] - One open change-feed channel
//! - [`MemoryRemote`] - In-memory store for tests and demos
//! - [`Operation`] - Names each remote call, for accounting and failure injection
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kindred_core::{Scope, UserId};
//! use kindred_remote::{MemoryRemote, Remote};
//!
//! async fn example() {
//!     let remote = MemoryRemote::new();
//!     let me = UserId::new("me");
//!
//!     let conversations = remote.load_conversations(&me).await.unwrap();
//!     let mut sub = remote.subscribe(Scope::AllMessages).await.unwrap();
//!
//!     // while let Some(event) = sub.events.recv().await { ... }
//!     remote.unsubscribe(sub.id);
//! }
//! ```

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{RemoteError, Result};
pub use memory::MemoryRemote;
pub use traits::{Operation, Remote, Subscription, SubscriptionId};
