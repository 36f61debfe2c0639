//! # Kindred Testkit
//!
//! Testing utilities for Kindred live sync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a seeded in-memory remote with two parties and a shared
//!   conversation
//! - **Generators**: Proptest strategies for inbound event batches
//! - **Tracing**: a one-call subscriber setup for test output
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use kindred_testkit::TestFixture;
//!
//! async fn example() {
//!     let fixture = TestFixture::new();
//!     let stream = fixture.stream_sync().await;
//!     fixture.friend_says("m1", 1_000);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use kindred_testkit::EventBatch;
//!
//! proptest! {
//!     #[test]
//!     fn batch_is_nonempty(batch: EventBatch) {
//!         prop_assert!(!batch.records.is_empty());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{users, TestFixture, FRIEND_NAME};
pub use generators::{event_batch, EventBatch};

/// Install a fmt subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
