//! Per-synchronizer counters.

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a synchronizer's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Change events taken off the subscription.
    pub events_received: u64,
    /// Events outside this synchronizer's scope or of an ignored kind.
    pub events_ignored: u64,
    /// Inbound events authored by the owning identity.
    pub self_echoes_dropped: u64,
    /// Inbound events whose message id was already listed.
    pub duplicates_dropped: u64,
    /// Debounced reloads that replaced a still-pending one.
    pub debounce_superseded: u64,
    /// Bulk reloads started.
    pub reloads: u64,
    /// Bulk reloads whose result was published.
    pub reloads_applied: u64,
    /// Bulk reloads that failed.
    pub reload_failures: u64,
    /// Single-record name lookups issued.
    pub lookups_issued: u64,
    /// Lookups that failed or found nobody.
    pub lookups_failed: u64,
    /// Message entries whose placeholder name was replaced.
    pub names_patched: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub events_received: AtomicU64,
    pub events_ignored: AtomicU64,
    pub self_echoes_dropped: AtomicU64,
    pub duplicates_dropped: AtomicU64,
    pub debounce_superseded: AtomicU64,
    pub reloads: AtomicU64,
    pub reloads_applied: AtomicU64,
    pub reload_failures: AtomicU64,
    pub lookups_issued: AtomicU64,
    pub lookups_failed: AtomicU64,
    pub names_patched: AtomicU64,
}

impl Counters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SyncStats {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        SyncStats {
            events_received: get(&self.events_received),
            events_ignored: get(&self.events_ignored),
            self_echoes_dropped: get(&self.self_echoes_dropped),
            duplicates_dropped: get(&self.duplicates_dropped),
            debounce_superseded: get(&self.debounce_superseded),
            reloads: get(&self.reloads),
            reloads_applied: get(&self.reloads_applied),
            reload_failures: get(&self.reload_failures),
            lookups_issued: get(&self.lookups_issued),
            lookups_failed: get(&self.lookups_failed),
            names_patched: get(&self.names_patched),
        }
    }
}
