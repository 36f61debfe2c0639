//! Conversation list synchronizer.
//!
//! Keeps the conversation list of one identity in line with the remote store.
//! The subscription covers the whole message entity and is not filtered by
//! identity; instead of patching, every burst of change events triggers one
//! full reload after the debounce window. Eventual accuracy comes from the
//! reload, not from the events themselves.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use kindred_core::{ChangeEvent, Conversation, Scope, UserId};
use kindred_remote::Remote;
use tokio::sync::watch;

use crate::config::SyncConfig;
use crate::debounce::Debouncer;
use crate::error::{Result, SyncError};
use crate::stats::{Counters, SyncStats};
use crate::subscription::{LiveFeed, SubscriptionGuard};

/// What readers of the conversation list see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationListState {
    pub conversations: Vec<Conversation>,
    pub loading: bool,
    /// Human-readable message of the last failure, cleared by a good reload.
    pub error: Option<String>,
    /// Whether the subscription is currently open.
    pub realtime_active: bool,
}

struct ListShared<R: Remote> {
    identity: UserId,
    remote: Arc<R>,
    state: watch::Sender<ConversationListState>,
    /// Serializes reloads so two never race.
    reload_lock: tokio::sync::Mutex<()>,
    closed: AtomicBool,
    counters: Counters,
}

impl<R: Remote> ListShared<R> {
    async fn reload(&self) -> Result<()> {
        let _serial = self.reload_lock.lock().await;
        if self.closed.load(Ordering::Acquire) {
            return Err(SyncError::ShutDown);
        }

        Counters::bump(&self.counters.reloads);
        self.state.send_modify(|s| s.loading = true);

        match self.remote.load_conversations(&self.identity).await {
            Ok(conversations) => {
                tracing::debug!(
                    identity = %self.identity,
                    count = conversations.len(),
                    "conversation list reloaded"
                );
                self.state.send_modify(|s| {
                    s.conversations = conversations;
                    s.loading = false;
                    s.error = None;
                });
                Counters::bump(&self.counters.reloads_applied);
                Ok(())
            }
            Err(e) => {
                Counters::bump(&self.counters.reload_failures);
                tracing::warn!(identity = %self.identity, error = %e, "conversation list reload failed");
                let err = SyncError::Load(e);
                let message = err.user_message();
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(message);
                });
                Err(err)
            }
        }
    }

    fn set_realtime(&self, active: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.realtime_active != active;
            s.realtime_active = active;
            changed
        });
    }
}

/// Live conversation list for one identity.
///
/// Owns exactly one subscription and one debounce slot. Dropping it is the
/// same as calling [`ConversationListSync::shutdown`].
pub struct ConversationListSync<R: Remote> {
    shared: Arc<ListShared<R>>,
    debouncer: Arc<Debouncer>,
    live: Mutex<Option<LiveFeed<R>>>,
}

impl<R: Remote> ConversationListSync<R> {
    /// Activate for `identity`: open the subscription, then load the list.
    ///
    /// Neither step fails activation. A failed load shows up in the `error`
    /// field; a failed subscription leaves `realtime_active` false and manual
    /// refresh as the only way to update.
    pub async fn start(remote: Arc<R>, identity: UserId, config: SyncConfig) -> Self {
        let shared = Arc::new(ListShared {
            identity,
            remote,
            state: watch::Sender::new(ConversationListState {
                loading: true,
                ..ConversationListState::default()
            }),
            reload_lock: tokio::sync::Mutex::new(()),
            closed: AtomicBool::new(false),
            counters: Counters::default(),
        });
        let debouncer = Arc::new(Debouncer::new(config.debounce_window));

        tracing::info!(identity = %shared.identity, "starting conversation list sync");

        // Subscribe before the first load so nothing written during it is missed.
        let live = match SubscriptionGuard::open(Arc::clone(&shared.remote), Scope::AllMessages).await
        {
            Ok((guard, events)) => {
                shared.set_realtime(true);
                Some(Self::spawn_feed(&shared, &debouncer, guard, events))
            }
            Err(e) => {
                let err = SyncError::Subscribe(e);
                tracing::warn!(identity = %shared.identity, error = %err, "realtime unavailable, manual refresh only");
                None
            }
        };

        // Failure is recorded in state.
        let _ = shared.reload().await;

        Self {
            shared,
            debouncer,
            live: Mutex::new(live),
        }
    }

    fn spawn_feed(
        shared: &Arc<ListShared<R>>,
        debouncer: &Arc<Debouncer>,
        guard: SubscriptionGuard<R>,
        events: tokio::sync::mpsc::UnboundedReceiver<ChangeEvent>,
    ) -> LiveFeed<R> {
        let on_event = {
            let shared = Arc::clone(shared);
            let debouncer = Arc::clone(debouncer);
            move |event: ChangeEvent| {
                Counters::bump(&shared.counters.events_received);
                tracing::trace!(
                    identity = %shared.identity,
                    kind = ?event.kind,
                    conversation = %event.record.conversation_id,
                    "list change event"
                );
                let reload = Arc::clone(&shared);
                let superseded = debouncer.schedule(async move {
                    let _ = reload.reload().await;
                });
                if superseded {
                    Counters::bump(&shared.counters.debounce_superseded);
                }
            }
        };
        let on_closed = {
            let shared = Arc::clone(shared);
            move || {
                tracing::warn!(identity = %shared.identity, "change feed closed by remote");
                shared.set_realtime(false);
            }
        };
        LiveFeed::spawn(guard, events, on_event, on_closed)
    }

    pub fn identity(&self) -> &UserId {
        &self.shared.identity
    }

    /// Current state.
    pub fn snapshot(&self) -> ConversationListState {
        self.shared.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    pub fn watch(&self) -> watch::Receiver<ConversationListState> {
        self.shared.state.subscribe()
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.shared.state.borrow().conversations.clone()
    }

    pub fn is_realtime_active(&self) -> bool {
        self.shared.state.borrow().realtime_active
    }

    /// Sum of unread counts across the list.
    pub fn unread_total(&self) -> u32 {
        self.shared
            .state
            .borrow()
            .conversations
            .iter()
            .map(|c| c.unread_count)
            .sum()
    }

    /// Whether a debounced reload is waiting to fire.
    pub fn reload_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Reload now, regardless of any pending debounced reload.
    pub async fn refresh(&self) -> Result<()> {
        self.shared.reload().await
    }

    pub fn stats(&self) -> SyncStats {
        self.shared.counters.snapshot()
    }

    /// Cancel the pending reload and release the subscription. Idempotent.
    pub fn shutdown(&self) {
        let was_open = !self.shared.closed.swap(true, Ordering::AcqRel);
        self.debouncer.cancel();
        if let Some(live) = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            live.close();
        }
        self.shared.state.send_if_modified(|s| {
            let changed = s.realtime_active || s.loading;
            s.realtime_active = false;
            s.loading = false;
            changed
        });
        if was_open {
            tracing::info!(identity = %self.shared.identity, "conversation list sync stopped");
        }
    }
}

impl<R: Remote> Drop for ConversationListSync<R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
