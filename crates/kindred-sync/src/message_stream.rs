//! Message stream synchronizer for one open conversation.
//!
//! Unlike the conversation list, the stream is patched incrementally: each
//! inbound insert is merged into the ordered list as it arrives. Messages this
//! identity sends are appended from the write's own result, so their echo on
//! the change feed is dropped by sender.
//!
//! Sender names come from a per-stream [`SenderNameResolver`]. On a miss the
//! entry is shown with a placeholder at once and patched in place when a
//! background lookup completes. Lookups are coalesced per sender.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use kindred_core::{
    insert_sorted, normalize, placeholder_name, ChangeEvent, ChangeKind, ConversationId, Message,
    MessageId, MessageRecord, Provenance, Scope, UserId,
};
use kindred_remote::{Remote, RemoteError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::resolver::SenderNameResolver;
use crate::stats::{Counters, SyncStats};
use crate::subscription::{LiveFeed, SubscriptionGuard};

/// Label used for a local send when the sender's own name is unknown.
const SELF_LABEL: &str = "You";

/// What readers of the message stream see.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageStreamState {
    /// Sorted ascending by ordering key, unique by id.
    pub messages: Vec<Message>,
    pub loading: bool,
    pub error: Option<String>,
    /// True while at least one outbound write is in flight.
    pub sending: bool,
}

struct StreamShared<R: Remote> {
    identity: UserId,
    conversation: ConversationId,
    remote: Arc<R>,
    config: SyncConfig,
    state: watch::Sender<MessageStreamState>,
    resolver: SenderNameResolver,

    /// Senders with a lookup in flight, and the entries waiting on each.
    pending_lookups: Mutex<HashMap<UserId, Vec<MessageId>>>,
    lookup_tasks: Mutex<Vec<JoinHandle<()>>>,

    reload_lock: tokio::sync::Mutex<()>,
    sends_in_flight: AtomicUsize,
    realtime: AtomicBool,
    closed: AtomicBool,
    counters: Counters,
}

impl<R: Remote> StreamShared<R> {
    fn pending(&self) -> MutexGuard<'_, HashMap<UserId, Vec<MessageId>>> {
        self.pending_lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bulk Load
    // ─────────────────────────────────────────────────────────────────────────

    async fn reload(&self) -> Result<()> {
        let _serial = self.reload_lock.lock().await;
        if self.closed.load(Ordering::Acquire) {
            return Err(SyncError::ShutDown);
        }

        Counters::bump(&self.counters.reloads);
        self.state.send_modify(|s| s.loading = true);

        let records = match self
            .remote
            .load_messages(&self.conversation, &self.identity)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                Counters::bump(&self.counters.reload_failures);
                tracing::warn!(
                    conversation = %self.conversation,
                    error = %e,
                    "message load failed"
                );
                let err = SyncError::Load(e);
                let message = err.user_message();
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(message);
                });
                return Err(err);
            }
        };

        self.resolver.seed(
            records
                .iter()
                .filter_map(|r| r.sender_name.clone().map(|name| (r.sender_id.clone(), name))),
        );

        let loaded = normalize(
            records
                .iter()
                .map(|r| Message::from_record(r, &self.identity))
                .collect(),
        );
        tracing::debug!(
            conversation = %self.conversation,
            count = loaded.len(),
            "messages loaded"
        );

        self.state.send_modify(move |s| {
            s.messages = merge_reload(loaded, std::mem::take(&mut s.messages));
            s.loading = false;
            s.error = None;
        });
        Counters::bump(&self.counters.reloads_applied);

        if self.config.mark_read_on_load {
            self.spawn_mark_read();
        }
        Ok(())
    }

    fn spawn_mark_read(&self) {
        let remote = Arc::clone(&self.remote);
        let conversation = self.conversation.clone();
        let identity = self.identity.clone();
        tokio::spawn(async move {
            if let Err(e) = remote.mark_read(&conversation, &identity).await {
                tracing::debug!(conversation = %conversation, error = %e, "mark read failed");
            }
        });
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inbound Events
    // ─────────────────────────────────────────────────────────────────────────

    fn handle_event(self: &Arc<Self>, event: ChangeEvent) {
        Counters::bump(&self.counters.events_received);

        if event.kind != ChangeKind::Insert || event.record.conversation_id != self.conversation {
            Counters::bump(&self.counters.events_ignored);
            return;
        }
        let record = event.record;

        if record.sender_id == self.identity {
            Counters::bump(&self.counters.self_echoes_dropped);
            tracing::debug!(
                conversation = %self.conversation,
                message = %record.id,
                "dropping echo of own message"
            );
            return;
        }

        // Held until the entry is registered, so a lookup finishing in
        // between cannot miss it.
        let mut pending = self.pending();

        let known = self.resolver.get(&record.sender_id).or_else(|| {
            let name = record.sender_name.clone()?;
            self.resolver.put(record.sender_id.clone(), name.clone());
            Some(name)
        });
        let needs_lookup = known.is_none() && self.config.resolve_names;
        let name = known.unwrap_or_else(|| {
            tracing::debug!(sender = %record.sender_id, "sender unknown, using placeholder");
            placeholder_name(&record.sender_id)
        });

        let message = Message::inbound(&record, name);
        let inserted = self
            .state
            .send_if_modified(|s| insert_sorted(&mut s.messages, message));
        if !inserted {
            Counters::bump(&self.counters.duplicates_dropped);
            tracing::debug!(message = %record.id, "dropping already listed message");
            return;
        }

        if needs_lookup {
            match pending.entry(record.sender_id.clone()) {
                Entry::Occupied(mut waiting) => waiting.get_mut().push(record.id),
                Entry::Vacant(slot) => {
                    slot.insert(vec![record.id]);
                    self.spawn_lookup(record.sender_id);
                }
            }
        }
    }

    fn spawn_lookup(self: &Arc<Self>, sender: UserId) {
        Counters::bump(&self.counters.lookups_issued);
        let shared = Arc::clone(self);
        let task = tokio::spawn(async move {
            let outcome = shared.remote.resolve_display_name(&sender).await;
            shared.finish_lookup(sender, outcome);
        });

        let mut tasks = self
            .lookup_tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }

    fn finish_lookup(
        &self,
        sender: UserId,
        outcome: std::result::Result<Option<String>, RemoteError>,
    ) {
        let (name, waiting) = {
            let mut pending = self.pending();
            let waiting = pending.remove(&sender).unwrap_or_default();
            let name = match outcome {
                Ok(Some(name)) => {
                    self.resolver.put(sender.clone(), name.clone());
                    Some(name)
                }
                Ok(None) => {
                    tracing::debug!(sender = %sender, "no profile for sender");
                    None
                }
                Err(e) => {
                    tracing::debug!(sender = %sender, error = %e, "name lookup failed");
                    None
                }
            };
            (name, waiting)
        };

        let Some(name) = name else {
            Counters::bump(&self.counters.lookups_failed);
            return;
        };

        let mut patched = 0;
        self.state.send_if_modified(|s| {
            for message in s.messages.iter_mut().filter(|m| waiting.contains(&m.id)) {
                message.sender_name = name.clone();
                patched += 1;
            }
            patched > 0
        });
        Counters::add(&self.counters.names_patched, patched);
        tracing::debug!(sender = %sender, name = %name, patched, "sender name resolved");
    }
}

/// Replace the list with a fresh load, keeping live entries the load has not
/// caught up with yet so nothing delivered disappears.
fn merge_reload(mut loaded: Vec<Message>, previous: Vec<Message>) -> Vec<Message> {
    let loaded_ids: HashSet<MessageId> = loaded.iter().map(|m| m.id.clone()).collect();
    for message in previous {
        if message.provenance != Provenance::Loaded && !loaded_ids.contains(&message.id) {
            insert_sorted(&mut loaded, message);
        }
    }
    loaded
}

/// Clears `sending` when the last in-flight write finishes, even if the
/// caller drops the send future.
struct SendingGuard<'a, R: Remote> {
    shared: &'a StreamShared<R>,
}

impl<'a, R: Remote> SendingGuard<'a, R> {
    fn enter(shared: &'a StreamShared<R>) -> Self {
        shared.sends_in_flight.fetch_add(1, Ordering::AcqRel);
        shared.state.send_if_modified(|s| !std::mem::replace(&mut s.sending, true));
        Self { shared }
    }
}

impl<R: Remote> Drop for SendingGuard<'_, R> {
    fn drop(&mut self) {
        if self.shared.sends_in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.shared
                .state
                .send_if_modified(|s| std::mem::replace(&mut s.sending, false));
        }
    }
}

/// Live message list for one conversation, as seen by one identity.
///
/// Owns one subscription, one name resolver, and any lookups it started.
/// Dropping it is the same as calling [`MessageStreamSync::shutdown`].
pub struct MessageStreamSync<R: Remote> {
    shared: Arc<StreamShared<R>>,
    live: Mutex<Option<LiveFeed<R>>>,
}

impl<R: Remote> MessageStreamSync<R> {
    /// Activate for `conversation`: subscribe to its inserts, then load it.
    ///
    /// Neither a failed subscribe nor a failed load fails activation.
    pub async fn start(
        remote: Arc<R>,
        identity: UserId,
        conversation: ConversationId,
        config: SyncConfig,
    ) -> Self {
        let shared = Arc::new(StreamShared {
            identity,
            conversation,
            remote,
            config,
            state: watch::Sender::new(MessageStreamState {
                loading: true,
                ..MessageStreamState::default()
            }),
            resolver: SenderNameResolver::new(),
            pending_lookups: Mutex::new(HashMap::new()),
            lookup_tasks: Mutex::new(Vec::new()),
            reload_lock: tokio::sync::Mutex::new(()),
            sends_in_flight: AtomicUsize::new(0),
            realtime: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            counters: Counters::default(),
        });

        tracing::info!(
            identity = %shared.identity,
            conversation = %shared.conversation,
            "starting message stream sync"
        );

        let scope = Scope::Conversation(shared.conversation.clone());
        let live = match SubscriptionGuard::open(Arc::clone(&shared.remote), scope).await {
            Ok((guard, events)) => {
                shared.realtime.store(true, Ordering::Release);
                Some(Self::spawn_feed(&shared, guard, events))
            }
            Err(e) => {
                let err = SyncError::Subscribe(e);
                tracing::warn!(conversation = %shared.conversation, error = %err, "realtime unavailable");
                None
            }
        };

        // Failure is recorded in state.
        let _ = shared.reload().await;

        Self {
            shared,
            live: Mutex::new(live),
        }
    }

    fn spawn_feed(
        shared: &Arc<StreamShared<R>>,
        guard: SubscriptionGuard<R>,
        events: mpsc::UnboundedReceiver<ChangeEvent>,
    ) -> LiveFeed<R> {
        let on_event = {
            let shared = Arc::clone(shared);
            move |event: ChangeEvent| shared.handle_event(event)
        };
        let on_closed = {
            let shared = Arc::clone(shared);
            move || {
                tracing::warn!(conversation = %shared.conversation, "change feed closed by remote");
                shared.realtime.store(false, Ordering::Release);
            }
        };
        LiveFeed::spawn(guard, events, on_event, on_closed)
    }

    pub fn identity(&self) -> &UserId {
        &self.shared.identity
    }

    pub fn conversation(&self) -> &ConversationId {
        &self.shared.conversation
    }

    /// Current state.
    pub fn snapshot(&self) -> MessageStreamState {
        self.shared.state.borrow().clone()
    }

    /// Receiver that observes every state change.
    pub fn watch(&self) -> watch::Receiver<MessageStreamState> {
        self.shared.state.subscribe()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.shared.state.borrow().messages.clone()
    }

    pub fn is_realtime_active(&self) -> bool {
        self.shared.realtime.load(Ordering::Acquire)
    }

    /// This stream's sender-name cache.
    pub fn resolver(&self) -> &SenderNameResolver {
        &self.shared.resolver
    }

    /// Send `text` to the conversation.
    ///
    /// Leading and trailing whitespace is trimmed; empty text is rejected
    /// without touching state. On success the stored message is appended and
    /// returned. On failure `error` is set and nothing is appended.
    pub async fn send(&self, text: &str) -> Result<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SyncError::EmptyMessage);
        }
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(SyncError::ShutDown);
        }

        let shared: &StreamShared<R> = &self.shared;
        let outcome = {
            let _sending = SendingGuard::enter(shared);
            shared
                .remote
                .send_message(&shared.conversation, &shared.identity, text)
                .await
        };

        match outcome {
            Ok(record) => Ok(self.append_sent(record)),
            Err(e) => {
                tracing::warn!(conversation = %shared.conversation, error = %e, "send failed");
                let err = SyncError::Send(e);
                let message = err.user_message();
                shared.state.send_modify(|s| s.error = Some(message));
                Err(err)
            }
        }
    }

    fn append_sent(&self, record: MessageRecord) -> Message {
        let shared = &self.shared;
        let name = shared
            .resolver
            .get(&shared.identity)
            .or(record.sender_name)
            .unwrap_or_else(|| SELF_LABEL.to_string());
        let message = Message::local(record.id, record.text, &shared.identity, name);

        let entry = message.clone();
        shared.state.send_modify(|s| {
            insert_sorted(&mut s.messages, entry);
            s.error = None;
        });
        tracing::debug!(conversation = %shared.conversation, message = %message.id, "message sent");
        message
    }

    /// Re-run the bulk load.
    pub async fn refresh(&self) -> Result<()> {
        self.shared.reload().await
    }

    pub fn stats(&self) -> SyncStats {
        self.shared.counters.snapshot()
    }

    /// Release the subscription and abort outstanding lookups. Idempotent.
    pub fn shutdown(&self) {
        let was_open = !self.shared.closed.swap(true, Ordering::AcqRel);
        if let Some(live) = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            live.close();
        }
        self.shared.realtime.store(false, Ordering::Release);

        for task in self
            .shared
            .lookup_tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
        {
            task.abort();
        }
        self.shared.pending().clear();

        self.shared
            .state
            .send_if_modified(|s| std::mem::replace(&mut s.loading, false));
        if was_open {
            tracing::info!(conversation = %self.shared.conversation, "message stream sync stopped");
        }
    }
}

impl<R: Remote> Drop for MessageStreamSync<R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
