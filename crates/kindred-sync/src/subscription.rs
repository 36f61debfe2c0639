//! Subscription ownership and the per-synchronizer event pump.
//!
//! A [`SubscriptionGuard`] owns exactly one open channel and releases it
//! exactly once, whether through [`SubscriptionGuard::release`] or on drop.
//! A [`LiveFeed`] pairs a guard with the single task that drains the
//! channel, which is what serializes event handling per synchronizer.

use std::sync::Arc;

use kindred_core::{ChangeEvent, Scope};
use kindred_remote::{Remote, RemoteError, SubscriptionId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Exclusive owner of one open subscription.
pub struct SubscriptionGuard<R: Remote> {
    remote: Arc<R>,
    scope: Scope,
    id: Option<SubscriptionId>,
}

impl<R: Remote> SubscriptionGuard<R> {
    /// Open a subscription for `scope`.
    pub async fn open(
        remote: Arc<R>,
        scope: Scope,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ChangeEvent>), RemoteError> {
        let subscription = remote.subscribe(scope).await?;
        tracing::debug!(
            subscription = %subscription.id,
            scope = %subscription.scope,
            "subscription opened"
        );
        let guard = Self {
            remote,
            scope: subscription.scope,
            id: Some(subscription.id),
        };
        Ok((guard, subscription.events))
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn is_open(&self) -> bool {
        self.id.is_some()
    }

    /// Release the subscription. Later calls are no-ops.
    ///
    /// Returns true if this call did the release.
    pub fn release(&mut self) -> bool {
        match self.id.take() {
            Some(id) => {
                self.remote.unsubscribe(id);
                tracing::debug!(subscription = %id, scope = %self.scope, "subscription released");
                true
            }
            None => false,
        }
    }
}

impl<R: Remote> Drop for SubscriptionGuard<R> {
    fn drop(&mut self) {
        self.release();
    }
}

/// An open subscription plus the task consuming its events.
pub(crate) struct LiveFeed<R: Remote> {
    guard: SubscriptionGuard<R>,
    pump: JoinHandle<()>,
}

impl<R: Remote> LiveFeed<R> {
    /// Spawn the pump. `on_event` runs once per event, in delivery order, and
    /// must not block; `on_closed` runs if the remote closes the channel.
    pub fn spawn<E, C>(
        guard: SubscriptionGuard<R>,
        mut events: mpsc::UnboundedReceiver<ChangeEvent>,
        mut on_event: E,
        on_closed: C,
    ) -> Self
    where
        E: FnMut(ChangeEvent) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let pump = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                on_event(event);
            }
            on_closed();
        });
        Self { guard, pump }
    }

    /// Release the subscription and stop the pump.
    pub fn close(self) {
        drop(self);
    }
}

impl<R: Remote> Drop for LiveFeed<R> {
    fn drop(&mut self) {
        self.guard.release();
        self.pump.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindred_remote::{MemoryRemote, Operation};

    #[tokio::test]
    async fn test_release_exactly_once() {
        let remote = Arc::new(MemoryRemote::new());
        let (mut guard, _events) = SubscriptionGuard::open(Arc::clone(&remote), Scope::AllMessages)
            .await
            .unwrap();

        assert!(guard.is_open());
        assert!(guard.release());
        assert!(!guard.release());
        drop(guard);

        assert_eq!(remote.calls(Operation::Unsubscribe), 1);
        assert_eq!(remote.open_subscriptions(), 0);
    }

    #[tokio::test]
    async fn test_drop_releases() {
        let remote = Arc::new(MemoryRemote::new());
        let (guard, _events) = SubscriptionGuard::open(Arc::clone(&remote), Scope::AllMessages)
            .await
            .unwrap();
        drop(guard);

        assert_eq!(remote.open_subscriptions(), 0);
        assert_eq!(remote.calls(Operation::Unsubscribe), 1);
    }

    #[tokio::test]
    async fn test_open_failure_leaves_nothing_open() {
        let remote = Arc::new(MemoryRemote::new());
        remote.set_failing(Operation::Subscribe, true);

        let result = SubscriptionGuard::open(Arc::clone(&remote), Scope::AllMessages).await;
        assert!(result.is_err());
        assert_eq!(remote.open_subscriptions(), 0);
    }
}
