//! Single-slot debounce timer.
//!
//! Each [`Debouncer::schedule`] aborts whatever is still waiting in the slot
//! and spawns a fresh delayed task, so at most one fire is ever pending.
//! Once the window elapses the action is detached from the slot: a later
//! `schedule` or `cancel` never aborts an action that has started.

use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Cancellable delayed task with a single slot.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    slot: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            slot: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Run `action` once the window elapses with no further calls.
    ///
    /// Returns true if a still-waiting action was superseded.
    pub fn schedule<F>(&self, action: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let window = self.window;
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);

        let superseded = slot.take().map(abort_pending).unwrap_or(false);
        *slot = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            tokio::spawn(action);
        }));

        superseded
    }

    /// Drop the pending fire, if any. Safe to call repeatedly.
    ///
    /// Returns true if a still-waiting action was cancelled. An action that
    /// already started runs to completion.
    pub fn cancel(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(abort_pending)
            .unwrap_or(false)
    }

    /// Whether an action is waiting for its window to elapse.
    pub fn is_pending(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn abort_pending(handle: JoinHandle<()>) -> bool {
    let pending = !handle.is_finished();
    handle.abort();
    pending
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter_action(count: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let count = Arc::clone(count);
        async move {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_into_one_fire() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let fired = Arc::new(AtomicUsize::new(0));

        assert!(!debouncer.schedule(counter_action(&fired)));
        for _ in 0..4 {
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(debouncer.schedule(counter_action(&fired)));
        }

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_windows_fire_separately() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let fired = Arc::new(AtomicUsize::new(0));

        debouncer.schedule(counter_action(&fired));
        tokio::time::sleep(Duration::from_millis(150)).await;
        debouncer.schedule(counter_action(&fired));
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_started_action_survives_reschedule_and_cancel() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let fired = Arc::new(AtomicUsize::new(0));

        let slow = |count: &Arc<AtomicUsize>| {
            let count = Arc::clone(count);
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                count.fetch_add(1, Ordering::SeqCst);
            }
        };

        debouncer.schedule(slow(&fired));
        tokio::time::sleep(Duration::from_millis(110)).await;
        assert!(!debouncer.is_pending());

        // The first action is mid-flight; neither call may abort it.
        assert!(!debouncer.schedule(slow(&fired)));
        assert!(debouncer.cancel());
        tokio::time::sleep(Duration::from_millis(110)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let debouncer = Debouncer::new(Duration::from_millis(100));
        let fired = Arc::new(AtomicUsize::new(0));

        debouncer.schedule(counter_action(&fired));
        assert!(debouncer.is_pending());
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
