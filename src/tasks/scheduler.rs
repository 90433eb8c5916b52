//! Refresh Scheduler
//!
//! Owns the background refresh timers. At most one timer of each kind is
//! active per logical key; registering a new one aborts its predecessor.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

// == Timer Kind ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Fires once after a delay
    OneShot,
    /// Fires at a fixed interval until replaced or cancelled
    Recurring,
}

/// Registry key of a timer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TimerId {
    key: String,
    kind: TimerKind,
}

// == Refresh Scheduler ==
/// Registry of per-key background timers.
///
/// Timers are process-local tokio tasks; nothing about them is persisted.
/// Dropping the scheduler aborts every timer.
#[derive(Debug, Default)]
pub struct RefreshScheduler {
    timers: Mutex<HashMap<TimerId, JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    // == Schedule Once ==
    /// Runs `action` once after `delay`, replacing any pending one-shot timer
    /// of `key`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule_once<F, Fut>(&self, key: &str, delay: Duration, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = TimerId {
            key: key.to_string(),
            kind: TimerKind::OneShot,
        };

        let mut timers = self.timers.lock();
        cancel(&mut timers, &id);

        debug!("Scheduling one-shot refresh of '{}' in {:?}", key, delay);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action().await;
        });
        timers.insert(id, handle);
    }

    // == Schedule Recurring ==
    /// Runs `action` every `interval` (first run after one interval),
    /// replacing any recurring timer of `key`.
    ///
    /// `interval` must be non-zero. Must be called from within a tokio runtime.
    pub fn schedule_recurring<F, Fut>(&self, key: &str, interval: Duration, action: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = TimerId {
            key: key.to_string(),
            kind: TimerKind::Recurring,
        };

        let mut timers = self.timers.lock();
        cancel(&mut timers, &id);

        debug!("Scheduling recurring refresh of '{}' every {:?}", key, interval);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Skip the first tick (immediate)
            ticker.tick().await;

            loop {
                ticker.tick().await;
                action().await;
            }
        });
        timers.insert(id, handle);
    }

    // == Introspection ==
    /// Returns true if a timer of `kind` is pending or running for `key`.
    pub fn is_active(&self, key: &str, kind: TimerKind) -> bool {
        let id = TimerId {
            key: key.to_string(),
            kind,
        };
        self.timers
            .lock()
            .get(&id)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Returns the number of timers still pending or running.
    pub fn active_count(&self) -> usize {
        self.timers
            .lock()
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    // == Cancel All ==
    /// Aborts every timer. Returns how many were still active.
    pub fn cancel_all(&self) -> usize {
        let mut timers = self.timers.lock();
        let active = timers.values().filter(|h| !h.is_finished()).count();
        for (_, handle) in timers.drain() {
            handle.abort();
        }
        active
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        for (_, handle) in self.timers.get_mut().drain() {
            handle.abort();
        }
    }
}

fn cancel(timers: &mut HashMap<TimerId, JoinHandle<()>>, id: &TimerId) {
    if let Some(previous) = timers.remove(id) {
        if !previous.is_finished() {
            debug!("Cancelling previous {:?} timer of '{}'", id.kind, id.key);
        }
        previous.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_action(counter: &Arc<AtomicUsize>) -> impl Fn() -> std::future::Ready<()> {
        let counter = counter.clone();
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test]
    async fn test_one_shot_fires_once() {
        let scheduler = RefreshScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler.schedule_once("k", Duration::from_millis(50), counting_action(&counter));
        assert!(scheduler.is_active("k", TimerKind::OneShot));

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_active("k", TimerKind::OneShot));
    }

    #[tokio::test]
    async fn test_one_shot_replacement_cancels_previous() {
        let scheduler = RefreshScheduler::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        scheduler.schedule_once("k", Duration::from_millis(100), counting_action(&first));
        scheduler.schedule_once("k", Duration::from_millis(100), counting_action(&second));
        assert_eq!(scheduler.active_count(), 1);

        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recurring_fires_repeatedly() {
        let scheduler = RefreshScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler.schedule_recurring("k", Duration::from_millis(50), counting_action(&counter));

        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(counter.load(Ordering::SeqCst) >= 3);
        assert!(scheduler.is_active("k", TimerKind::Recurring));
        scheduler.cancel_all();
    }

    #[tokio::test]
    async fn test_recurring_replacement_keeps_single_timer() {
        let scheduler = RefreshScheduler::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        scheduler.schedule_recurring("k", Duration::from_millis(50), counting_action(&first));
        scheduler.schedule_recurring("k", Duration::from_millis(50), counting_action(&second));
        assert_eq!(scheduler.active_count(), 1);

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert!(second.load(Ordering::SeqCst) >= 2);
        scheduler.cancel_all();
    }

    #[tokio::test]
    async fn test_kinds_and_keys_are_independent() {
        let scheduler = RefreshScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler.schedule_once("a", Duration::from_secs(60), counting_action(&counter));
        scheduler.schedule_recurring("a", Duration::from_secs(60), counting_action(&counter));
        scheduler.schedule_recurring("b", Duration::from_secs(60), counting_action(&counter));

        assert!(scheduler.is_active("a", TimerKind::OneShot));
        assert!(scheduler.is_active("a", TimerKind::Recurring));
        assert!(scheduler.is_active("b", TimerKind::Recurring));
        assert!(!scheduler.is_active("b", TimerKind::OneShot));
        assert_eq!(scheduler.active_count(), 3);
    }

    #[tokio::test]
    async fn test_cancel_all_aborts_timers() {
        let scheduler = RefreshScheduler::new();
        let counter = Arc::new(AtomicUsize::new(0));

        scheduler.schedule_recurring("k", Duration::from_millis(50), counting_action(&counter));
        assert_eq!(scheduler.cancel_all(), 1);

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.active_count(), 0);
    }
}
