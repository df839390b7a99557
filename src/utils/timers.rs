//! # Timer Bag
//!
//! Session-scoped repeating timers.
//!
//! Every interval a plugin schedules through a session is registered here so
//! teardown can cancel all of them in one place. The bag closes exactly
//! once: after `close()` the handles are drained and aborted, and any late
//! registration is aborted on the spot instead of leaking a task.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Identifies one scheduled interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

struct TimerBagInner {
    /// `None` once the bag has been closed
    timers: Option<HashMap<TimerId, JoinHandle<()>>>,
    next_id: u64,
}

/// Owned collection of a session's repeating timers
pub struct TimerBag {
    inner: Mutex<TimerBagInner>,
}

impl TimerBag {
    /// Create an open, empty bag
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TimerBagInner {
                timers: Some(HashMap::new()),
                next_id: 0,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TimerBagInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Schedule a repeating callback. The first invocation happens one full
    /// period after registration.
    pub fn set_interval<F, Fut>(&self, period: Duration, f: F) -> TimerId
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // interval() fires immediately; swallow that first tick
            ticker.tick().await;
            loop {
                ticker.tick().await;
                f().await;
            }
        });

        let mut inner = self.lock();
        let id = TimerId(inner.next_id);
        inner.next_id += 1;

        match inner.timers.as_mut() {
            Some(timers) => {
                timers.insert(id, handle);
            }
            None => {
                // Registered after teardown
                debug!("interval scheduled on a closed bag; aborting");
                handle.abort();
            }
        }

        id
    }

    /// Cancel one interval. Returns `true` when it was still scheduled.
    pub fn clear(&self, id: TimerId) -> bool {
        let mut inner = self.lock();
        match inner.timers.as_mut().and_then(|timers| timers.remove(&id)) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    /// Number of live intervals
    pub fn len(&self) -> usize {
        self.lock().timers.as_ref().map_or(0, HashMap::len)
    }

    /// Whether no intervals are scheduled
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Abort every scheduled interval. Idempotent; only the first call
    /// drains the bag.
    pub fn close(&self) {
        let taken = self.lock().timers.take();
        if let Some(timers) = taken {
            let count = timers.len();
            for handle in timers.into_values() {
                handle.abort();
            }
            if count > 0 {
                debug!(cancelled = count, "session timers cancelled");
            }
        }
    }
}

impl Default for TimerBag {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TimerBag {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_interval_fires_until_cleared() {
        let bag = TimerBag::new();
        let ticks = Arc::new(AtomicU64::new(0));

        let counter = Arc::clone(&ticks);
        let id = bag.set_interval(Duration::from_millis(10), move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_millis(55)).await;
        assert!(bag.clear(id));
        let seen = ticks.load(Ordering::SeqCst);
        assert!(seen >= 2, "expected at least 2 ticks, saw {seen}");

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn test_close_cancels_everything_once() {
        let bag = TimerBag::new();
        let ticks = Arc::new(AtomicU64::new(0));

        for _ in 0..3 {
            let counter = Arc::clone(&ticks);
            bag.set_interval(Duration::from_millis(5), move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                }
            });
        }
        assert_eq!(bag.len(), 3);

        bag.close();
        bag.close();
        assert!(bag.is_empty());

        let seen = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn test_clear_unknown_id_is_noop() {
        let bag = TimerBag::new();
        let id = bag.set_interval(Duration::from_secs(60), || async {});
        assert!(bag.clear(id));
        assert!(!bag.clear(id));
    }
}
