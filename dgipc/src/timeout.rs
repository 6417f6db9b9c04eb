//! Timeout manager: one-shot deadline callbacks with cancel/extend and
//! bilateral request/response pairing (spec §4.4).
//!
//! A single background task drives every registered deadline from a
//! min-heap ordered by `(Instant, sequence)`, so ties are broken by
//! registration order. Extension is implemented by lazy deletion: the
//! entry's live deadline is updated in place and a fresh heap entry is
//! pushed; a popped heap entry whose deadline no longer matches the
//! entry's current deadline is a stale duplicate and is silently dropped.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Notify;
use tokio::time::Instant;

type Callback = Box<dyn FnOnce(&str) + Send>;

struct Entry {
    deadline: Instant,
    callback: std::sync::Mutex<Option<Callback>>,
}

struct Inner {
    label: String,
    entries: DashMap<String, Entry>,
    heap: std::sync::Mutex<BinaryHeap<Reverse<(Instant, u64, String)>>>,
    notify: Notify,
    sequence: AtomicU64,
    fired_total: AtomicU64,
    cancelled_total: AtomicU64,
}

/// Aggregate counters over a [`TimeoutManager`]'s lifetime (spec §4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutStatistics {
    /// Diagnostic label identifying which queue these counters belong to
    /// (e.g. `"client"`, `"server"`), so logs and metrics dashboards can
    /// tell multiple managers in the same process apart.
    pub queue: String,
    /// Deadlines currently registered and not yet fired or cancelled.
    pub active: usize,
    /// Deadlines that have fired since construction.
    pub fired_total: u64,
    /// Deadlines cancelled before firing, since construction.
    pub cancelled_total: u64,
}

/// Drives registered deadlines and invokes callbacks when they elapse.
///
/// Must be constructed from within a running Tokio runtime, since
/// construction spawns the background scheduler task.
pub struct TimeoutManager {
    inner: Arc<Inner>,
}

impl TimeoutManager {
    /// Creates a manager labelled `"default"` and spawns its background
    /// scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::with_label("default")
    }

    /// Creates a manager identified by `label` in its [`TimeoutStatistics`]
    /// (spec §4.4 "diagnostic queue label") and spawns its background
    /// scheduler.
    #[must_use]
    pub fn with_label(label: impl Into<String>) -> Self {
        let inner = Arc::new(Inner {
            label: label.into(),
            entries: DashMap::new(),
            heap: std::sync::Mutex::new(BinaryHeap::new()),
            notify: Notify::new(),
            sequence: AtomicU64::new(0),
            fired_total: AtomicU64::new(0),
            cancelled_total: AtomicU64::new(0),
        });
        tokio::spawn(run_scheduler(inner.clone()));
        Self { inner }
    }

    /// Registers a one-shot deadline. `on_timeout` receives `id` and runs
    /// on the scheduler task if the deadline elapses before cancellation.
    pub fn register(
        &self,
        id: impl Into<String>,
        duration: Duration,
        on_timeout: impl FnOnce(&str) + Send + 'static,
    ) {
        self.register_inner(id.into(), duration, Box::new(on_timeout));
    }

    /// Registers a one-shot deadline whose preconditions are validated
    /// up front (spec §4.4: `seconds > 0`, `id` non-empty). On an invalid
    /// precondition, `on_error` runs asynchronously on the scheduler task
    /// and the deadline is never registered; otherwise `on_timeout` fires
    /// exactly like [`TimeoutManager::register`].
    pub fn register_with_error_handling(
        &self,
        id: impl Into<String>,
        duration: Duration,
        on_timeout: impl FnOnce(&str) + Send + 'static,
        on_error: impl FnOnce(String) + Send + 'static,
    ) {
        let id = id.into();
        if id.is_empty() {
            tokio::spawn(async move { on_error("id must not be empty".to_string()) });
            return;
        }
        if duration.is_zero() {
            tokio::spawn(async move { on_error("seconds must be greater than zero".to_string()) });
            return;
        }
        self.register_inner(id, duration, Box::new(on_timeout));
    }

    /// Registers paired request/response deadlines sharing `base_id`, keyed
    /// `"{base_id}-request"` and `"{base_id}-response"` (spec §4.4
    /// "bilateral timeout pairs"). The two sides may carry distinct
    /// durations and callbacks; cancelling one side does not cancel the
    /// other — use [`TimeoutManager::cancel_bilateral`] for that.
    pub fn register_bilateral(
        &self,
        base_id: &str,
        request_timeout: Duration,
        response_timeout: Duration,
        on_request_fire: impl FnOnce(&str) + Send + 'static,
        on_response_fire: impl FnOnce(&str) + Send + 'static,
    ) {
        self.register(
            format!("{base_id}-request"),
            request_timeout,
            on_request_fire,
        );
        self.register(
            format!("{base_id}-response"),
            response_timeout,
            on_response_fire,
        );
    }

    /// Cancels both sides of a bilateral pair registered under `base_id`.
    /// Returns how many sides were still active (0, 1, or 2).
    pub fn cancel_bilateral(&self, base_id: &str) -> usize {
        let req = usize::from(self.cancel(&format!("{base_id}-request")));
        let resp = usize::from(self.cancel(&format!("{base_id}-response")));
        req + resp
    }

    /// Cancels a registered deadline before it fires. Returns `true` if it
    /// was still active (a cancelled-then-cancelled-again or already-fired
    /// id returns `false`, and never invokes the callback).
    pub fn cancel(&self, id: &str) -> bool {
        if let Some((_, entry)) = self.inner.entries.remove(id) {
            // Dropping the callback without calling it is the cancellation;
            // the stale heap entry is skipped by the scheduler when popped.
            drop(entry);
            self.inner.cancelled_total.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Extends an active deadline by `additional`, measured from the
    /// deadline's current remaining time — i.e. the new deadline is
    /// `now + remaining + additional`, not `old_deadline + additional`, so
    /// a nearly-elapsed deadline still gets the full extra duration.
    /// Returns `true` if the id was active.
    pub fn extend(&self, id: &str, additional: Duration) -> bool {
        let Some(mut entry) = self.inner.entries.get_mut(id) else {
            return false;
        };
        let now = Instant::now();
        let remaining = entry.deadline.saturating_duration_since(now);
        let new_deadline = now + remaining + additional;
        entry.deadline = new_deadline;
        drop(entry);

        let seq = self.inner.sequence.fetch_add(1, Ordering::Relaxed);
        self.inner
            .heap
            .lock()
            .unwrap()
            .push(Reverse((new_deadline, seq, id.to_string())));
        self.inner.notify.notify_one();
        true
    }

    /// Number of deadlines currently registered and pending.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.entries.len()
    }

    /// Aggregate counters since construction.
    #[must_use]
    pub fn statistics(&self) -> TimeoutStatistics {
        TimeoutStatistics {
            queue: self.inner.label.clone(),
            active: self.inner.entries.len(),
            fired_total: self.inner.fired_total.load(Ordering::Relaxed),
            cancelled_total: self.inner.cancelled_total.load(Ordering::Relaxed),
        }
    }

    fn register_inner(&self, id: String, duration: Duration, callback: Callback) {
        let deadline = Instant::now() + duration;
        let seq = self.inner.sequence.fetch_add(1, Ordering::Relaxed);
        self.inner.entries.insert(
            id.clone(),
            Entry {
                deadline,
                callback: std::sync::Mutex::new(Some(callback)),
            },
        );
        self.inner
            .heap
            .lock()
            .unwrap()
            .push(Reverse((deadline, seq, id)));
        self.inner.notify.notify_one();
    }
}

impl Default for TimeoutManager {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_scheduler(inner: Arc<Inner>) {
    loop {
        let next = { inner.heap.lock().unwrap().peek().map(|Reverse((d, _, _))| *d) };

        match next {
            None => inner.notify.notified().await,
            Some(deadline) => {
                tokio::select! {
                    () = tokio::time::sleep_until(deadline) => {
                        fire_due(&inner, deadline);
                    }
                    () = inner.notify.notified() => {}
                }
            }
        }
    }
}

fn fire_due(inner: &Arc<Inner>, _deadline: Instant) {
    let now = Instant::now();
    loop {
        let popped = {
            let mut heap = inner.heap.lock().unwrap();
            match heap.peek() {
                Some(Reverse((d, _, _))) if *d <= now => heap.pop(),
                _ => None,
            }
        };
        let Some(Reverse((deadline, _seq, id))) = popped else {
            break;
        };

        let Some((_, entry)) = inner.entries.remove_if(&id, |_, e| e.deadline == deadline) else {
            // Stale entry (cancelled, or superseded by an extension) — skip.
            continue;
        };

        if let Some(callback) = entry.callback.lock().unwrap().take() {
            inner.fired_total.fetch_add(1, Ordering::Relaxed);
            callback(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn fires_callback_after_duration_elapses() {
        let mgr = TimeoutManager::new();
        let fired = Arc::new(AtomicBool::new(false));
        let fired2 = fired.clone();
        mgr.register("a", StdDuration::from_millis(20), move |_| {
            fired2.store(true, Ordering::SeqCst);
        });
        assert!(!fired.load(Ordering::SeqCst));
        tokio::time::sleep(StdDuration::from_millis(80)).await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancel_before_deadline_prevents_callback() {
        let mgr = TimeoutManager::new();
        let fired = Arc::new(AtomicBool::new(false));
        let fired2 = fired.clone();
        mgr.register("a", StdDuration::from_millis(50), move |_| {
            fired2.store(true, Ordering::SeqCst);
        });
        assert!(mgr.cancel("a"));
        tokio::time::sleep(StdDuration::from_millis(100)).await;
        assert!(!fired.load(Ordering::SeqCst));
        assert!(!mgr.cancel("a"), "cancelling twice should report false");
    }

    #[tokio::test]
    async fn extend_pushes_deadline_out_by_remaining_plus_additional() {
        let mgr = TimeoutManager::new();
        let fired = Arc::new(AtomicBool::new(false));
        let fired2 = fired.clone();
        mgr.register("a", StdDuration::from_millis(30), move |_| {
            fired2.store(true, Ordering::SeqCst);
        });
        assert!(mgr.extend("a", StdDuration::from_millis(100)));
        tokio::time::sleep(StdDuration::from_millis(60)).await;
        assert!(
            !fired.load(Ordering::SeqCst),
            "extension should have pushed the deadline past 60ms"
        );
        tokio::time::sleep(StdDuration::from_millis(100)).await;
        assert!(fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn bilateral_pair_fires_both_sides_independently_with_distinct_durations() {
        let mgr = TimeoutManager::new();
        let fired_ids = Arc::new(std::sync::Mutex::new(Vec::new()));
        let req_ids = fired_ids.clone();
        let resp_ids = fired_ids.clone();
        mgr.register_bilateral(
            "corr-1",
            StdDuration::from_millis(20),
            StdDuration::from_millis(40),
            move |id| req_ids.lock().unwrap().push(id.to_string()),
            move |id| resp_ids.lock().unwrap().push(id.to_string()),
        );
        tokio::time::sleep(StdDuration::from_millis(100)).await;
        let ids = fired_ids.lock().unwrap().clone();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"corr-1-request".to_string()));
        assert!(ids.contains(&"corr-1-response".to_string()));
    }

    #[tokio::test]
    async fn cancel_bilateral_cancels_both_sides_and_counts_them() {
        let mgr = TimeoutManager::new();
        let fired = Arc::new(AtomicBool::new(false));
        let fired2 = fired.clone();
        let fired3 = fired.clone();
        mgr.register_bilateral(
            "corr-2",
            StdDuration::from_millis(30),
            StdDuration::from_millis(30),
            move |_| fired2.store(true, Ordering::SeqCst),
            move |_| fired3.store(true, Ordering::SeqCst),
        );
        assert_eq!(mgr.cancel_bilateral("corr-2"), 2);
        assert_eq!(mgr.cancel_bilateral("corr-2"), 0);
        tokio::time::sleep(StdDuration::from_millis(60)).await;
        assert!(!fired.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn register_with_error_handling_rejects_zero_duration_without_registering() {
        let mgr = TimeoutManager::new();
        let error = Arc::new(std::sync::Mutex::new(None));
        let error2 = error.clone();
        mgr.register_with_error_handling(
            "bad",
            StdDuration::ZERO,
            |_| {},
            move |msg| *error2.lock().unwrap() = Some(msg),
        );
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        assert!(error.lock().unwrap().is_some());
        assert_eq!(mgr.active_count(), 0);
    }

    #[tokio::test]
    async fn register_with_error_handling_rejects_empty_id_without_registering() {
        let mgr = TimeoutManager::new();
        let error = Arc::new(std::sync::Mutex::new(None));
        let error2 = error.clone();
        mgr.register_with_error_handling(
            "",
            StdDuration::from_millis(10),
            |_| {},
            move |msg| *error2.lock().unwrap() = Some(msg),
        );
        tokio::time::sleep(StdDuration::from_millis(20)).await;
        assert!(error.lock().unwrap().is_some());
        assert_eq!(mgr.active_count(), 0);
    }

    #[tokio::test]
    async fn statistics_reflect_fired_and_cancelled_counts() {
        let mgr = TimeoutManager::new();
        mgr.register("will-fire", StdDuration::from_millis(10), |_| {});
        mgr.register("will-cancel", StdDuration::from_millis(500), |_| {});
        mgr.cancel("will-cancel");
        tokio::time::sleep(StdDuration::from_millis(60)).await;
        let stats = mgr.statistics();
        assert_eq!(stats.queue, "default");
        assert_eq!(stats.fired_total, 1);
        assert_eq!(stats.cancelled_total, 1);
        assert_eq!(stats.active, 0);
    }

    #[tokio::test]
    async fn statistics_carry_the_label_given_at_construction() {
        let mgr = TimeoutManager::with_label("server");
        assert_eq!(mgr.statistics().queue, "server");
    }
}
