//! Correlation registry: tracks in-flight requests behind opaque handles
//! (spec §4.5).
//!
//! Callers never see the internal UUID used to key the registry — they
//! receive a [`RequestHandle`] that exposes only the request name and
//! channel id they already know, keeping the correlation id itself an
//! implementation detail a caller cannot smuggle into another request.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

/// An opaque reference to one in-flight request. Cloning shares the
/// underlying registration; dropping all clones does not cancel it — use
/// [`CorrelationRegistry::cancel_one`] explicitly.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    id: Uuid,
    name: Arc<str>,
    channel_id: Arc<str>,
}

impl RequestHandle {
    /// The request name this handle was issued for.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The channel id this handle was issued for.
    #[must_use]
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// The underlying correlation id. Not part of the public API surface
    /// application code is meant to use (spec §4.5: "External API hides
    /// the internal UUID") — visible within the crate only, so the client
    /// can key its own interrupt/timeout bookkeeping off the same id it
    /// handed to the registry instead of minting a second one.
    pub(crate) fn raw_id(&self) -> Uuid {
        self.id
    }
}

/// Internal tracked status of a still-present entry. A reply that arrives
/// (`resolve`) removes the entry outright rather than recording a
/// `Completed` tombstone, matching spec §4.5's "completed means no longer
/// in the registry" — cancellation and timeout, by contrast, leave a
/// tombstone behind so a caller can still observe `status(handle)` after
/// the fact, per the testable property that a cancelled handle reports
/// `cancelled` rather than reverting to unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrackedStatus {
    Pending,
    Cancelled,
    TimedOut,
}

/// Lifecycle state of a tracked request (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    /// Registered, awaiting a reply, cancellation, or timeout.
    Pending,
    /// Resolved by a reply, or never registered in the first place —
    /// the registry does not distinguish the two once the entry is gone.
    Completed,
    /// Cancelled before a reply arrived.
    Cancelled,
    /// Timed out before a reply arrived.
    TimedOut,
}

/// Aggregate counters and timing over a [`CorrelationRegistry`] (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelationStatistics {
    /// Requests registered and still awaiting a reply, cancellation, or
    /// timeout.
    pub total_pending: usize,
    /// Requests resolved (reply received) since construction.
    pub total_resolved: u64,
    /// Mean wall-clock time between registration and resolution, across
    /// every request resolved so far.
    pub average_response_time: Duration,
}

struct Pending {
    name: Arc<str>,
    channel_id: Arc<str>,
    registered_at: Instant,
    status: Mutex<TrackedStatus>,
}

struct Inner {
    pending: DashMap<Uuid, Pending>,
    resolved_count: AtomicU64,
    resolved_total_nanos: AtomicU64,
}

/// Tracks in-flight requests and basic timing statistics.
#[derive(Clone)]
pub struct CorrelationRegistry {
    inner: Arc<Inner>,
}

impl CorrelationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                pending: DashMap::new(),
                resolved_count: AtomicU64::new(0),
                resolved_total_nanos: AtomicU64::new(0),
            }),
        }
    }

    /// Registers a new in-flight request under `id` (the caller's own
    /// correlation id, e.g. the wire request's `id` field) and returns an
    /// opaque handle to it.
    #[must_use]
    pub fn register(
        &self,
        id: Uuid,
        name: impl Into<Arc<str>>,
        channel_id: impl Into<Arc<str>>,
    ) -> RequestHandle {
        let name = name.into();
        let channel_id = channel_id.into();
        self.inner.pending.insert(
            id,
            Pending {
                name: name.clone(),
                channel_id: channel_id.clone(),
                registered_at: Instant::now(),
                status: Mutex::new(TrackedStatus::Pending),
            },
        );
        RequestHandle {
            id,
            name,
            channel_id,
        }
    }

    /// Resolves a handle (reply arrived), recording its response time and
    /// folding it into [`CorrelationStatistics::average_response_time`].
    /// Removes the entry outright. Returns `false` if the handle was
    /// already resolved, cancelled, timed out, or unknown.
    pub fn resolve(&self, handle: &RequestHandle) -> bool {
        let Some((_, pending)) = self.inner.pending.remove(&handle.id) else {
            return false;
        };
        let elapsed = pending.registered_at.elapsed();
        self.inner.resolved_count.fetch_add(1, Ordering::Relaxed);
        self.inner
            .resolved_total_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
        true
    }

    /// Current status of a handle.
    #[must_use]
    pub fn status(&self, handle: &RequestHandle) -> RequestStatus {
        match self.inner.pending.get(&handle.id) {
            Some(entry) => match *entry.status.lock().unwrap() {
                TrackedStatus::Pending => RequestStatus::Pending,
                TrackedStatus::Cancelled => RequestStatus::Cancelled,
                TrackedStatus::TimedOut => RequestStatus::TimedOut,
            },
            None => RequestStatus::Completed,
        }
    }

    /// Cancels one in-flight request without recording a response time.
    /// Returns `true` if it was still pending (a handle already cancelled,
    /// timed out, or resolved returns `false` and is left untouched).
    pub fn cancel_one(&self, handle: &RequestHandle) -> bool {
        self.transition(&handle.id, TrackedStatus::Cancelled)
    }

    /// Marks a handle as timed out. Returns `true` if it was still pending.
    pub fn mark_timed_out(&self, handle: &RequestHandle) -> bool {
        self.transition(&handle.id, TrackedStatus::TimedOut)
    }

    fn transition(&self, id: &Uuid, to: TrackedStatus) -> bool {
        let Some(entry) = self.inner.pending.get(id) else {
            return false;
        };
        let mut status = entry.status.lock().unwrap();
        if *status == TrackedStatus::Pending {
            *status = to;
            true
        } else {
            false
        }
    }

    /// Cancels every still-pending request, returning how many were
    /// transitioned. Already-cancelled, timed-out, or resolved entries are
    /// left untouched and do not count.
    pub fn cancel_all(&self) -> usize {
        let mut count = 0;
        for entry in &self.inner.pending {
            let mut status = entry.status.lock().unwrap();
            if *status == TrackedStatus::Pending {
                *status = TrackedStatus::Cancelled;
                count += 1;
            }
        }
        count
    }

    /// Fully removes a handle's entry, including any cancelled/timed-out
    /// tombstone. Callers invoke this once a terminal status has been
    /// observed and reported, so the registry does not grow unboundedly
    /// over a long-lived client's lifetime.
    pub fn forget(&self, handle: &RequestHandle) -> bool {
        self.inner.pending.remove(&handle.id).is_some()
    }

    /// Snapshot of pending/resolved counters and mean response time.
    #[must_use]
    pub fn statistics(&self) -> CorrelationStatistics {
        let resolved = self.inner.resolved_count.load(Ordering::Relaxed);
        let total_nanos = self.inner.resolved_total_nanos.load(Ordering::Relaxed);
        let average_response_time = if resolved == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(total_nanos / resolved)
        };
        let total_pending = self
            .inner
            .pending
            .iter()
            .filter(|e| *e.status.lock().unwrap() == TrackedStatus::Pending)
            .count();
        CorrelationStatistics {
            total_pending,
            total_resolved: resolved,
            average_response_time,
        }
    }
}

impl Default for CorrelationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
