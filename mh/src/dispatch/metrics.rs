//! Dispatch counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Dispatch metrics for observability
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchMetrics {
    /// Calls to `schedule_flush`
    pub flush_requests: u64,
    /// Calls absorbed by an already scheduled flush
    pub coalesced: u64,
    /// Calls dropped because no event loop was reachable
    pub dropped_no_loop: u64,
    /// Dispatch passes that reached the notify loop
    pub passes: u64,
    /// Passes abandoned because the event loop went away
    pub aborted_passes: u64,
    /// `trigger` executions completed on the event loop
    pub notifications: u64,
}

#[derive(Debug, Default)]
pub(crate) struct DispatchCounters {
    pub flush_requests: AtomicU64,
    pub coalesced: AtomicU64,
    pub dropped_no_loop: AtomicU64,
    pub passes: AtomicU64,
    pub aborted_passes: AtomicU64,
    pub notifications: AtomicU64,
}

impl DispatchCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DispatchMetrics {
        DispatchMetrics {
            flush_requests: self.flush_requests.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            dropped_no_loop: self.dropped_no_loop.load(Ordering::Relaxed),
            passes: self.passes.load(Ordering::Relaxed),
            aborted_passes: self.aborted_passes.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
        }
    }
}
