//! MutationDispatchCoordinator - batches mutation notifications per document
//!
//! Any number of `schedule_flush` calls made before the pending pass runs
//! collapse into one microtask. The pass snapshots the registered observers,
//! clears the scheduled flag, then asks the event loop to run each
//! observer's `trigger` one at a time, in registration order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tracing::{debug, info};

use crate::document::EventLoopSource;
use crate::event_loop::{EventLoop, microtask};

use super::metrics::{DispatchCounters, DispatchMetrics};
use super::observer::{ObserverHandle, ObserverId};
use super::registry::ObserverSet;

/// Outcome of a [`MutationDispatchCoordinator::schedule_flush`] call
///
/// None of these is a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// A dispatch microtask was enqueued
    Scheduled,
    /// A dispatch was already pending; nothing new was enqueued
    Coalesced,
    /// No context or no event loop; the notification is dropped
    NoEventLoop,
}

/// Per-document observer registry and flush scheduler
pub struct MutationDispatchCoordinator {
    /// Back-reference to the owning document; never upgraded for longer than a call
    source: Weak<dyn EventLoopSource>,
    observers: Mutex<ObserverSet>,
    scheduled: AtomicBool,
    counters: DispatchCounters,
}

impl MutationDispatchCoordinator {
    /// Create a coordinator bound to the given event loop source
    pub fn new(source: Weak<dyn EventLoopSource>) -> Arc<Self> {
        debug!("MutationDispatchCoordinator::new: called");
        Arc::new(Self {
            source,
            observers: Mutex::new(ObserverSet::new()),
            scheduled: AtomicBool::new(false),
            counters: DispatchCounters::default(),
        })
    }

    /// Register an observer; returns false if it was already registered
    pub fn register(&self, observer: &ObserverHandle) -> bool {
        debug!(observer = %observer.id(), "MutationDispatchCoordinator::register: called");
        self.lock_observers().insert(observer)
    }

    /// Unregister an observer; returns false if it was not registered
    ///
    /// A pass already in progress keeps its snapshot and still notifies this
    /// observer if it had not reached it yet.
    pub fn unregister(&self, observer: &ObserverHandle) -> bool {
        debug!(observer = %observer.id(), "MutationDispatchCoordinator::unregister: called");
        self.lock_observers().remove(observer.id())
    }

    /// Registered observers in notification order
    pub fn observers(&self) -> Vec<ObserverId> {
        self.lock_observers().ids()
    }

    /// Whether a dispatch microtask is queued and has not started yet
    pub fn is_scheduled(&self) -> bool {
        self.scheduled.load(Ordering::SeqCst)
    }

    pub fn metrics(&self) -> DispatchMetrics {
        self.counters.snapshot()
    }

    /// Make sure a notification pass runs on a later microtask turn
    pub fn schedule_flush(self: &Arc<Self>) -> ScheduleOutcome {
        debug!("MutationDispatchCoordinator::schedule_flush: called");
        DispatchCounters::bump(&self.counters.flush_requests);

        if self.is_scheduled() {
            debug!("MutationDispatchCoordinator::schedule_flush: already scheduled, coalescing");
            DispatchCounters::bump(&self.counters.coalesced);
            return ScheduleOutcome::Coalesced;
        }

        let Some(event_loop) = self.resolve_event_loop() else {
            debug!("MutationDispatchCoordinator::schedule_flush: no event loop, dropping");
            DispatchCounters::bump(&self.counters.dropped_no_loop);
            return ScheduleOutcome::NoEventLoop;
        };

        if self
            .scheduled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("MutationDispatchCoordinator::schedule_flush: lost race to another scheduler, coalescing");
            DispatchCounters::bump(&self.counters.coalesced);
            return ScheduleOutcome::Coalesced;
        }

        let this = Arc::clone(self);
        if let Err(e) = event_loop.enqueue(microtask(move || this.dispatch())) {
            // Loop closed between lookup and enqueue: same as having no loop.
            debug!(error = %e, "MutationDispatchCoordinator::schedule_flush: enqueue rejected, dropping");
            self.scheduled.store(false, Ordering::SeqCst);
            DispatchCounters::bump(&self.counters.dropped_no_loop);
            return ScheduleOutcome::NoEventLoop;
        }

        debug!("MutationDispatchCoordinator::schedule_flush: dispatch enqueued");
        ScheduleOutcome::Scheduled
    }

    /// The deferred notification pass
    ///
    /// The flag is cleared right after the snapshot is taken, whether or not
    /// the event loop is still reachable, so a detached document never
    /// leaves the coordinator stuck in the scheduled state.
    pub async fn dispatch(self: Arc<Self>) {
        debug!("MutationDispatchCoordinator::dispatch: called");
        let snapshot = self.lock_observers().snapshot();
        self.scheduled.store(false, Ordering::SeqCst);

        let Some(event_loop) = self.resolve_event_loop() else {
            debug!("MutationDispatchCoordinator::dispatch: no event loop, aborting pass");
            DispatchCounters::bump(&self.counters.aborted_passes);
            return;
        };

        DispatchCounters::bump(&self.counters.passes);
        debug!(observers = snapshot.len(), "MutationDispatchCoordinator::dispatch: notifying");

        // Failure isolation for `trigger` is decided by the event loop's
        // execute contract, not here.
        for (id, observer) in snapshot {
            debug!(observer = %id, "MutationDispatchCoordinator::dispatch: triggering");
            let result = event_loop.execute(Box::new(move || observer.trigger())).await;

            if let Err(e) = result {
                info!(observer = %id, error = %e, "Event loop went away mid-pass, abandoning remaining observers");
                DispatchCounters::bump(&self.counters.aborted_passes);
                return;
            }
            DispatchCounters::bump(&self.counters.notifications);
        }

        debug!("MutationDispatchCoordinator::dispatch: pass complete");
    }

    fn resolve_event_loop(&self) -> Option<Arc<dyn EventLoop>> {
        self.source.upgrade()?.event_loop()
    }

    fn lock_observers(&self) -> MutexGuard<'_, ObserverSet> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
