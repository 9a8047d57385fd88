//! RecordQueueObserver - an observer that buffers records between flushes
//!
//! Mutation producers push records with `enqueue_record` and then ask the
//! document to queue a flush. On `trigger` the buffered records are handed
//! to the callback in one batch. Record contents are opaque here.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::dispatch::MutationObserver;

type RecordCallback<R> = Box<dyn Fn(Vec<R>) -> eyre::Result<()> + Send + Sync>;

/// Observer that batches records and delivers them on trigger
pub struct RecordQueueObserver<R> {
    records: Mutex<Vec<R>>,
    callback: RecordCallback<R>,
    deliveries: AtomicU64,
}

impl<R: Send + 'static> RecordQueueObserver<R> {
    pub fn new<F>(callback: F) -> Arc<Self>
    where
        F: Fn(Vec<R>) -> eyre::Result<()> + Send + Sync + 'static,
    {
        Arc::new(Self {
            records: Mutex::new(Vec::new()),
            callback: Box::new(callback),
            deliveries: AtomicU64::new(0),
        })
    }

    /// Buffer a record for the next delivery
    pub fn enqueue_record(&self, record: R) {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).push(record);
    }

    /// Drain buffered records without invoking the callback
    pub fn take_records(&self) -> Vec<R> {
        std::mem::take(&mut *self.records.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Number of records waiting for delivery
    pub fn pending(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Number of non-empty batches delivered so far
    pub fn deliveries(&self) -> u64 {
        self.deliveries.load(Ordering::Relaxed)
    }
}

impl<R: Send + 'static> MutationObserver for RecordQueueObserver<R> {
    fn trigger(&self) -> eyre::Result<()> {
        // The lock is released before the callback runs, so the callback may
        // enqueue further records.
        let records = self.take_records();
        if records.is_empty() {
            debug!("RecordQueueObserver::trigger: nothing pending");
            return Ok(());
        }

        debug!(count = records.len(), "RecordQueueObserver::trigger: delivering");
        self.deliveries.fetch_add(1, Ordering::Relaxed);
        (self.callback)(records)
    }
}

impl<R> fmt::Debug for RecordQueueObserver<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordQueueObserver")
            .field("deliveries", &self.deliveries.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
