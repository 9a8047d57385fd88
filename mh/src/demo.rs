//! End-to-end demo scenario used by `mh demo`
//!
//! Builds a document on a fresh [`MicrotaskQueue`], registers record-queue
//! observers, queues a burst of mutations per round and lets the loop settle.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use eyre::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::DemoConfig;
use crate::dispatch::{DispatchMetrics, ScheduleOutcome};
use crate::document::{BrowsingContext, Document};
use crate::event_loop::{EventLoopConfig, LoopStats, MicrotaskQueue};
use crate::records::RecordQueueObserver;

/// Per-observer delivery summary
#[derive(Debug, Clone, Serialize)]
pub struct ObserverReport {
    pub name: String,
    pub deliveries: u64,
    pub records: usize,
}

/// Outcome of a demo run
#[derive(Debug, Clone, Serialize)]
pub struct DemoReport {
    pub rounds: usize,
    #[serde(rename = "mutations-per-round")]
    pub mutations_per_round: usize,
    pub scheduled: usize,
    pub coalesced: usize,
    pub observers: Vec<ObserverReport>,
    pub dispatch: DispatchMetrics,
    #[serde(rename = "event-loop-name")]
    pub event_loop_name: String,
    #[serde(rename = "event-loop")]
    pub event_loop: LoopStats,
}

/// Run the demo scenario on a new event loop
pub async fn run_demo(demo: &DemoConfig, loop_config: &EventLoopConfig) -> Result<DemoReport> {
    debug!(?demo, "run_demo: called");
    let queue = MicrotaskQueue::spawn(loop_config.clone());
    let context = Arc::new(BrowsingContext::new().with_event_loop(queue.clone()));
    let document = Document::with_context(context);
    info!(document = %document.id(), observers = demo.observers, "Demo document ready");

    let received: Vec<Arc<AtomicUsize>> = (0..demo.observers).map(|_| Arc::new(AtomicUsize::new(0))).collect();
    let observers: Vec<Arc<RecordQueueObserver<String>>> = received
        .iter()
        .map(|count| {
            let count = count.clone();
            RecordQueueObserver::new(move |records: Vec<String>| {
                count.fetch_add(records.len(), Ordering::Relaxed);
                Ok(())
            })
        })
        .collect();
    for observer in &observers {
        document.observe(observer);
    }

    let mut scheduled = 0;
    let mut coalesced = 0;
    for round in 0..demo.rounds {
        debug!(round, "run_demo: queueing mutations");
        for mutation in 0..demo.mutations_per_round {
            for observer in &observers {
                observer.enqueue_record(format!("round {round} mutation {mutation}"));
            }
            match document.queue_mutation() {
                ScheduleOutcome::Scheduled => scheduled += 1,
                ScheduleOutcome::Coalesced => coalesced += 1,
                ScheduleOutcome::NoEventLoop => {}
            }
        }
        queue.settle().await.context("Event loop stopped during demo")?;
    }

    let report = DemoReport {
        rounds: demo.rounds,
        mutations_per_round: demo.mutations_per_round,
        scheduled,
        coalesced,
        observers: observers
            .iter()
            .zip(&received)
            .enumerate()
            .map(|(i, (observer, count))| ObserverReport {
                name: format!("observer-{}", i + 1),
                deliveries: observer.deliveries(),
                records: count.load(Ordering::Relaxed),
            })
            .collect(),
        dispatch: document.mutations().metrics(),
        event_loop_name: queue.name().to_string(),
        event_loop: queue.stats(),
    };

    queue.shutdown();
    info!(dispatch = ?report.dispatch, "Demo finished");
    Ok(report)
}
