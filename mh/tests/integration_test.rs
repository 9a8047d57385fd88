//! Integration tests for mutation-host
//!
//! These run documents against the real tokio-backed microtask loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use mutation_host::{
    BrowsingContext, Document, EventLoop, EventLoopConfig, MicrotaskQueue, MutationObserver, ObserverHandle,
    RecordQueueObserver, ScheduleOutcome, microtask,
};
use proptest::prelude::*;

type Log = Arc<Mutex<Vec<String>>>;

/// Appends its name to a shared log when triggered
struct Named {
    name: String,
    log: Log,
}

impl MutationObserver for Named {
    fn trigger(&self) -> eyre::Result<()> {
        self.log.lock().unwrap().push(self.name.clone());
        Ok(())
    }
}

fn named(name: &str, log: &Log) -> Arc<Named> {
    Arc::new(Named {
        name: name.to_string(),
        log: log.clone(),
    })
}

fn attached_document() -> (Arc<MicrotaskQueue>, Arc<Document>) {
    let queue = MicrotaskQueue::spawn(EventLoopConfig::default());
    let context = Arc::new(BrowsingContext::new().with_event_loop(queue.clone()));
    (queue, Document::with_context(context))
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

// =============================================================================
// Delivery Tests
// =============================================================================

#[tokio::test]
async fn test_three_mutations_one_pass() {
    let (queue, doc) = attached_document();
    let log = Log::default();
    let a = named("a", &log);
    let b = named("b", &log);
    doc.observe(&a);
    doc.observe(&b);

    assert_eq!(doc.queue_mutation(), ScheduleOutcome::Scheduled);
    assert_eq!(doc.queue_mutation(), ScheduleOutcome::Coalesced);
    assert_eq!(doc.queue_mutation(), ScheduleOutcome::Coalesced);
    assert!(entries(&log).is_empty(), "observers must not run synchronously");

    queue.settle().await.unwrap();

    assert_eq!(entries(&log), vec!["a", "b"]);
    assert!(!doc.mutations().is_scheduled());
    let metrics = doc.mutations().metrics();
    assert_eq!(metrics.passes, 1);
    assert_eq!(metrics.notifications, 2);
}

#[tokio::test]
async fn test_dispatch_respects_microtask_fifo() {
    let (queue, doc) = attached_document();
    let log = Log::default();
    let a = named("a", &log);
    doc.observe(&a);

    let before = log.clone();
    queue
        .enqueue(microtask(move || async move {
            before.lock().unwrap().push("before".to_string());
        }))
        .unwrap();
    doc.queue_mutation();
    let after = log.clone();
    queue
        .enqueue(microtask(move || async move {
            after.lock().unwrap().push("after".to_string());
        }))
        .unwrap();

    queue.settle().await.unwrap();
    assert_eq!(entries(&log), vec!["before", "a", "after"]);
}

/// Registers a late observer the first time it is triggered
struct Recruiter {
    doc: Arc<Document>,
    recruit: Arc<Named>,
    done: AtomicBool,
    log: Log,
}

impl MutationObserver for Recruiter {
    fn trigger(&self) -> eyre::Result<()> {
        self.log.lock().unwrap().push("recruiter".to_string());
        if !self.done.swap(true, Ordering::SeqCst) {
            self.doc.observe(&self.recruit);
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_observer_registered_mid_pass_waits_for_next_pass() {
    let (queue, doc) = attached_document();
    let log = Log::default();
    let recruiter = Arc::new(Recruiter {
        doc: doc.clone(),
        recruit: named("recruit", &log),
        done: AtomicBool::new(false),
        log: log.clone(),
    });
    doc.observe(&recruiter);

    doc.queue_mutation();
    queue.settle().await.unwrap();
    assert_eq!(entries(&log), vec!["recruiter"]);

    doc.queue_mutation();
    queue.settle().await.unwrap();
    assert_eq!(entries(&log), vec!["recruiter", "recruiter", "recruit"]);
}

/// Performs a mutation of its own the first time it is triggered
struct Echo {
    doc: Arc<Document>,
    echoed: AtomicBool,
    log: Log,
}

impl MutationObserver for Echo {
    fn trigger(&self) -> eyre::Result<()> {
        self.log.lock().unwrap().push("echo".to_string());
        if !self.echoed.swap(true, Ordering::SeqCst) {
            let outcome = self.doc.queue_mutation();
            assert_eq!(outcome, ScheduleOutcome::Scheduled, "flag must be clear while notifying");
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_mutation_from_observer_schedules_new_pass() {
    let (queue, doc) = attached_document();
    let log = Log::default();
    let echo = Arc::new(Echo {
        doc: doc.clone(),
        echoed: AtomicBool::new(false),
        log: log.clone(),
    });
    doc.observe(&echo);

    doc.queue_mutation();
    queue.settle().await.unwrap();
    // the nested pass was enqueued behind the first settle marker
    queue.settle().await.unwrap();

    assert_eq!(entries(&log), vec!["echo", "echo"]);
    assert_eq!(doc.mutations().metrics().passes, 2);
    assert!(!doc.mutations().is_scheduled());
}

#[tokio::test]
async fn test_unregistered_before_dispatch_is_skipped() {
    let (queue, doc) = attached_document();
    let log = Log::default();
    let a = named("a", &log);
    let b = named("b", &log);
    let c = named("c", &log);
    doc.observe(&a);
    let hb = doc.observe(&b);
    doc.observe(&c);

    doc.queue_mutation();
    assert!(doc.mutations().unregister(&hb));
    queue.settle().await.unwrap();

    assert_eq!(entries(&log), vec!["a", "c"]);
}

/// Always fails
struct Broken;

impl MutationObserver for Broken {
    fn trigger(&self) -> eyre::Result<()> {
        Err(eyre::eyre!("observer failure"))
    }
}

#[tokio::test]
async fn test_failing_observer_does_not_skip_later_ones() {
    let (queue, doc) = attached_document();
    let log = Log::default();
    let broken = Arc::new(Broken);
    let after = named("after", &log);
    doc.observe(&broken);
    doc.observe(&after);

    doc.queue_mutation();
    queue.settle().await.unwrap();

    assert_eq!(entries(&log), vec!["after"]);
    assert_eq!(queue.stats().actions_failed, 1);
    assert_eq!(doc.mutations().metrics().notifications, 2);
}

/// Panics every time it is triggered
struct Panicking;

impl MutationObserver for Panicking {
    fn trigger(&self) -> eyre::Result<()> {
        panic!("observer panicked");
    }
}

#[tokio::test]
async fn test_panicking_observer_leaves_shared_loop_usable() {
    let queue = MicrotaskQueue::spawn(EventLoopConfig::default());
    let context = Arc::new(BrowsingContext::new().with_event_loop(queue.clone()));
    let first = Document::with_context(context.clone());
    let second = Document::with_context(context);
    let log = Log::default();

    let panicking = Arc::new(Panicking);
    let after = named("first:after", &log);
    let other = named("second", &log);
    first.observe(&panicking);
    first.observe(&after);
    second.observe(&other);

    assert_eq!(first.queue_mutation(), ScheduleOutcome::Scheduled);
    assert_eq!(second.queue_mutation(), ScheduleOutcome::Scheduled);
    queue.settle().await.unwrap();

    assert_eq!(entries(&log), vec!["first:after", "second"]);
    assert!(!first.mutations().is_scheduled());
    assert!(!second.mutations().is_scheduled());
    assert_eq!(queue.stats().actions_failed, 1);

    // both coordinators keep scheduling on the same loop
    assert_eq!(first.queue_mutation(), ScheduleOutcome::Scheduled);
    assert_eq!(second.queue_mutation(), ScheduleOutcome::Scheduled);
    queue.settle().await.unwrap();

    assert_eq!(
        entries(&log),
        vec!["first:after", "second", "first:after", "second"]
    );
    assert_eq!(second.mutations().metrics().notifications, 2);
}

// =============================================================================
// Runtime Availability Tests
// =============================================================================

#[tokio::test]
async fn test_detach_before_dispatch_drops_pass() {
    let (queue, doc) = attached_document();
    let log = Log::default();
    let a = named("a", &log);
    doc.observe(&a);

    assert_eq!(doc.queue_mutation(), ScheduleOutcome::Scheduled);
    let context = doc.detach().unwrap();
    queue.settle().await.unwrap();

    assert!(entries(&log).is_empty());
    assert!(!doc.mutations().is_scheduled());
    assert_eq!(doc.mutations().metrics().aborted_passes, 1);

    doc.attach(context);
    assert_eq!(doc.queue_mutation(), ScheduleOutcome::Scheduled);
    queue.settle().await.unwrap();
    assert_eq!(entries(&log), vec!["a"]);
}

#[tokio::test]
async fn test_shut_down_loop_is_treated_as_absent() {
    let (queue, doc) = attached_document();
    queue.shutdown();

    assert_eq!(doc.queue_mutation(), ScheduleOutcome::NoEventLoop);
    assert!(!doc.mutations().is_scheduled());
}

#[tokio::test]
async fn test_record_queue_observer_batches_per_turn() {
    let (queue, doc) = attached_document();
    let batches = Arc::new(Mutex::new(Vec::new()));
    let sink = batches.clone();
    let observer = RecordQueueObserver::new(move |records: Vec<&'static str>| {
        sink.lock().unwrap().push(records);
        Ok(())
    });
    let handle = ObserverHandle::new(&observer);
    doc.mutations().register(&handle);

    for record in ["childList", "attributes", "characterData"] {
        observer.enqueue_record(record);
        doc.queue_mutation();
    }
    queue.settle().await.unwrap();

    assert_eq!(
        *batches.lock().unwrap(),
        vec![vec!["childList", "attributes", "characterData"]]
    );
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_any_burst_coalesces_into_one_pass(calls in 1usize..32, observers in 0usize..5) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let (queue, doc) = attached_document();
            let log = Log::default();
            let kept: Vec<_> = (0..observers).map(|i| named(&format!("o{i}"), &log)).collect();
            for observer in &kept {
                doc.observe(observer);
            }

            for _ in 0..calls {
                doc.queue_mutation();
            }
            queue.settle().await.unwrap();

            let metrics = doc.mutations().metrics();
            prop_assert_eq!(metrics.passes, 1);
            prop_assert_eq!(metrics.coalesced, calls as u64 - 1);
            prop_assert_eq!(entries(&log).len(), observers);
            prop_assert!(!doc.mutations().is_scheduled());
            Ok(())
        })?;
    }
}
