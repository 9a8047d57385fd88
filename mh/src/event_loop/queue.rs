//! MicrotaskQueue - tokio-backed event loop
//!
//! A single runner task owns the loop. It takes microtasks strictly FIFO and
//! drives one at a time to completion. While the current microtask is
//! suspended the runner services `execute` requests, so a microtask that
//! awaits `execute` makes progress without the next microtask starting.
//!
//! Panics in microtasks and actions are caught on the runner and counted as
//! failures, so one misbehaving task never takes the loop down with it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::config::EventLoopConfig;
use super::error::EventLoopError;
use super::service::{Action, EventLoop, Microtask, microtask};

/// Requests on the microtask lane
enum LoopRequest {
    Run(Microtask),
    Shutdown,
}

/// Request to run an action on the loop
struct ExecuteRequest {
    action: Action,
    done: oneshot::Sender<()>,
}

#[derive(Default)]
struct LoopCounters {
    tasks_run: AtomicU64,
    tasks_failed: AtomicU64,
    actions_run: AtomicU64,
    actions_failed: AtomicU64,
}

/// Loop statistics for observability
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoopStats {
    pub tasks_run: u64,
    pub tasks_failed: u64,
    pub actions_run: u64,
    pub actions_failed: u64,
}

/// Handle to a running microtask loop
///
/// Must be spawned from within a tokio runtime.
pub struct MicrotaskQueue {
    name: String,
    task_tx: mpsc::UnboundedSender<LoopRequest>,
    exec_tx: mpsc::Sender<ExecuteRequest>,
    closed: AtomicBool,
    counters: Arc<LoopCounters>,
}

impl MicrotaskQueue {
    /// Spawn the runner on the current tokio runtime
    pub fn spawn(config: EventLoopConfig) -> Arc<Self> {
        debug!(?config, "MicrotaskQueue::spawn: called");
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let (exec_tx, exec_rx) = mpsc::channel(config.channel_buffer.max(1));
        let counters = Arc::new(LoopCounters::default());

        let runner = Runner {
            name: config.name.clone(),
            task_rx,
            exec_rx,
            counters: counters.clone(),
        };
        tokio::spawn(runner.run());

        Arc::new(Self {
            name: config.name,
            task_tx,
            exec_tx,
            closed: AtomicBool::new(false),
            counters,
        })
    }

    /// Loop name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait until every microtask enqueued before this call has completed
    ///
    /// Microtasks enqueued by those tasks while they run are not waited on.
    pub async fn settle(&self) -> Result<(), EventLoopError> {
        debug!(name = %self.name, "MicrotaskQueue::settle: called");
        let (tx, rx) = oneshot::channel();
        self.enqueue(microtask(move || async move {
            let _ = tx.send(());
        }))?;
        rx.await.map_err(|_| EventLoopError::Dropped)
    }

    /// Stop accepting work
    ///
    /// Every microtask whose `enqueue` returned `Ok` still runs; the runner
    /// exits after them.
    pub fn shutdown(&self) {
        debug!(name = %self.name, "MicrotaskQueue::shutdown: called");
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!(name = %self.name, "MicrotaskQueue::shutdown: already closed");
            return;
        }
        let _ = self.task_tx.send(LoopRequest::Shutdown);
    }

    /// Whether [`Self::shutdown`] has been requested
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.task_tx.is_closed()
    }

    /// Current loop statistics
    pub fn stats(&self) -> LoopStats {
        LoopStats {
            tasks_run: self.counters.tasks_run.load(Ordering::Relaxed),
            tasks_failed: self.counters.tasks_failed.load(Ordering::Relaxed),
            actions_run: self.counters.actions_run.load(Ordering::Relaxed),
            actions_failed: self.counters.actions_failed.load(Ordering::Relaxed),
        }
    }

    fn closed_error(&self) -> EventLoopError {
        EventLoopError::Closed {
            name: self.name.clone(),
        }
    }
}

#[async_trait]
impl EventLoop for MicrotaskQueue {
    fn enqueue(&self, task: Microtask) -> Result<(), EventLoopError> {
        debug!(name = %self.name, "MicrotaskQueue::enqueue: called");
        if self.closed.load(Ordering::SeqCst) {
            debug!(name = %self.name, "MicrotaskQueue::enqueue: loop closed, rejecting");
            return Err(self.closed_error());
        }
        self.task_tx
            .send(LoopRequest::Run(task))
            .map_err(|_| self.closed_error())
    }

    /// Failures returned by `action`, and panics raised by it, are logged and
    /// counted by the loop, and the call still resolves `Ok`. Only a closed
    /// loop is reported as an error.
    async fn execute(&self, action: Action) -> Result<(), EventLoopError> {
        debug!(name = %self.name, "MicrotaskQueue::execute: called");
        let (done_tx, done_rx) = oneshot::channel();
        self.exec_tx
            .send(ExecuteRequest { action, done: done_tx })
            .await
            .map_err(|_| self.closed_error())?;

        done_rx.await.map_err(|_| self.closed_error())
    }
}

/// Owns the receiving ends; runs on its own tokio task
struct Runner {
    name: String,
    task_rx: mpsc::UnboundedReceiver<LoopRequest>,
    exec_rx: mpsc::Receiver<ExecuteRequest>,
    counters: Arc<LoopCounters>,
}

impl Runner {
    async fn run(mut self) {
        info!(name = %self.name, "Event loop started");

        loop {
            tokio::select! {
                biased;
                request = self.task_rx.recv() => match request {
                    Some(LoopRequest::Run(task)) => self.run_task(task).await,
                    Some(LoopRequest::Shutdown) | None => break,
                },
                Some(request) = self.exec_rx.recv() => self.run_action(request),
            }
        }

        self.drain().await;
        info!(name = %self.name, "Event loop stopped");
    }

    /// Run whatever was accepted before the lane closed
    ///
    /// A racing `enqueue` either lands here or is rejected with `Closed`.
    async fn drain(&mut self) {
        self.task_rx.close();
        while let Some(request) = self.task_rx.recv().await {
            if let LoopRequest::Run(task) = request {
                debug!(name = %self.name, "Runner::drain: running task accepted before shutdown");
                self.run_task(task).await;
            }
        }
    }

    async fn run_task(&mut self, task: Microtask) {
        // Calling `task` happens inside the guarded future so a panic while
        // building the future is caught as well.
        let fut = AssertUnwindSafe(async move { task().await }).catch_unwind();
        tokio::pin!(fut);

        let outcome = loop {
            tokio::select! {
                biased;
                outcome = &mut fut => break outcome,
                Some(request) = self.exec_rx.recv() => self.run_action(request),
            }
        };

        self.counters.tasks_run.fetch_add(1, Ordering::Relaxed);
        if let Err(payload) = outcome {
            self.counters.tasks_failed.fetch_add(1, Ordering::Relaxed);
            warn!(name = %self.name, panic = panic_message(payload.as_ref()), "Microtask panicked");
        }
    }

    fn run_action(&self, request: ExecuteRequest) {
        self.counters.actions_run.fetch_add(1, Ordering::Relaxed);

        match panic::catch_unwind(AssertUnwindSafe(request.action)) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                self.counters.actions_failed.fetch_add(1, Ordering::Relaxed);
                warn!(name = %self.name, error = %e, "Action failed");
            }
            Err(payload) => {
                self.counters.actions_failed.fetch_add(1, Ordering::Relaxed);
                warn!(name = %self.name, panic = panic_message(payload.as_ref()), "Action panicked");
            }
        }

        let _ = request.done.send(());
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
