//! mutation-host - Mutation observer dispatch for DOM documents
//!
//! Structural changes to a document are batched and delivered to registered
//! observers on a later microtask, at most once per turn.
//!
//! # Core Concepts
//!
//! - **Never synchronous**: a mutation only schedules a flush; observers run later
//! - **Coalescing**: every flush request before the pending pass runs shares that pass
//! - **Snapshot passes**: a pass notifies the observers registered when it began
//! - **Serialized delivery**: each `trigger` runs on the event loop, one at a time
//!
//! # Modules
//!
//! - [`dispatch`] - Observer registry and flush coordinator
//! - [`event_loop`] - Microtask service contract and tokio implementation
//! - [`document`] - Documents and browsing contexts
//! - [`records`] - Record-buffering observer
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod demo;
pub mod dispatch;
pub mod document;
pub mod event_loop;
pub mod records;

// Re-export commonly used types
pub use config::{Config, DemoConfig};
pub use demo::{DemoReport, ObserverReport, run_demo};
pub use dispatch::{
    DispatchMetrics, MutationDispatchCoordinator, MutationObserver, ObserverHandle, ObserverId, ObserverSet,
    ScheduleOutcome,
};
pub use document::{BrowsingContext, Document, EventLoopSource};
pub use event_loop::{
    Action, EventLoop, EventLoopConfig, EventLoopError, LoopStats, Microtask, MicrotaskQueue, microtask,
};
pub use records::RecordQueueObserver;
