//! Event loop service
//!
//! The microtask contract consumed by mutation dispatch, plus the tokio-backed
//! implementation shipped with this crate.

mod config;
mod error;
mod queue;
mod service;

pub use config::EventLoopConfig;
pub use error::EventLoopError;
pub use queue::{LoopStats, MicrotaskQueue};
pub use service::{Action, EventLoop, Microtask, microtask};
