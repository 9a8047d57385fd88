//! Mutation observer dispatch
//!
//! One [`MutationDispatchCoordinator`] per document owns the registered
//! observers and coalesces flush requests into a single microtask per turn.

mod coordinator;
mod metrics;
mod observer;
mod registry;

pub use coordinator::{MutationDispatchCoordinator, ScheduleOutcome};
pub use metrics::DispatchMetrics;
pub use observer::{MutationObserver, ObserverHandle, ObserverId};
pub use registry::ObserverSet;
