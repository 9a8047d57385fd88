//! Event loop error types

use thiserror::Error;

/// Errors reported by an event loop service
#[derive(Debug, Error)]
pub enum EventLoopError {
    #[error("Event loop {name} is closed")]
    Closed { name: String },

    #[error("Execute request dropped before completion")]
    Dropped,
}
