//! Event loop service trait
//!
//! The dispatch layer only consumes this contract. It never learns how the
//! loop orders or runs its work beyond the guarantees documented here.

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::error::EventLoopError;

/// A deferred, zero-argument asynchronous unit of work
pub type Microtask = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// A zero-argument action run on the loop by [`EventLoop::execute`]
pub type Action = Box<dyn FnOnce() -> eyre::Result<()> + Send>;

/// Deferred-work service that a document's context may expose
#[async_trait]
pub trait EventLoop: Send + Sync {
    /// Queue a microtask
    ///
    /// Never runs the task inline and never blocks the caller. Tasks run
    /// exactly once, in enqueue order.
    fn enqueue(&self, task: Microtask) -> Result<(), EventLoopError>;

    /// Run an action on the loop and wait until it has run
    ///
    /// Whether a failing action is reported back or isolated is up to the
    /// implementation; see [`super::MicrotaskQueue`] for the shipped policy.
    async fn execute(&self, action: Action) -> Result<(), EventLoopError>;
}

/// Box an async closure into a [`Microtask`]
pub fn microtask<F, Fut>(f: F) -> Microtask
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    Box::new(move || Box::pin(f()) as BoxFuture<'static, ()>)
}
