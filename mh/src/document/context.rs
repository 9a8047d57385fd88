//! Browsing context and the event loop lookup it provides

use std::fmt;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::event_loop::EventLoop;

/// Anything that can hand out the event loop a document should use right now
///
/// Implementations must answer from current state on every call: the loop
/// may appear or disappear between two calls.
pub trait EventLoopSource: Send + Sync {
    fn event_loop(&self) -> Option<Arc<dyn EventLoop>>;
}

/// The runtime a document is attached to
///
/// Services are injected explicitly; a context built without an event loop
/// is valid and simply cannot deliver notifications.
pub struct BrowsingContext {
    id: Uuid,
    event_loop: Option<Arc<dyn EventLoop>>,
}

impl BrowsingContext {
    pub fn new() -> Self {
        let id = Uuid::now_v7();
        debug!(%id, "BrowsingContext::new: called");
        Self { id, event_loop: None }
    }

    /// Attach an event loop service
    pub fn with_event_loop(mut self, event_loop: Arc<dyn EventLoop>) -> Self {
        debug!(id = %self.id, "BrowsingContext::with_event_loop: called");
        self.event_loop = Some(event_loop);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn event_loop(&self) -> Option<Arc<dyn EventLoop>> {
        self.event_loop.clone()
    }
}

impl Default for BrowsingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BrowsingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowsingContext")
            .field("id", &self.id)
            .field("has_event_loop", &self.event_loop.is_some())
            .finish()
    }
}

impl EventLoopSource for BrowsingContext {
    fn event_loop(&self) -> Option<Arc<dyn EventLoop>> {
        BrowsingContext::event_loop(self)
    }
}
