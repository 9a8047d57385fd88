//! Document - owner of one mutation dispatch coordinator

use std::sync::{Arc, PoisonError, RwLock, Weak};

use tracing::{debug, info};
use uuid::Uuid;

use crate::dispatch::{MutationDispatchCoordinator, MutationObserver, ObserverHandle, ScheduleOutcome};
use crate::event_loop::EventLoop;

use super::context::{BrowsingContext, EventLoopSource};

/// A document that can be attached to and detached from a browsing context
///
/// The coordinator is created with the document and holds only a weak
/// back-reference, so it always sees the document's current context.
pub struct Document {
    id: Uuid,
    context: RwLock<Option<Arc<BrowsingContext>>>,
    mutations: Arc<MutationDispatchCoordinator>,
}

impl Document {
    /// Create a detached document
    pub fn new() -> Arc<Self> {
        Self::build(None)
    }

    /// Create a document already attached to `context`
    pub fn with_context(context: Arc<BrowsingContext>) -> Arc<Self> {
        Self::build(Some(context))
    }

    fn build(context: Option<Arc<BrowsingContext>>) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Document>| {
            let id = Uuid::now_v7();
            debug!(%id, attached = context.is_some(), "Document::build: called");
            let source: Weak<dyn EventLoopSource> = weak.clone();
            Self {
                id,
                context: RwLock::new(context),
                mutations: MutationDispatchCoordinator::new(source),
            }
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current browsing context, if attached
    pub fn context(&self) -> Option<Arc<BrowsingContext>> {
        self.context.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Attach to a context; returns the previous one
    pub fn attach(&self, context: Arc<BrowsingContext>) -> Option<Arc<BrowsingContext>> {
        info!(document = %self.id, context = %context.id(), "Attaching document");
        self.context
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(context)
    }

    /// Detach from the current context; returns it
    pub fn detach(&self) -> Option<Arc<BrowsingContext>> {
        info!(document = %self.id, "Detaching document");
        self.context.write().unwrap_or_else(PoisonError::into_inner).take()
    }

    pub fn mutations(&self) -> &Arc<MutationDispatchCoordinator> {
        &self.mutations
    }

    /// Register `observer` with this document and return its handle
    pub fn observe<O: MutationObserver + 'static>(&self, observer: &Arc<O>) -> ObserverHandle {
        let handle = ObserverHandle::new(observer);
        self.mutations.register(&handle);
        handle
    }

    /// Signal that the tree changed; observers are flushed on a later microtask
    pub fn queue_mutation(&self) -> ScheduleOutcome {
        debug!(document = %self.id, "Document::queue_mutation: called");
        self.mutations.schedule_flush()
    }
}

impl EventLoopSource for Document {
    fn event_loop(&self) -> Option<Arc<dyn EventLoop>> {
        self.context()?.event_loop()
    }
}
