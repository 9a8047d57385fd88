//! Observer capability and identity

use std::fmt;
use std::sync::{Arc, Weak};

/// Anything that wants batched, asynchronous notification of document changes
///
/// `trigger` delivers whatever the observer has pending. What it reads and
/// which callbacks it invokes are the observer's own business.
pub trait MutationObserver: Send + Sync {
    fn trigger(&self) -> eyre::Result<()>;
}

/// Stable identity of a registered observer
///
/// Derived from the observer's allocation. Registrations hold a `Weak`, so
/// the address cannot be reused while the registration exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(usize);

impl ObserverId {
    fn of<T: ?Sized>(ptr: *const T) -> Self {
        Self(ptr as *const () as usize)
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer@{:#x}", self.0)
    }
}

/// Non-owning handle used to register and unregister an observer
#[derive(Clone)]
pub struct ObserverHandle {
    id: ObserverId,
    observer: Weak<dyn MutationObserver>,
}

impl ObserverHandle {
    /// Handle for a concrete observer
    pub fn new<O: MutationObserver + 'static>(observer: &Arc<O>) -> Self {
        let weak: Weak<O> = Arc::downgrade(observer);
        Self {
            id: ObserverId::of(Arc::as_ptr(observer)),
            observer: weak,
        }
    }

    /// Handle for an already type-erased observer
    pub fn from_dyn(observer: &Arc<dyn MutationObserver>) -> Self {
        Self {
            id: ObserverId::of(Arc::as_ptr(observer)),
            observer: Arc::downgrade(observer),
        }
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Strong reference, if the observer is still alive
    pub fn upgrade(&self) -> Option<Arc<dyn MutationObserver>> {
        self.observer.upgrade()
    }

    /// Whether the observer has been dropped by its owner
    pub fn is_dangling(&self) -> bool {
        self.observer.strong_count() == 0
    }
}

impl fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverHandle")
            .field("id", &self.id)
            .field("dangling", &self.is_dangling())
            .finish()
    }
}

impl PartialEq for ObserverHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ObserverHandle {}
