//! ObserverSet - ordered, identity-unique observer registrations

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::debug;

use super::observer::{MutationObserver, ObserverHandle, ObserverId};

/// Registrations in insertion order, unique by identity
///
/// Entries are keyed by a monotonically increasing sequence number, so
/// iteration order is registration order and removal never shifts others.
#[derive(Debug, Default)]
pub struct ObserverSet {
    entries: BTreeMap<u64, ObserverHandle>,
    index: HashMap<ObserverId, u64>,
    next_seq: u64,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a registration; returns false if already present or already dropped
    pub fn insert(&mut self, handle: &ObserverHandle) -> bool {
        let id = handle.id();
        if self.index.contains_key(&id) {
            debug!(observer = %id, "ObserverSet::insert: already registered");
            return false;
        }
        if handle.is_dangling() {
            debug!(observer = %id, "ObserverSet::insert: observer already dropped");
            return false;
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(seq, handle.clone());
        self.index.insert(id, seq);
        true
    }

    /// Remove a registration; returns false if it was not present
    pub fn remove(&mut self, id: ObserverId) -> bool {
        match self.index.remove(&id) {
            Some(seq) => {
                self.entries.remove(&seq);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: ObserverId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered identities in registration order
    pub fn ids(&self) -> Vec<ObserverId> {
        self.entries.values().map(ObserverHandle::id).collect()
    }

    /// Strong references to every live observer, in registration order
    ///
    /// Registrations whose observer has been dropped are pruned.
    pub fn snapshot(&mut self) -> Vec<(ObserverId, Arc<dyn MutationObserver>)> {
        let mut live = Vec::with_capacity(self.entries.len());
        let mut dead = Vec::new();

        for (seq, handle) in &self.entries {
            match handle.upgrade() {
                Some(observer) => live.push((handle.id(), observer)),
                None => dead.push((*seq, handle.id())),
            }
        }

        for (seq, id) in dead {
            debug!(observer = %id, "ObserverSet::snapshot: pruning dropped observer");
            self.entries.remove(&seq);
            self.index.remove(&id);
        }

        live
    }
}
