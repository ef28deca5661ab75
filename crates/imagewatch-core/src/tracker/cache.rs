//! Side-table of per-handle resolution outcomes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::domain::{CacheRecord, ImageOutcome, NodeId};

/// Last known outcome of every handle a tracker has resolved.
///
/// Keyed by node identity only, so it never keeps a host node alive.
/// Clones share the same table. Eviction is up to the host.
#[derive(Debug, Clone, Default)]
pub struct CacheTable {
    records: Rc<RefCell<HashMap<NodeId, CacheRecord>>>,
}

impl CacheTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record for `image`, whatever `src` it was stored with.
    #[must_use]
    pub fn get(&self, image: NodeId) -> Option<CacheRecord> {
        self.records.borrow().get(&image).cloned()
    }

    /// Returns the cached outcome if it was recorded for this exact `src`.
    #[must_use]
    pub fn lookup(&self, image: NodeId, src: &str) -> Option<ImageOutcome> {
        self.records
            .borrow()
            .get(&image)
            .filter(|record| record.matches(src))
            .map(|record| record.outcome)
    }

    /// Stores or replaces the record for `image`.
    pub fn record(&self, image: NodeId, outcome: ImageOutcome, src: impl Into<String>) {
        self.records
            .borrow_mut()
            .insert(image, CacheRecord::new(outcome, src));
    }

    /// Forgets `image`, returning its record.
    pub fn evict(&self, image: NodeId) -> Option<CacheRecord> {
        self.records.borrow_mut().remove(&image)
    }

    /// Forgets every record.
    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }
}
