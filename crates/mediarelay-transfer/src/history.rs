//! Duplicate index over the history store.

use std::sync::Arc;

use mediarelay_core::{HistoryStorePort, RelayError, SourceId};

/// Set of source ids that already reached at least one destination.
///
/// Used as a soft warning at admission time; it never blocks a job.
#[derive(Clone)]
pub struct DuplicateIndex {
    store: Arc<dyn HistoryStorePort>,
}

impl DuplicateIndex {
    /// Wrap a history store.
    pub fn new(store: Arc<dyn HistoryStorePort>) -> Self {
        Self { store }
    }

    /// Whether `id` was relayed before.
    pub fn contains(&self, id: &SourceId) -> bool {
        self.store.contains(id)
    }

    /// Record a successful relay of `id`.
    pub fn record(&self, id: &SourceId) -> Result<(), RelayError> {
        self.store
            .add(id)
            .map_err(|e| RelayError::history(e.to_string()))
    }

    /// Forget every recorded id. Returns how many were dropped.
    pub fn clear(&self) -> Result<usize, RelayError> {
        let dropped = self.store.len();
        self.store
            .clear()
            .map_err(|e| RelayError::history(e.to_string()))?;
        Ok(dropped)
    }

    /// Number of recorded ids.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
