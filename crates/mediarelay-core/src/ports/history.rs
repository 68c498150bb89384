//! History (duplicate) store port.
//!
//! The store holds the source ids of jobs that reached at least one
//! destination. Persistence is up to the adapter; the engine consults it
//! synchronously from the queue-driving task.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use thiserror::Error;

use crate::relay::SourceId;

/// Errors from a history store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HistoryError {
    /// The backing storage could not be read or written.
    #[error("History storage error: {0}")]
    Storage(String),
}

/// Port for the set of previously relayed source ids.
///
/// Append-only apart from `clear`.
pub trait HistoryStorePort: Send + Sync {
    /// Whether the id was relayed before.
    fn contains(&self, id: &SourceId) -> bool;

    /// Record a relayed id.
    fn add(&self, id: &SourceId) -> Result<(), HistoryError>;

    /// Forget every recorded id.
    fn clear(&self) -> Result<(), HistoryError>;

    /// Number of recorded ids.
    fn len(&self) -> usize;

    /// Whether nothing has been recorded.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local history store.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    ids: Mutex<BTreeSet<SourceId>>,
}

impl InMemoryHistoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with ids.
    pub fn with_ids(ids: impl IntoIterator<Item = SourceId>) -> Self {
        Self {
            ids: Mutex::new(ids.into_iter().collect()),
        }
    }
}

impl HistoryStorePort for InMemoryHistoryStore {
    fn contains(&self, id: &SourceId) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    fn add(&self, id: &SourceId) -> Result<(), HistoryError> {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), HistoryError> {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }

    fn len(&self) -> usize {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_store_roundtrip() {
        let store = InMemoryHistoryStore::new();
        let id = SourceId::new("abc");
        assert!(!store.contains(&id));
        assert!(store.is_empty());

        store.add(&id).unwrap();
        store.add(&id).unwrap();
        assert!(store.contains(&id));
        assert_eq!(store.len(), 1);

        store.clear().unwrap();
        assert!(!store.contains(&id));
    }

    #[test]
    fn test_seeded_store() {
        let store = InMemoryHistoryStore::with_ids([SourceId::new("a"), SourceId::new("b")]);
        assert_eq!(store.len(), 2);
        assert!(store.contains(&SourceId::new("b")));
    }
}
