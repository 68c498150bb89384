//! JSON-file history store.
//!
//! The file holds a sorted JSON array of source ids. Every change rewrites
//! it through a sibling temp file and a rename, so a crash never leaves a
//! half-written history behind.

use std::collections::BTreeSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use mediarelay_core::{HistoryError, HistoryStorePort, SourceId};

/// History store persisted as a JSON array.
#[derive(Debug)]
pub struct JsonHistoryStore {
    path: PathBuf,
    ids: Mutex<BTreeSet<SourceId>>,
}

impl JsonHistoryStore {
    /// Open the store at `path`. A missing file is an empty history.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HistoryError> {
        let path = path.into();
        let ids = match fs::read(&path) {
            Ok(raw) if raw.iter().all(u8::is_ascii_whitespace) => BTreeSet::new(),
            Ok(raw) => serde_json::from_slice::<BTreeSet<SourceId>>(&raw).map_err(|e| {
                HistoryError::Storage(format!("{} is not a history file: {e}", path.display()))
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeSet::new(),
            Err(e) => {
                return Err(HistoryError::Storage(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };

        tracing::debug!(path = %path.display(), entries = ids.len(), "Loaded relay history");
        Ok(Self {
            path,
            ids: Mutex::new(ids),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, ids: &BTreeSet<SourceId>) -> Result<(), HistoryError> {
        let storage = |e: std::io::Error| {
            HistoryError::Storage(format!("cannot write {}: {e}", self.path.display()))
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(storage)?;
        }

        let json = serde_json::to_vec_pretty(ids)
            .map_err(|e| HistoryError::Storage(format!("cannot encode history: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(storage)?;
        fs::rename(&tmp, &self.path).map_err(storage)
    }
}

impl HistoryStorePort for JsonHistoryStore {
    fn contains(&self, id: &SourceId) -> bool {
        self.ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(id)
    }

    fn add(&self, id: &SourceId) -> Result<(), HistoryError> {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        if ids.insert(id.clone()) {
            self.persist(&ids)?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), HistoryError> {
        let mut ids = self.ids.lock().unwrap_or_else(PoisonError::into_inner);
        ids.clear();
        self.persist(&ids)
    }

    fn len(&self) -> usize {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
