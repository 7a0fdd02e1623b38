use core::sync::atomic::{AtomicU64, Ordering};
use std::collections::HashMap;

use parking_lot::RwLock;

use super::Storage;
use crate::error::{Error, Result};
use crate::trial::FrozenTrial;

struct StudyRecord {
    name: String,
    trials: Vec<FrozenTrial>,
}

/// In-memory study storage.
///
/// Studies live in a map behind a read-write lock; ids are handed out from
/// an atomic counter.
///
/// # Examples
///
/// ```
/// use param_importance::storage::{MemoryStorage, Storage};
/// use param_importance::FrozenTrial;
///
/// let storage = MemoryStorage::new();
/// let id = storage.create_study("mnist");
/// storage.push_trial(id, FrozenTrial::complete(0, 0.5)).unwrap();
///
/// assert_eq!(storage.study_name(id).as_deref(), Some("mnist"));
/// assert_eq!(storage.trials(id).unwrap().len(), 1);
/// ```
pub struct MemoryStorage {
    studies: RwLock<HashMap<u64, StudyRecord>>,
    next_id: AtomicU64,
}

impl MemoryStorage {
    /// Creates a new, empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            studies: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Create a study and return its id.
    pub fn create_study(&self, name: impl Into<String>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.studies.write().insert(
            id,
            StudyRecord {
                name: name.into(),
                trials: Vec::new(),
            },
        );
        id
    }

    /// Append a trial to a study.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StudyNotFound`] if the study is unknown.
    pub fn push_trial(&self, study_id: u64, trial: FrozenTrial) -> Result<()> {
        self.studies
            .write()
            .get_mut(&study_id)
            .ok_or(Error::StudyNotFound(study_id))?
            .trials
            .push(trial);
        Ok(())
    }

    /// Returns the ids of all stored studies, ascending.
    #[must_use]
    pub fn study_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.studies.read().keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn study_name(&self, study_id: u64) -> Option<String> {
        self.studies.read().get(&study_id).map(|s| s.name.clone())
    }

    fn trials(&self, study_id: u64) -> Result<Vec<FrozenTrial>> {
        self.studies
            .read()
            .get(&study_id)
            .map(|s| s.trials.clone())
            .ok_or(Error::StudyNotFound(study_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct() {
        let storage = MemoryStorage::new();
        let a = storage.create_study("a");
        let b = storage.create_study("b");
        assert_ne!(a, b);
        assert_eq!(storage.study_ids(), vec![a, b]);
    }

    #[test]
    fn unknown_study() {
        let storage = MemoryStorage::new();
        assert!(storage.study_name(9).is_none());
        assert!(matches!(storage.trials(9), Err(Error::StudyNotFound(9))));
        assert!(
            storage
                .push_trial(9, FrozenTrial::complete(0, 1.0))
                .is_err()
        );
    }

    #[test]
    fn trials_are_snapshots() {
        let storage = MemoryStorage::new();
        let id = storage.create_study("s");
        storage.push_trial(id, FrozenTrial::complete(0, 1.0)).unwrap();
        let snapshot = storage.trials(id).unwrap();
        storage.push_trial(id, FrozenTrial::complete(1, 2.0)).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(storage.trials(id).unwrap().len(), 2);
    }
}
