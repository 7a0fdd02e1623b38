//! Pinned trial snapshots handed to importance evaluators.
//!
//! Evaluators enumerate a study's trials through [`TrialSource`]. A
//! [`StudyView`] answers with a list fetched once by the caller, so one
//! computation never observes trials appended to storage while it runs.

use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::trial::FrozenTrial;

/// Read access to a study's trials, as seen by an evaluator.
pub trait TrialSource: Sync {
    /// Identifier of the study.
    fn study_id(&self) -> u64;

    /// Display name of the study.
    fn study_name(&self) -> &str;

    /// All trials of the study, in any state.
    fn trials(&self) -> &[FrozenTrial];

    /// The subset of [`trials`](TrialSource::trials) in the `Complete` state.
    fn completed_trials(&self) -> Vec<&FrozenTrial> {
        self.trials()
            .iter()
            .filter(|t| t.state.is_complete())
            .collect()
    }
}

/// A study presented through a fixed, already-fetched trial list.
///
/// The list is borrowed for the lifetime of the view and is never
/// re-queried from storage.
///
/// # Examples
///
/// ```
/// use param_importance::storage::MemoryStorage;
/// use param_importance::{FrozenTrial, StudyView, TrialSource};
///
/// let storage = MemoryStorage::new();
/// let id = storage.create_study("demo");
/// let trials = vec![FrozenTrial::complete(0, 1.0)];
///
/// let view = StudyView::new(&storage, id, &trials).unwrap();
/// assert_eq!(view.study_name(), "demo");
/// assert_eq!(view.trials().len(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct StudyView<'a> {
    study_id: u64,
    study_name: String,
    trials: &'a [FrozenTrial],
}

impl<'a> StudyView<'a> {
    /// Pin `trials` under the identity of `study_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StudyNotFound`] if `storage` does not know the study.
    pub fn new(
        storage: &dyn Storage,
        study_id: u64,
        trials: &'a [FrozenTrial],
    ) -> Result<Self> {
        let study_name = storage
            .study_name(study_id)
            .ok_or(Error::StudyNotFound(study_id))?;
        Ok(Self::with_name(study_id, study_name, trials))
    }

    /// Pin `trials` under an explicit study identity, without a storage lookup.
    #[must_use]
    pub fn with_name(study_id: u64, study_name: impl Into<String>, trials: &'a [FrozenTrial]) -> Self {
        Self {
            study_id,
            study_name: study_name.into(),
            trials,
        }
    }
}

impl TrialSource for StudyView<'_> {
    fn study_id(&self) -> u64 {
        self.study_id
    }

    fn study_name(&self) -> &str {
        &self.study_name
    }

    fn trials(&self) -> &[FrozenTrial] {
        self.trials
    }
}
