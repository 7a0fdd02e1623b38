//! Core types shared across the crate.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The state of a trial in its lifecycle.
///
/// Only [`Complete`](TrialState::Complete) trials contribute to importance
/// scores and to the cache's freshness count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TrialState {
    /// The trial is currently running.
    Running,
    /// The trial is queued but has not started.
    Waiting,
    /// The trial completed successfully.
    Complete,
    /// The trial was stopped early by a pruner.
    Pruned,
    /// The trial failed with an error.
    Failed,
}

impl TrialState {
    /// Returns `true` for [`TrialState::Complete`].
    #[must_use]
    pub fn is_complete(self) -> bool {
        self == Self::Complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_complete_counts() {
        assert!(TrialState::Complete.is_complete());
        assert!(!TrialState::Pruned.is_complete());
        assert!(!TrialState::Failed.is_complete());
        assert!(!TrialState::Running.is_complete());
    }
}
