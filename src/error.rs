/// Errors returned by importance computation and the importance cache.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when the storage backend does not know the requested study.
    #[error("study {0} not found in storage")]
    StudyNotFound(u64),

    /// Returned when an evaluator has fewer than two usable completed trials.
    #[error("no completed trials available")]
    NoCompletedTrials,

    /// Returned when a completed trial has no value for the selected objective.
    #[error("trial {trial} has no value for objective {objective}")]
    ObjectiveOutOfRange {
        /// The number of the offending trial.
        trial: u64,
        /// The requested objective index.
        objective: usize,
    },

    /// Returned when a multi-objective study is evaluated without a target.
    #[error("a target must be given for a study with {0} objectives")]
    TargetRequired(usize),

    /// Returned when an importance evaluator fails.
    #[error("evaluator '{evaluator}' failed: {reason}")]
    Evaluator {
        /// Name of the failing evaluator.
        evaluator: &'static str,
        /// Human-readable description of the failure.
        reason: String,
    },

    /// Returned when an internal invariant is violated.
    #[error("internal error: {0}")]
    Internal(&'static str),
}

pub type Result<T> = core::result::Result<T, Error>;
