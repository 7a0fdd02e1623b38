//! Study storage backends.
//!
//! The [`Storage`] trait is the only view the importance cache has of the
//! study backend: it resolves a study's display name, and can list a
//! study's trials for callers that fetch them before asking for
//! importances. The cache itself never pages through storage; it works on
//! the trial list the caller hands it.
//!
//! # Available backends
//!
//! | Backend | Description |
//! |---------|-------------|
//! | [`MemoryStorage`] | In-memory studies behind a read-write lock |
//!
//! # Implementing a custom backend
//!
//! Implement [`Storage`] to plug in a database or a remote service. Both
//! methods take `&self`; implementations must be `Send + Sync` because a
//! single [`ImportanceCache`](crate::ImportanceCache) is shared between
//! request threads.

mod memory;

pub use memory::MemoryStorage;

use crate::error::Result;
use crate::trial::FrozenTrial;

/// Read access to studies and their trials.
pub trait Storage: Send + Sync {
    /// Return the display name of `study_id`, or `None` if it is unknown.
    fn study_name(&self, study_id: u64) -> Option<String>;

    /// Return a snapshot of all trials of `study_id`, in trial order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StudyNotFound`](crate::Error::StudyNotFound) if the
    /// study is unknown.
    fn trials(&self, study_id: u64) -> Result<Vec<FrozenTrial>>;
}
