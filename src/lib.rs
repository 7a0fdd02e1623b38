#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Invalidation-aware parameter importance for hyperparameter optimization
//! studies. Computing which parameters drove the objective (fANOVA over a
//! random forest) is expensive, but dashboards ask for it on every refresh
//! while trials trickle in. [`ImportanceCache`] serves the last result until
//! the study's number of completed trials changes, computes each key at most
//! once at a time, and quietly falls back from a fast evaluator to the
//! default one when the fast path fails.
//!
//! # Getting Started
//!
//! ```
//! use param_importance::prelude::*;
//!
//! let storage = MemoryStorage::new();
//! let study = storage.create_study("tuning");
//! let cache = ImportanceCache::new(storage);
//!
//! let trials: Vec<FrozenTrial> = (0..30u32)
//!     .map(|i| {
//!         let lr = f64::from(i + 1) * 1e-3;
//!         let layers = i64::from(i % 4);
//!         FrozenTrial::complete(i.into(), (lr * 1e3).powi(2))
//!             .param("lr", ParamValue::Float(lr), Distribution::log_float(1e-3, 1e-1))
//!             .param("layers", ParamValue::Int(layers), Distribution::int(0, 3))
//!     })
//!     .collect();
//!
//! let importances = cache.get_importances(study, 0, &trials).unwrap();
//! assert_eq!(importances[0].name, "lr");
//! assert_eq!(importances[0].distribution, "FloatDistribution");
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`ImportanceCache`] | Per `(study, objective)` cache keyed by completed-trial count. |
//! | [`StudyView`] | A study pinned to a fixed trial list for one computation. |
//! | [`EvaluatorSelector`](evaluator::EvaluatorSelector) | Preferred fast evaluator with a default fallback. |
//! | [`ImportanceEvaluator`](evaluator::ImportanceEvaluator) | Pluggable importance algorithm. |
//! | [`ParamImportance`] | One served record: name, score, distribution kind. |
//! | [`Storage`](storage::Storage) | Resolves study names (and lists trials). |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `fast-fanova` | [`FastFanovaEvaluator`](evaluator::FastFanovaEvaluator) as the preferred evaluator of [`EvaluatorSelector::detect`](evaluator::EvaluatorSelector::detect) | on |
//! | `serde` | `Serialize`/`Deserialize` on trials, distributions and [`ParamImportance`] | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) for cache hits, misses and evaluator fallbacks | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::warn!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_warn {
    ($($arg:tt)*) => { tracing::warn!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_warn {
    ($($arg:tt)*) => {};
}

mod cache;
mod computer;
mod distribution;
mod error;
pub mod evaluator;
mod fanova;
mod param;
pub mod storage;
mod trial;
mod types;
mod view;

pub use cache::{CacheStats, ImportanceCache, ImportanceCacheBuilder};
pub use computer::{ParamImportance, compute_importances, distribution_name};
pub use distribution::{
    CategoricalDistribution, Distribution, FloatDistribution, IntDistribution,
};
pub use error::{Error, Result};
pub use fanova::{FanovaConfig, FanovaResult};
pub use param::ParamValue;
pub use trial::FrozenTrial;
pub use types::TrialState;
pub use view::{StudyView, TrialSource};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use param_importance::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cache::{CacheStats, ImportanceCache, ImportanceCacheBuilder};
    pub use crate::computer::ParamImportance;
    pub use crate::distribution::Distribution;
    pub use crate::error::{Error, Result};
    #[cfg(feature = "fast-fanova")]
    pub use crate::evaluator::{FastFanovaEvaluator, FastFanovaFactory};
    pub use crate::evaluator::{
        EvaluatorFactory, EvaluatorSelector, FanovaEvaluator, ImportanceEvaluator,
        SpearmanEvaluator, Target,
    };
    pub use crate::fanova::FanovaConfig;
    pub use crate::param::ParamValue;
    pub use crate::storage::{MemoryStorage, Storage};
    pub use crate::trial::FrozenTrial;
    pub use crate::types::TrialState;
    pub use crate::view::{StudyView, TrialSource};
}
