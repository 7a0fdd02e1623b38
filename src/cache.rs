//! Invalidation-aware cache of importance results.
//!
//! Importances are expensive to compute and requested far more often than
//! the trial set changes. [`ImportanceCache`] keeps, per
//! `(study_id, objective_id)`, the result computed for a given number of
//! completed trials and recomputes only when that number changes.
//!
//! # Freshness
//!
//! The completed-trial count is the only freshness signal; trial identities
//! are not tracked. A study whose completed trials were replaced without
//! changing their count keeps serving the earlier result.
//!
//! # Concurrency
//!
//! The table lock is held only to find or create a key's slot. Each slot
//! has its own mutex, held across the check, the computation, and the
//! write, so:
//!
//! - a key is never computed by two threads at once; late arrivals wait
//!   and then hit the fresh entry;
//! - no reader sees a partially written entry;
//! - computations for different keys run concurrently.
//!
//! There is no eviction: entries live as long as the cache and are only
//! replaced by a newer computation for the same key. A key whose
//! computations have all failed (or panicked) keeps no slot.

use core::sync::atomic::{AtomicU64, Ordering};
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::computer::{ParamImportance, compute_importances};
use crate::error::Result;
use crate::evaluator::EvaluatorSelector;
use crate::storage::Storage;
use crate::trial::FrozenTrial;
use crate::view::StudyView;

type CacheKey = (u64, usize);

#[derive(Debug)]
struct CacheEntry {
    n_completed: usize,
    importances: Arc<[ParamImportance]>,
}

/// Per-key slot; `None` until the first successful computation.
type Slot = Arc<Mutex<Option<CacheEntry>>>;

/// A request's hold on a key's slot.
///
/// Dropping the last lease on a slot that is still empty (the computation
/// failed or panicked) removes it from the table again.
struct SlotLease<'a> {
    cache: &'a ImportanceCache,
    key: CacheKey,
    slot: Slot,
}

impl Drop for SlotLease<'_> {
    fn drop(&mut self) {
        let mut slots = self.cache.slots.lock();
        // Table plus this lease: nobody else can reach the slot.
        if Arc::strong_count(&self.slot) == 2 && self.slot.lock().is_none() {
            slots.remove(&self.key);
        }
    }
}

/// Counters describing how requests were served.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests answered from a fresh entry.
    pub hits: u64,
    /// Requests that triggered a computation.
    pub misses: u64,
    /// Computations that returned an error.
    pub failures: u64,
}

/// Serves parameter importances, recomputing only when a study gains or
/// loses completed trials.
///
/// Create one per process (or per embedding) and share it between request
/// threads; dropping it discards all entries.
///
/// # Examples
///
/// ```
/// use param_importance::storage::MemoryStorage;
/// use param_importance::{Distribution, FrozenTrial, ImportanceCache, ParamValue};
///
/// let storage = MemoryStorage::new();
/// let study = storage.create_study("demo");
/// let cache = ImportanceCache::new(storage);
///
/// let trials: Vec<FrozenTrial> = (0..10u32)
///     .map(|i| {
///         let x = f64::from(i);
///         FrozenTrial::complete(i.into(), x * x)
///             .param("x", ParamValue::Float(x), Distribution::float(0.0, 10.0))
///     })
///     .collect();
///
/// let first = cache.get_importances(study, 0, &trials).unwrap();
/// let second = cache.get_importances(study, 0, &trials).unwrap();
/// assert_eq!(first[0].name, "x");
/// assert_eq!(first, second);
/// assert_eq!(cache.stats().hits, 1);
/// ```
pub struct ImportanceCache {
    storage: Arc<dyn Storage>,
    selector: EvaluatorSelector,
    slots: Mutex<HashMap<CacheKey, Slot>>,
    hits: AtomicU64,
    misses: AtomicU64,
    failures: AtomicU64,
}

impl core::fmt::Debug for ImportanceCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ImportanceCache")
            .field("selector", &self.selector)
            .field("entries", &self.len())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl ImportanceCache {
    /// Creates a cache over `storage` using [`EvaluatorSelector::detect`].
    #[must_use]
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self::builder().storage(storage).build()
    }

    /// Returns a builder for configuring the storage and evaluators.
    #[must_use]
    pub fn builder() -> ImportanceCacheBuilder {
        ImportanceCacheBuilder::new()
    }

    /// Importances of `study_id` against objective `objective_id`, given
    /// the study's current `trials`.
    ///
    /// Returns the cached result if the number of `Complete` trials equals
    /// the count it was computed at; otherwise recomputes and replaces the
    /// entry. With no completed trials an empty result is returned and the
    /// cache is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StudyNotFound`](crate::Error::StudyNotFound) if the
    /// storage does not know the study, or the default evaluator's error.
    /// A failed computation leaves the existing entry (if any) in place and
    /// is retried by the next request.
    ///
    /// # Panics
    ///
    /// Panics if the evaluator scores a parameter no trial declares (see
    /// [`compute_importances`]).
    pub fn get_importances(
        &self,
        study_id: u64,
        objective_id: usize,
        trials: &[FrozenTrial],
    ) -> Result<Arc<[ParamImportance]>> {
        let n_completed = trials.iter().filter(|t| t.state.is_complete()).count();
        if n_completed == 0 {
            return Ok(Arc::from(Vec::new()));
        }

        let lease = self.lease((study_id, objective_id));
        let mut entry = lease.slot.lock();
        if let Some(cached) = entry.as_ref().filter(|e| e.n_completed == n_completed) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace_debug!(study_id, objective_id, n_completed, "importance cache hit");
            return Ok(Arc::clone(&cached.importances));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        trace_debug!(
            study_id,
            objective_id,
            n_completed,
            cached = entry.as_ref().map(|e| e.n_completed),
            "importance cache miss"
        );

        let importances = self
            .compute(study_id, objective_id, trials)
            .inspect_err(|_| {
                self.failures.fetch_add(1, Ordering::Relaxed);
            })?;
        trace_info!(
            study_id,
            objective_id,
            n_completed,
            n_params = importances.len(),
            "importances recomputed"
        );
        *entry = Some(CacheEntry {
            n_completed,
            importances: Arc::clone(&importances),
        });
        Ok(importances)
    }

    fn compute(
        &self,
        study_id: u64,
        objective_id: usize,
        trials: &[FrozenTrial],
    ) -> Result<Arc<[ParamImportance]>> {
        let view = StudyView::new(self.storage.as_ref(), study_id, trials)?;
        let target = move |trial: &FrozenTrial| trial.objective_value(objective_id);
        let records = compute_importances(&view, &self.selector, Some(&target))?;
        Ok(records.into())
    }

    fn lease(&self, key: CacheKey) -> SlotLease<'_> {
        let slot = Arc::clone(self.slots.lock().entry(key).or_default());
        SlotLease {
            cache: self,
            key,
            slot,
        }
    }

    /// The completed-trial count the entry for a key was computed at, or
    /// `None` if nothing is cached for it.
    #[must_use]
    pub fn cached_trial_count(&self, study_id: u64, objective_id: usize) -> Option<usize> {
        let slot = self.slots.lock().get(&(study_id, objective_id)).cloned()?;
        let entry = slot.lock();
        entry.as_ref().map(|e| e.n_completed)
    }

    /// Number of keys with a cached result.
    ///
    /// Waits for computations in progress.
    #[must_use]
    pub fn len(&self) -> usize {
        let slots: Vec<Slot> = self.slots.lock().values().cloned().collect();
        slots.iter().filter(|s| s.lock().is_some()).count()
    }

    /// Returns `true` if no key has a cached result.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the hit, miss, and failure counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// The evaluator strategy in use.
    #[must_use]
    pub fn selector(&self) -> &EvaluatorSelector {
        &self.selector
    }
}

/// A builder for [`ImportanceCache`].
///
/// # Defaults
///
/// - Storage: an empty [`MemoryStorage`](crate::storage::MemoryStorage)
/// - Evaluators: [`EvaluatorSelector::detect`]
///
/// # Examples
///
/// ```
/// use param_importance::ImportanceCache;
/// use param_importance::evaluator::{EvaluatorSelector, SpearmanEvaluator};
/// use param_importance::storage::MemoryStorage;
///
/// let cache = ImportanceCache::builder()
///     .storage(MemoryStorage::new())
///     .selector(EvaluatorSelector::new(SpearmanEvaluator::new()))
///     .build();
///
/// assert!(!cache.selector().has_fast());
/// assert!(cache.is_empty());
/// ```
#[derive(Default)]
pub struct ImportanceCacheBuilder {
    storage: Option<Arc<dyn Storage>>,
    selector: Option<EvaluatorSelector>,
}

impl ImportanceCacheBuilder {
    /// Create a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the storage used to resolve study names.
    #[must_use]
    pub fn storage(mut self, storage: impl Storage + 'static) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// Share an existing storage handle.
    #[must_use]
    pub fn shared_storage(mut self, storage: Arc<dyn Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Set the evaluator strategy.
    #[must_use]
    pub fn selector(mut self, selector: EvaluatorSelector) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Build the cache with the configured options.
    #[must_use]
    pub fn build(self) -> ImportanceCache {
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(crate::storage::MemoryStorage::new()));
        let selector = self.selector.unwrap_or_else(EvaluatorSelector::detect);
        trace_debug!(selector = ?selector, "importance cache created");

        ImportanceCache {
            storage,
            selector,
            slots: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::AtomicUsize;

    use super::*;
    use crate::distribution::Distribution;
    use crate::error::Error;
    use crate::evaluator::{ImportanceEvaluator, Importances, Target};
    use crate::param::ParamValue;
    use crate::storage::MemoryStorage;
    use crate::types::TrialState;
    use crate::view::TrialSource;

    /// Scores `x` with the number of completed trials it was given.
    #[derive(Clone, Default)]
    struct Counting(Arc<AtomicUsize>);

    impl ImportanceEvaluator for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        #[allow(clippy::cast_precision_loss)]
        fn evaluate(&self, study: &dyn TrialSource, _: Option<&Target>) -> Result<Importances> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(vec![("x".into(), study.completed_trials().len() as f64)])
        }
    }

    fn trial(number: u64, state: TrialState) -> FrozenTrial {
        FrozenTrial::new(number, state)
            .param("x", ParamValue::Float(0.5), Distribution::float(0.0, 1.0))
            .values(vec![1.0, 2.0])
    }

    fn setup() -> (ImportanceCache, u64, Arc<AtomicUsize>) {
        let storage = MemoryStorage::new();
        let study = storage.create_study("s");
        let counting = Counting::default();
        let calls = Arc::clone(&counting.0);
        let cache = ImportanceCache::builder()
            .storage(storage)
            .selector(EvaluatorSelector::new(counting))
            .build();
        (cache, study, calls)
    }

    #[test]
    fn hit_returns_same_allocation() {
        let (cache, study, calls) = setup();
        let trials = vec![trial(0, TrialState::Complete)];

        let a = cache.get_importances(study, 0, &trials).unwrap();
        let b = cache.get_importances(study, 0, &trials).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                failures: 0
            }
        );
    }

    #[test]
    fn incomplete_trials_do_not_invalidate() {
        let (cache, study, calls) = setup();
        let mut trials = vec![trial(0, TrialState::Complete)];
        cache.get_importances(study, 0, &trials).unwrap();

        trials.push(trial(1, TrialState::Running));
        trials.push(trial(2, TrialState::Pruned));
        cache.get_importances(study, 0, &trials).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.cached_trial_count(study, 0), Some(1));
    }

    #[test]
    fn zero_completed_short_circuits() {
        let (cache, study, calls) = setup();
        let trials = vec![trial(0, TrialState::Running), trial(1, TrialState::Failed)];

        assert!(cache.get_importances(study, 0, &trials).unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.stats(), CacheStats::default());
        assert!(cache.cached_trial_count(study, 0).is_none());
    }

    #[test]
    fn unknown_study_is_not_cached() {
        let (cache, _, calls) = setup();
        let trials = vec![trial(0, TrialState::Complete)];

        let err = cache.get_importances(99, 0, &trials).unwrap_err();
        assert!(matches!(err, Error::StudyNotFound(99)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().failures, 1);
    }

    #[test]
    fn shrinking_count_also_recomputes() {
        let (cache, study, calls) = setup();
        let trials: Vec<FrozenTrial> = (0..3).map(|i| trial(i, TrialState::Complete)).collect();
        cache.get_importances(study, 0, &trials).unwrap();
        let fewer = cache.get_importances(study, 0, &trials[..2]).unwrap();
        assert!((fewer[0].importance - 2.0).abs() < f64::EPSILON);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.cached_trial_count(study, 0), Some(2));
    }

    #[test]
    fn failed_misses_leave_no_slots() {
        let (cache, _, _) = setup();
        let trials = vec![trial(0, TrialState::Complete)];

        for study in 100..1100 {
            assert!(cache.get_importances(study, 0, &trials).is_err());
        }
        assert!(cache.slots.lock().is_empty());
        assert_eq!(cache.stats().failures, 1000);
    }

    #[test]
    fn panicking_miss_leaves_no_slot() {
        struct Exploding;

        impl ImportanceEvaluator for Exploding {
            fn name(&self) -> &'static str {
                "exploding"
            }

            fn evaluate(&self, _: &dyn TrialSource, _: Option<&Target>) -> Result<Importances> {
                panic!("evaluator bug")
            }
        }

        let storage = MemoryStorage::new();
        let study = storage.create_study("s");
        let cache = ImportanceCache::builder()
            .storage(storage)
            .selector(EvaluatorSelector::new(Exploding))
            .build();

        let trials = vec![trial(0, TrialState::Complete)];
        let outcome = std::panic::catch_unwind(core::panic::AssertUnwindSafe(|| {
            cache.get_importances(study, 0, &trials)
        }));
        assert!(outcome.is_err());
        assert!(cache.slots.lock().is_empty());
    }

    #[test]
    fn debug_lists_entries() {
        let (cache, study, _) = setup();
        cache
            .get_importances(study, 1, &[trial(0, TrialState::Complete)])
            .unwrap();
        let text = format!("{cache:?}");
        assert!(text.contains("entries: 1"), "{text}");
    }
}
