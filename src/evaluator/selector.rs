use core::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use super::{EvaluatorFactory, FanovaEvaluator, ImportanceEvaluator, Importances, Target};
use crate::error::{Error, Result};
use crate::trial::FrozenTrial;
use crate::view::TrialSource;

/// Two-variant evaluator strategy: an optional preferred evaluator with a
/// mandatory default behind it.
///
/// The strategy is fixed at construction. Every call still guards the
/// preferred path: an error or a panic from building or running it is
/// logged and the default evaluator runs instead, so
/// [`evaluate`](Self::evaluate) only fails when the default evaluator does.
///
/// # Examples
///
/// ```
/// use param_importance::evaluator::{EvaluatorSelector, FanovaEvaluator, SpearmanEvaluator};
///
/// let selector = EvaluatorSelector::new(SpearmanEvaluator::new());
/// assert!(!selector.has_fast());
///
/// let detected = EvaluatorSelector::detect();
/// assert_eq!(detected.has_fast(), cfg!(feature = "fast-fanova"));
/// ```
#[derive(Clone)]
pub struct EvaluatorSelector {
    fast: Option<Arc<dyn EvaluatorFactory>>,
    default: Arc<dyn ImportanceEvaluator>,
}

impl core::fmt::Debug for EvaluatorSelector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EvaluatorSelector")
            .field("fast", &self.fast.as_ref().map(|x| x.name()))
            .field("default", &self.default.name())
            .finish()
    }
}

impl EvaluatorSelector {
    /// A selector that always runs `default`.
    #[must_use]
    pub fn new(default: impl ImportanceEvaluator + 'static) -> Self {
        Self {
            fast: None,
            default: Arc::new(default),
        }
    }

    /// The strategy available in this build: [`FanovaEvaluator`] as default
    /// and, with the `fast-fanova` feature, [`FastFanovaFactory`](super::FastFanovaFactory)
    /// as the preferred evaluator.
    #[must_use]
    pub fn detect() -> Self {
        let selector = Self::new(FanovaEvaluator::new());
        #[cfg(feature = "fast-fanova")]
        let selector = selector.with_fast(super::FastFanovaFactory::new());
        #[cfg(not(feature = "fast-fanova"))]
        trace_debug!("fast fANOVA not compiled in; using the default evaluator only");
        selector
    }

    /// Install `factory` as the preferred evaluator.
    #[must_use]
    pub fn with_fast(mut self, factory: impl EvaluatorFactory + 'static) -> Self {
        self.fast = Some(Arc::new(factory));
        self
    }

    /// Remove the preferred evaluator.
    #[must_use]
    pub fn without_fast(mut self) -> Self {
        self.fast = None;
        self
    }

    /// Returns `true` if a preferred evaluator is installed.
    #[must_use]
    pub fn has_fast(&self) -> bool {
        self.fast.is_some()
    }

    /// Name of the default evaluator.
    #[must_use]
    pub fn default_name(&self) -> &'static str {
        self.default.name()
    }

    /// Score the parameters of `completed_trials`, the `Complete` subset of
    /// `study`'s trials.
    ///
    /// # Errors
    ///
    /// Returns the default evaluator's error. Failures of the preferred
    /// evaluator are never returned.
    pub fn evaluate(
        &self,
        study: &dyn TrialSource,
        completed_trials: &[&FrozenTrial],
        target: Option<&Target>,
    ) -> Result<Importances> {
        if let Some(factory) = &self.fast {
            let attempt = catch_unwind(AssertUnwindSafe(|| {
                factory.build(completed_trials)?.evaluate(study, target)
            }));
            match attempt {
                Ok(Ok(importances)) => return Ok(importances),
                Ok(Err(err)) => log_fast_failure(factory.name(), &err),
                Err(payload) => log_fast_failure(factory.name(), &panic_error(factory.name(), &*payload)),
            }
        }
        self.default.evaluate(study, target)
    }
}

fn panic_error(evaluator: &'static str, payload: &(dyn Any + Send)) -> Error {
    let reason = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panicked".to_owned());
    Error::Evaluator { evaluator, reason }
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn log_fast_failure(evaluator: &'static str, err: &Error) {
    trace_warn!(evaluator, error = %err, "preferred evaluator failed; falling back to default");
}
