//! Importance evaluators and the strategy that picks between them.
//!
//! An [`ImportanceEvaluator`] turns the completed trials of a study into a
//! per-parameter score. Scores are non-negative and returned as an ordered
//! list of `(parameter_name, score)` pairs; the order is the evaluator's own
//! (the built-in evaluators sort by descending score and normalize the
//! scores to sum to 1.0).
//!
//! # Built-in evaluators
//!
//! | Evaluator | Algorithm | Feature flag |
//! |-----------|-----------|--------------|
//! | [`FanovaEvaluator`] | fANOVA main effects over a random forest | (always) |
//! | [`FastFanovaEvaluator`] | fANOVA main effects, forest fitted on the rayon pool | `fast-fanova` |
//! | [`SpearmanEvaluator`] | Absolute Spearman rank correlation | (always) |
//!
//! Evaluators only consider the *intersection search space*: parameters that
//! every completed trial sampled from the same distribution.
//!
//! # Selection
//!
//! [`EvaluatorSelector`] holds a mandatory default evaluator and an optional
//! [`EvaluatorFactory`] for a preferred fast evaluator. The fast path is
//! tried first; any error or panic it raises is logged and the default
//! evaluator runs instead.

mod correlation;
mod fanova;
#[cfg(feature = "fast-fanova")]
mod fast_fanova;
mod selector;

use std::collections::BTreeMap;

pub use correlation::SpearmanEvaluator;
pub use fanova::FanovaEvaluator;
#[cfg(feature = "fast-fanova")]
pub use fast_fanova::{FastFanovaEvaluator, FastFanovaFactory};
pub use selector::EvaluatorSelector;

use crate::distribution::Distribution;
use crate::error::{Error, Result};
use crate::trial::FrozenTrial;
use crate::view::TrialSource;

/// Selects the scalar an evaluator explains for each completed trial.
///
/// For multi-objective studies this typically picks one objective value,
/// e.g. `|t| t.objective_value(1)`.
pub type Target = dyn Fn(&FrozenTrial) -> Result<f64> + Send + Sync;

/// Raw importance scores in the evaluator's order.
pub type Importances = Vec<(String, f64)>;

/// A pluggable parameter-importance algorithm.
///
/// Implementations must be `Send + Sync`: one evaluator serves every
/// request thread of an [`ImportanceCache`](crate::ImportanceCache).
pub trait ImportanceEvaluator: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Score every parameter of `study`'s completed trials.
    ///
    /// With `target = None` the study must be single-objective and the
    /// trial's only value is explained.
    ///
    /// # Errors
    ///
    /// Implementations return an error when the trials do not support a
    /// meaningful computation, e.g. [`Error::NoCompletedTrials`].
    fn evaluate(&self, study: &dyn TrialSource, target: Option<&Target>) -> Result<Importances>;
}

/// Builds an evaluator bound to a fixed set of completed trials.
///
/// This is how the preferred fast evaluator is instantiated: once per
/// computation, from exactly the trials it will score.
pub trait EvaluatorFactory: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Instantiate an evaluator for `completed_trials`.
    ///
    /// # Errors
    ///
    /// Returns an error if the evaluator cannot be built for these trials.
    fn build(&self, completed_trials: &[&FrozenTrial]) -> Result<Box<dyn ImportanceEvaluator>>;
}

/// Evaluate `target` (or the single objective value) for one trial.
pub(crate) fn target_value(trial: &FrozenTrial, target: Option<&Target>) -> Result<f64> {
    match target {
        Some(f) => f(trial),
        None => match trial.values.as_deref() {
            Some([v]) => Ok(*v),
            Some(values) => Err(Error::TargetRequired(values.len())),
            None => trial.objective_value(0),
        },
    }
}

/// Parameters sampled by every trial from an identical distribution,
/// ordered by name.
pub(crate) fn intersection_search_space(trials: &[&FrozenTrial]) -> Vec<(String, Distribution)> {
    let Some((first, rest)) = trials.split_first() else {
        return Vec::new();
    };
    let mut space: BTreeMap<&str, &Distribution> = first
        .distributions
        .iter()
        .map(|(name, d)| (name.as_str(), d))
        .collect();
    for trial in rest {
        space.retain(|name, d| trial.distribution(name) == Some(*d));
    }
    space
        .into_iter()
        .map(|(name, d)| (name.to_owned(), d.clone()))
        .collect()
}

/// Trials encoded as a numeric design matrix over a search space.
pub(crate) struct Encoded {
    pub(crate) names: Vec<String>,
    pub(crate) rows: Vec<Vec<f64>>,
    pub(crate) targets: Vec<f64>,
}

/// Encode parameter values of `trials` over `space`, one row per trial.
pub(crate) fn encode_params(
    trials: &[&FrozenTrial],
    space: &[(String, Distribution)],
) -> Result<Vec<Vec<f64>>> {
    trials
        .iter()
        .map(|trial| {
            space
                .iter()
                .map(|(name, dist)| {
                    trial
                        .params
                        .get(name)
                        .map(|v| dist.to_internal(v))
                        .ok_or(Error::Internal("distribution declared without a value"))
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect()
}

impl Encoded {
    /// Encode `trials` and their targets, dropping rows with a non-finite
    /// target.
    pub(crate) fn new(trials: &[&FrozenTrial], target: Option<&Target>) -> Result<Self> {
        let space = intersection_search_space(trials);
        let rows = encode_params(trials, &space)?;
        let targets = trials
            .iter()
            .map(|t| target_value(t, target))
            .collect::<Result<Vec<f64>>>()?;
        Ok(Self::from_parts(
            space.into_iter().map(|(name, _)| name).collect(),
            rows,
            targets,
        ))
    }

    pub(crate) fn from_parts(names: Vec<String>, rows: Vec<Vec<f64>>, targets: Vec<f64>) -> Self {
        let (rows, targets) = rows
            .into_iter()
            .zip(targets)
            .filter(|(row, y)| y.is_finite() && row.iter().all(|x| x.is_finite()))
            .unzip();
        Self {
            names,
            rows,
            targets,
        }
    }

    /// Fail with [`Error::NoCompletedTrials`] below two usable rows.
    pub(crate) fn require_rows(&self) -> Result<()> {
        if self.rows.len() < 2 {
            return Err(Error::NoCompletedTrials);
        }
        Ok(())
    }
}

/// Rescale scores to sum to 1.0 (when positive) and sort descending.
pub(crate) fn normalize(mut scores: Importances) -> Importances {
    let total: f64 = scores.iter().map(|(_, s)| *s).sum();
    if total > 0.0 {
        for entry in &mut scores {
            entry.1 /= total;
        }
    }
    scores.sort_by(|a, b| b.1.total_cmp(&a.1));
    scores
}
