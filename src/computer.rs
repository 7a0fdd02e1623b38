//! One importance computation: evaluate, then attach distribution kinds.

use crate::error::Result;
use crate::evaluator::{EvaluatorSelector, Target};
use crate::trial::FrozenTrial;
use crate::view::TrialSource;

/// Importance of one parameter, as served to callers.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParamImportance {
    /// Parameter name.
    pub name: String,
    /// Non-negative importance score.
    pub importance: f64,
    /// Kind name of the distribution the parameter was sampled from,
    /// e.g. `"FloatDistribution"`.
    pub distribution: String,
}

/// Compute importances for `study` and label each with its distribution.
///
/// The evaluator sees only the `Complete` trials; distribution kinds are
/// resolved against all trials. Records keep the evaluator's order.
///
/// # Errors
///
/// Propagates the default evaluator's error from [`EvaluatorSelector::evaluate`].
///
/// # Panics
///
/// Panics if the evaluator scores a parameter that no trial declares a
/// distribution for. Evaluators only score parameters taken from the
/// trials, so this indicates a broken evaluator.
pub fn compute_importances(
    study: &dyn TrialSource,
    selector: &EvaluatorSelector,
    target: Option<&Target>,
) -> Result<Vec<ParamImportance>> {
    let trials = study.trials();
    let completed = study.completed_trials();
    let scores = selector.evaluate(study, &completed, target)?;

    Ok(scores
        .into_iter()
        .map(|(name, importance)| {
            let distribution = distribution_name(&name, trials).to_owned();
            ParamImportance {
                name,
                importance,
                distribution,
            }
        })
        .collect())
}

/// Kind name of the first distribution declared for `param_name` in `trials`.
///
/// # Panics
///
/// Panics if no trial declares `param_name`.
#[must_use]
pub fn distribution_name(param_name: &str, trials: &[FrozenTrial]) -> &'static str {
    trials
        .iter()
        .find_map(|t| t.distribution(param_name))
        .map(crate::distribution::Distribution::kind_name)
        .unwrap_or_else(|| {
            panic!("parameter '{param_name}' was scored but no trial declares its distribution")
        })
}
