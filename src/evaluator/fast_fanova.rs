use rayon::prelude::*;

use super::{
    Encoded, EvaluatorFactory, ImportanceEvaluator, Importances, Target, encode_params,
    intersection_search_space, normalize, target_value,
};
use crate::error::{Error, Result};
use crate::fanova::{FanovaConfig, Forest, RegressionTree, tree_rng};
use crate::trial::FrozenTrial;
use crate::view::TrialSource;

/// fANOVA main effects with trees and marginals computed on the rayon
/// thread pool.
///
/// Bound to the completed trials it was built from: the search space and
/// the design matrix are encoded once by [`FastFanovaFactory::build`], and
/// [`evaluate`](ImportanceEvaluator::evaluate) only has to compute targets,
/// fit the forest, and marginalize. Pairwise interactions are skipped.
///
/// Every tree is seeded from its index, so for a seeded [`FanovaConfig`]
/// the scores do not depend on the number of threads and match the main
/// effects of [`FanovaEvaluator`](super::FanovaEvaluator) up to rounding.
#[derive(Debug, Clone)]
pub struct FastFanovaEvaluator {
    config: FanovaConfig,
    names: Vec<String>,
    rows: Vec<Vec<f64>>,
    trials: Vec<FrozenTrial>,
}

impl FastFanovaEvaluator {
    fn fit_forest(&self, encoded: &Encoded) -> Forest {
        let trees = (0..self.config.n_trees)
            .into_par_iter()
            .map(|i| {
                RegressionTree::fit(
                    &encoded.rows,
                    &encoded.targets,
                    &self.config,
                    &mut tree_rng(self.config.seed, i),
                )
            })
            .collect();
        Forest::from_trees(trees)
    }
}

impl ImportanceEvaluator for FastFanovaEvaluator {
    fn name(&self) -> &'static str {
        "fast-fanova"
    }

    fn evaluate(&self, _study: &dyn TrialSource, target: Option<&Target>) -> Result<Importances> {
        if self.names.is_empty() {
            return Ok(Vec::new());
        }
        let targets = self
            .trials
            .iter()
            .map(|t| target_value(t, target))
            .collect::<Result<Vec<f64>>>()?;
        let encoded = Encoded::from_parts(self.names.clone(), self.rows.clone(), targets);
        encoded.require_rows()?;

        let forest = self.fit_forest(&encoded);
        let main_var: Vec<f64> = (0..encoded.names.len())
            .into_par_iter()
            .map(|j| forest.marginal_variance(&encoded.rows, &[j]))
            .collect();

        Ok(normalize(
            encoded.names.into_iter().zip(main_var).collect(),
        ))
    }
}

/// Builds a [`FastFanovaEvaluator`] for each computation.
///
/// This is the preferred evaluator installed by
/// [`EvaluatorSelector::detect`](super::EvaluatorSelector::detect).
#[derive(Debug, Clone, Default)]
pub struct FastFanovaFactory {
    config: FanovaConfig,
}

impl FastFanovaFactory {
    /// Creates a factory with [`FanovaConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory with custom forest settings.
    #[must_use]
    pub fn with_config(config: FanovaConfig) -> Self {
        Self { config }
    }
}

impl EvaluatorFactory for FastFanovaFactory {
    fn name(&self) -> &'static str {
        "fast-fanova"
    }

    fn build(&self, completed_trials: &[&FrozenTrial]) -> Result<Box<dyn ImportanceEvaluator>> {
        if self.config.n_trees == 0 {
            return Err(Error::Evaluator {
                evaluator: "fast-fanova",
                reason: "forest needs at least one tree".into(),
            });
        }
        let space = intersection_search_space(completed_trials);
        let rows = encode_params(completed_trials, &space)?;
        Ok(Box::new(FastFanovaEvaluator {
            config: self.config.clone(),
            names: space.into_iter().map(|(name, _)| name).collect(),
            rows,
            trials: completed_trials.iter().map(|&t| t.clone()).collect(),
        }))
    }
}
