use super::{Encoded, ImportanceEvaluator, Importances, Target, normalize};
use crate::error::{Error, Result};
use crate::fanova::{FanovaConfig, FanovaResult, compute_fanova};
use crate::view::TrialSource;

/// The default, always-available importance evaluator.
///
/// Fits a random forest to the intersection search space of the completed
/// trials and reports each parameter's fANOVA main effect, renormalized
/// so the reported scores sum to 1.0.
///
/// # Examples
///
/// ```
/// use param_importance::evaluator::{FanovaEvaluator, ImportanceEvaluator};
/// use param_importance::{Distribution, FrozenTrial, ParamValue, StudyView};
///
/// let trials: Vec<FrozenTrial> = (0..20u32)
///     .map(|i| {
///         let x = f64::from(i);
///         let y = f64::from(i * 7 % 5);
///         FrozenTrial::complete(i.into(), x * x)
///             .param("x", ParamValue::Float(x), Distribution::float(0.0, 20.0))
///             .param("y", ParamValue::Float(y), Distribution::float(0.0, 5.0))
///     })
///     .collect();
///
/// let view = StudyView::with_name(0, "demo", &trials);
/// let scores = FanovaEvaluator::new().evaluate(&view, None).unwrap();
/// assert_eq!(scores[0].0, "x");
/// ```
#[derive(Debug, Clone, Default)]
pub struct FanovaEvaluator {
    config: FanovaConfig,
}

impl FanovaEvaluator {
    /// Creates an evaluator with [`FanovaConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an evaluator with custom forest settings.
    #[must_use]
    pub fn with_config(config: FanovaConfig) -> Self {
        Self { config }
    }

    /// The forest settings in use.
    #[must_use]
    pub fn config(&self) -> &FanovaConfig {
        &self.config
    }

    /// Run the full decomposition, including pairwise interactions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Evaluator`] if the forest is configured with no
    /// trees, [`Error::NoCompletedTrials`] if fewer than two completed
    /// trials have a finite target, and propagates errors from `target`.
    pub fn analyze(&self, study: &dyn TrialSource, target: Option<&Target>) -> Result<FanovaResult> {
        if self.config.n_trees == 0 {
            return Err(Error::Evaluator {
                evaluator: "fanova",
                reason: "forest needs at least one tree".into(),
            });
        }
        let completed = study.completed_trials();
        let encoded = Encoded::new(&completed, target)?;
        if encoded.names.is_empty() {
            return Ok(FanovaResult {
                main_effects: Vec::new(),
                interactions: Vec::new(),
            });
        }
        encoded.require_rows()?;
        Ok(compute_fanova(
            &encoded.rows,
            &encoded.targets,
            &encoded.names,
            &self.config,
        ))
    }
}

impl ImportanceEvaluator for FanovaEvaluator {
    fn name(&self) -> &'static str {
        "fanova"
    }

    fn evaluate(&self, study: &dyn TrialSource, target: Option<&Target>) -> Result<Importances> {
        let result = self.analyze(study, target)?;
        Ok(normalize(result.main_effects))
    }
}
