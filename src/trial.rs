//! Frozen trial records read from a storage backend.

use std::collections::HashMap;

use crate::distribution::Distribution;
use crate::error::{Error, Result};
use crate::param::ParamValue;
use crate::types::TrialState;

/// An immutable snapshot of one optimization run.
///
/// Trials are owned by the storage backend; importance computation only
/// ever reads copies. Parameters are keyed by name, and every parameter
/// carries the distribution it was sampled from.
///
/// # Examples
///
/// ```
/// use param_importance::{Distribution, FrozenTrial, ParamValue, TrialState};
///
/// let trial = FrozenTrial::new(0, TrialState::Complete)
///     .param("lr", ParamValue::Float(0.01), Distribution::log_float(1e-5, 1.0))
///     .values(vec![0.25]);
///
/// assert_eq!(trial.objective_value(0).unwrap(), 0.25);
/// assert!(trial.distribution("lr").is_some());
/// ```
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrozenTrial {
    /// Position of the trial within its study.
    pub number: u64,
    /// The state of the trial.
    pub state: TrialState,
    /// Sampled parameter values, keyed by parameter name.
    pub params: HashMap<String, ParamValue>,
    /// Distributions the parameters were sampled from, keyed by parameter name.
    pub distributions: HashMap<String, Distribution>,
    /// Objective values, one per objective. `None` until the trial completes.
    pub values: Option<Vec<f64>>,
}

impl FrozenTrial {
    /// Creates a trial with no parameters and no objective values.
    #[must_use]
    pub fn new(number: u64, state: TrialState) -> Self {
        Self {
            number,
            state,
            params: HashMap::new(),
            distributions: HashMap::new(),
            values: None,
        }
    }

    /// Shorthand for a completed single-objective trial.
    #[must_use]
    pub fn complete(number: u64, value: f64) -> Self {
        Self::new(number, TrialState::Complete).values(vec![value])
    }

    /// Record a parameter together with its distribution.
    #[must_use]
    pub fn param(
        mut self,
        name: impl Into<String>,
        value: ParamValue,
        distribution: Distribution,
    ) -> Self {
        let name = name.into();
        self.params.insert(name.clone(), value);
        self.distributions.insert(name, distribution);
        self
    }

    /// Set the objective values.
    #[must_use]
    pub fn values(mut self, values: Vec<f64>) -> Self {
        self.values = Some(values);
        self
    }

    /// Returns the distribution declared for `name`, if any.
    #[must_use]
    pub fn distribution(&self, name: &str) -> Option<&Distribution> {
        self.distributions.get(name)
    }

    /// Returns the value of objective `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ObjectiveOutOfRange`] if the trial has no values or
    /// fewer than `index + 1` of them.
    pub fn objective_value(&self, index: usize) -> Result<f64> {
        self.values
            .as_ref()
            .and_then(|v| v.get(index).copied())
            .ok_or(Error::ObjectiveOutOfRange {
                trial: self.number,
                objective: index,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objective_out_of_range() {
        let t = FrozenTrial::complete(4, 1.5);
        assert!((t.objective_value(0).unwrap() - 1.5).abs() < f64::EPSILON);
        assert!(matches!(
            t.objective_value(1),
            Err(Error::ObjectiveOutOfRange {
                trial: 4,
                objective: 1
            })
        ));

        let running = FrozenTrial::new(5, TrialState::Running);
        assert!(running.objective_value(0).is_err());
    }

    #[test]
    fn param_records_distribution() {
        let t = FrozenTrial::new(0, TrialState::Running).param(
            "x",
            ParamValue::Int(3),
            Distribution::int(0, 10),
        );
        assert_eq!(t.params["x"], ParamValue::Int(3));
        assert_eq!(t.distribution("x"), Some(&Distribution::int(0, 10)));
        assert!(t.distribution("y").is_none());
    }
}
