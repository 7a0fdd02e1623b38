//! Parameter distribution types.

use crate::param::ParamValue;

/// Distribution for floating-point parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FloatDistribution {
    /// Lower bound (inclusive).
    pub low: f64,
    /// Upper bound (inclusive).
    pub high: f64,
    /// Whether values were sampled in log space.
    pub log_scale: bool,
    /// Optional step size for discretization.
    pub step: Option<f64>,
}

/// Distribution for integer parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntDistribution {
    /// Lower bound (inclusive).
    pub low: i64,
    /// Upper bound (inclusive).
    pub high: i64,
    /// Whether values were sampled in log space.
    pub log_scale: bool,
    /// Optional step size for discretization.
    pub step: Option<i64>,
}

/// Distribution for categorical parameters.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CategoricalDistribution {
    /// Display labels of the available choices.
    pub choices: Vec<String>,
}

/// Enum wrapping all parameter distribution types.
///
/// The [`kind_name`](Distribution::kind_name) is what importance records
/// report as a parameter's distribution.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Distribution {
    /// A floating-point distribution.
    Float(FloatDistribution),
    /// An integer distribution.
    Int(IntDistribution),
    /// A categorical distribution.
    Categorical(CategoricalDistribution),
}

impl Distribution {
    /// Uniform float distribution over `[low, high]`.
    #[must_use]
    pub fn float(low: f64, high: f64) -> Self {
        Self::Float(FloatDistribution {
            low,
            high,
            log_scale: false,
            step: None,
        })
    }

    /// Log-uniform float distribution over `[low, high]`.
    #[must_use]
    pub fn log_float(low: f64, high: f64) -> Self {
        Self::Float(FloatDistribution {
            low,
            high,
            log_scale: true,
            step: None,
        })
    }

    /// Uniform integer distribution over `[low, high]`.
    #[must_use]
    pub fn int(low: i64, high: i64) -> Self {
        Self::Int(IntDistribution {
            low,
            high,
            log_scale: false,
            step: None,
        })
    }

    /// Categorical distribution over the given choice labels.
    #[must_use]
    pub fn categorical<S: Into<String>>(choices: impl IntoIterator<Item = S>) -> Self {
        Self::Categorical(CategoricalDistribution {
            choices: choices.into_iter().map(Into::into).collect(),
        })
    }

    /// The distribution's type name, e.g. `"FloatDistribution"`.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Float(_) => "FloatDistribution",
            Self::Int(_) => "IntDistribution",
            Self::Categorical(_) => "CategoricalDistribution",
        }
    }

    /// Map a sampled value into the numeric space evaluators fit models in.
    ///
    /// Log-scaled distributions are mapped through `ln`; categorical
    /// values map to their choice index.
    #[must_use]
    pub fn to_internal(&self, value: &ParamValue) -> f64 {
        let raw = value.as_f64();
        match self {
            Self::Float(FloatDistribution {
                log_scale: true, ..
            })
            | Self::Int(IntDistribution {
                log_scale: true, ..
            }) => raw.ln(),
            _ => raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names() {
        assert_eq!(Distribution::float(0.0, 1.0).kind_name(), "FloatDistribution");
        assert_eq!(Distribution::log_float(1e-3, 1.0).kind_name(), "FloatDistribution");
        assert_eq!(Distribution::int(0, 5).kind_name(), "IntDistribution");
        assert_eq!(
            Distribution::categorical(["a", "b"]).kind_name(),
            "CategoricalDistribution"
        );
    }

    #[test]
    fn log_scale_maps_through_ln() {
        let d = Distribution::log_float(1e-3, 10.0);
        let v = d.to_internal(&ParamValue::Float(core::f64::consts::E));
        assert!((v - 1.0).abs() < 1e-12);

        let d = Distribution::categorical(["a", "b", "c"]);
        assert!((d.to_internal(&ParamValue::Categorical(2)) - 2.0).abs() < 1e-12);
    }
}
