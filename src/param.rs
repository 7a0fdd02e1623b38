//! Parameter value storage types.

/// Represents a sampled parameter value.
///
/// For categorical parameters, the `Categorical` variant stores
/// the index into the distribution's choices.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ParamValue {
    /// A floating-point parameter value.
    Float(f64),
    /// An integer parameter value.
    Int(i64),
    /// A categorical parameter value, stored as an index into the choices.
    Categorical(usize),
}

impl ParamValue {
    /// Numeric view of the value; categorical indices map to their index.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Float(v) => v,
            Self::Int(v) => v as f64,
            Self::Categorical(v) => v as f64,
        }
    }
}
