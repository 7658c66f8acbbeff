//! Raw parameter values and parameter vectors.

use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A raw (external) parameter value.
///
/// Continuous and discrete parameters carry a float, categorical
/// parameters carry the literal option string.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParamValue {
    /// A continuous value or a discrete option value.
    Float(f64),
    /// A categorical option.
    Categorical(String),
}

impl ParamValue {
    /// Returns the float payload, or `None` for a categorical value.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Categorical(_) => None,
        }
    }

    /// Returns the option string, or `None` for a float value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Float(_) => None,
            Self::Categorical(s) => Some(s),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Categorical(s.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::Categorical(s)
    }
}

impl core::fmt::Display for ParamValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Categorical(s) => f.write_str(s),
        }
    }
}

/// One point of a parameter space: a value per parameter, in space order.
///
/// Parameter vectors are produced by the encoder and are the result type
/// of [`AcquisitionOptimizer::optimize`](crate::AcquisitionOptimizer::optimize).
/// Values are always inside the declared domain of their parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterVector {
    names: Arc<[String]>,
    values: Vec<ParamValue>,
}

impl ParameterVector {
    pub(crate) fn new(names: Arc<[String]>, values: Vec<ParamValue>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self { names, values }
    }

    /// Returns the value of the named parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.values[i])
    }

    /// Returns the values in parameter-space order.
    #[must_use]
    pub fn values(&self) -> &[ParamValue] {
        &self.values
    }

    /// Returns the parameter names in space order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Returns an owned copy of the values, the form known constraints and
    /// the previously-measured set use.
    #[must_use]
    pub fn to_array(&self) -> Vec<ParamValue> {
        self.values.clone()
    }

    /// Consumes the vector and returns its values.
    #[must_use]
    pub fn into_values(self) -> Vec<ParamValue> {
        self.values
    }

    /// Iterates over `(name, value)` pairs in space order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.names.iter().map(String::as_str).zip(self.values.iter())
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the vector has no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl core::fmt::Display for ParameterVector {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}: {value}")?;
        }
        f.write_str("}")
    }
}
