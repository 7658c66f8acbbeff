//! Parameter definitions: continuous ranges, discrete option lists, and
//! categorical option sets.
//!
//! # Example
//!
//! ```
//! use acqopt::parameter::Parameter;
//!
//! let temperature = Parameter::continuous("temperature", 20.0, 80.0).unwrap();
//! let loading = Parameter::discrete("loading", [0.5, 1.0, 2.5]).unwrap();
//! let solvent = Parameter::categorical("solvent", ["water", "ethanol"])
//!     .unwrap()
//!     .with_descriptors(vec![vec![1.0, 80.1], vec![0.79, 24.5]])
//!     .unwrap();
//! ```

use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::param::ParamValue;

/// The type tag of a parameter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ParameterType {
    /// A real-valued range.
    Continuous,
    /// An ordered list of numeric options.
    Discrete,
    /// A set of string options.
    Categorical,
}

impl FromStr for ParameterType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continuous" => Ok(Self::Continuous),
            "discrete" => Ok(Self::Discrete),
            "categorical" => Ok(Self::Categorical),
            _ => Err(Error::UnknownParameterType(s.to_owned())),
        }
    }
}

impl core::fmt::Display for ParameterType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Continuous => "continuous",
            Self::Discrete => "discrete",
            Self::Categorical => "categorical",
        })
    }
}

/// The domain of a parameter.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ParameterKind {
    /// Real values in `[low, high]`.
    Continuous {
        /// Lower bound (inclusive).
        low: f64,
        /// Upper bound (inclusive).
        high: f64,
    },
    /// One of an ordered list of numeric values.
    Discrete {
        /// Allowed values, in declaration order.
        options: Vec<f64>,
    },
    /// One of a set of string options.
    Categorical {
        /// Allowed options, in declaration order.
        options: Vec<String>,
        /// Optional fixed-length numeric descriptor per option.
        descriptors: Option<Vec<Vec<f64>>>,
    },
}

/// A named parameter definition.
///
/// Deserialization goes through the same checks as the constructors.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "ParameterDef"))]
pub struct Parameter {
    name: String,
    kind: ParameterKind,
}

/// Unchecked wire form of a [`Parameter`].
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct ParameterDef {
    name: String,
    kind: ParameterKind,
}

#[cfg(feature = "serde")]
impl TryFrom<ParameterDef> for Parameter {
    type Error = Error;

    fn try_from(def: ParameterDef) -> Result<Self> {
        match def.kind {
            ParameterKind::Continuous { low, high } => Self::continuous(def.name, low, high),
            ParameterKind::Discrete { options } => Self::discrete(def.name, options),
            ParameterKind::Categorical {
                options,
                descriptors,
            } => {
                let param = Self::categorical(def.name, options)?;
                match descriptors {
                    Some(descriptors) => param.with_descriptors(descriptors),
                    None => Ok(param),
                }
            }
        }
    }
}

impl Parameter {
    /// Creates a continuous parameter over `[low, high]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NonFiniteValue`] for NaN or infinite bounds and
    /// [`Error::InvalidBounds`] if `low > high`.
    pub fn continuous(name: impl Into<String>, low: f64, high: f64) -> Result<Self> {
        let name = name.into();
        if !low.is_finite() || !high.is_finite() {
            return Err(Error::NonFiniteValue(name));
        }
        if low > high {
            return Err(Error::InvalidBounds { name, low, high });
        }
        Ok(Self {
            name,
            kind: ParameterKind::Continuous { low, high },
        })
    }

    /// Creates a discrete parameter over the given option values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyOptions`] if there are no options and
    /// [`Error::NonFiniteValue`] if any option is NaN or infinite.
    pub fn discrete(name: impl Into<String>, options: impl IntoIterator<Item = f64>) -> Result<Self> {
        let name = name.into();
        let options: Vec<f64> = options.into_iter().collect();
        if options.is_empty() {
            return Err(Error::EmptyOptions(name));
        }
        if options.iter().any(|o| !o.is_finite()) {
            return Err(Error::NonFiniteValue(name));
        }
        Ok(Self {
            name,
            kind: ParameterKind::Discrete { options },
        })
    }

    /// Creates a categorical parameter over the given options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyOptions`] if there are no options.
    pub fn categorical<S: Into<String>>(
        name: impl Into<String>,
        options: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let name = name.into();
        let options: Vec<String> = options.into_iter().map(Into::into).collect();
        if options.is_empty() {
            return Err(Error::EmptyOptions(name));
        }
        Ok(Self {
            name,
            kind: ParameterKind::Categorical {
                options,
                descriptors: None,
            },
        })
    }

    /// Attaches one descriptor vector per option to a categorical parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DescriptorMismatch`] if the parameter is not
    /// categorical, the descriptor count differs from the option count,
    /// descriptors are empty, or they differ in length; and
    /// [`Error::NonFiniteValue`] for NaN or infinite entries.
    pub fn with_descriptors(mut self, descriptors: Vec<Vec<f64>>) -> Result<Self> {
        let ParameterKind::Categorical {
            options,
            descriptors: slot,
        } = &mut self.kind
        else {
            return Err(Error::DescriptorMismatch {
                name: self.name,
                reason: "only categorical parameters take descriptors",
            });
        };
        if descriptors.len() != options.len() {
            return Err(Error::DescriptorMismatch {
                name: self.name,
                reason: "need exactly one descriptor per option",
            });
        }
        let width = descriptors[0].len();
        if width == 0 {
            return Err(Error::DescriptorMismatch {
                name: self.name,
                reason: "descriptors must not be empty",
            });
        }
        if descriptors.iter().any(|d| d.len() != width) {
            return Err(Error::DescriptorMismatch {
                name: self.name,
                reason: "all descriptors must have the same length",
            });
        }
        if descriptors.iter().flatten().any(|v| !v.is_finite()) {
            return Err(Error::NonFiniteValue(self.name));
        }
        *slot = Some(descriptors);
        Ok(self)
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parameter domain.
    #[must_use]
    pub fn kind(&self) -> &ParameterKind {
        &self.kind
    }

    /// Returns the parameter type tag.
    #[must_use]
    pub fn parameter_type(&self) -> ParameterType {
        match self.kind {
            ParameterKind::Continuous { .. } => ParameterType::Continuous,
            ParameterKind::Discrete { .. } => ParameterType::Discrete,
            ParameterKind::Categorical { .. } => ParameterType::Categorical,
        }
    }

    /// Returns `true` for a categorical parameter carrying descriptors.
    #[must_use]
    pub fn has_descriptors(&self) -> bool {
        matches!(
            self.kind,
            ParameterKind::Categorical {
                descriptors: Some(_),
                ..
            }
        )
    }

    /// Returns the number of options, or `None` for a continuous parameter.
    #[must_use]
    pub fn n_options(&self) -> Option<usize> {
        match &self.kind {
            ParameterKind::Continuous { .. } => None,
            ParameterKind::Discrete { options } => Some(options.len()),
            ParameterKind::Categorical { options, .. } => Some(options.len()),
        }
    }

    /// Returns the index of the option equal to `value`, if any.
    #[must_use]
    pub fn option_index(&self, value: &ParamValue) -> Option<usize> {
        match (&self.kind, value) {
            (ParameterKind::Discrete { options }, ParamValue::Float(v)) => {
                options.iter().position(|o| o == v)
            }
            (ParameterKind::Categorical { options, .. }, ParamValue::Categorical(s)) => {
                options.iter().position(|o| o == s)
            }
            _ => None,
        }
    }

    /// Returns the value of the option at `index`.
    ///
    /// # Panics
    ///
    /// Panics if the parameter is continuous or `index` is out of range.
    /// Both indicate a bug in the caller, not bad input data.
    #[must_use]
    pub fn option_value(&self, index: usize) -> ParamValue {
        match &self.kind {
            ParameterKind::Continuous { .. } => {
                panic!("continuous parameter '{}' has no options", self.name)
            }
            ParameterKind::Discrete { options } => ParamValue::Float(options[index]),
            ParameterKind::Categorical { options, .. } => {
                ParamValue::Categorical(options[index].clone())
            }
        }
    }

    /// Returns `true` if `value` lies in this parameter's domain.
    #[must_use]
    pub fn contains(&self, value: &ParamValue) -> bool {
        match (&self.kind, value) {
            (ParameterKind::Continuous { low, high }, ParamValue::Float(v)) => {
                (*low..=*high).contains(v)
            }
            _ => self.option_index(value).is_some(),
        }
    }

    /// Checks that `value` lies in this parameter's domain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueMismatch`] describing why the value was rejected.
    pub fn check(&self, value: &ParamValue) -> Result<()> {
        if self.contains(value) {
            return Ok(());
        }
        let reason = match (&self.kind, value) {
            (ParameterKind::Categorical { .. }, ParamValue::Float(_)) => {
                "categorical parameter needs a string option"
            }
            (_, ParamValue::Categorical(_)) if !matches!(self.kind, ParameterKind::Categorical { .. }) => {
                "numeric parameter needs a float value"
            }
            (ParameterKind::Continuous { .. }, _) => "value outside bounds",
            _ => "value is not one of the options",
        };
        Err(Error::ValueMismatch {
            name: self.name.clone(),
            reason,
        })
    }

    /// Draws a uniformly random value from the domain.
    pub(crate) fn sample(&self, rng: &mut fastrand::Rng) -> ParamValue {
        match &self.kind {
            ParameterKind::Continuous { low, high } => {
                ParamValue::Float(crate::rng_util::f64_range(rng, *low, *high))
            }
            ParameterKind::Discrete { options } => {
                ParamValue::Float(options[rng.usize(0..options.len())])
            }
            ParameterKind::Categorical { options, .. } => {
                ParamValue::Categorical(options[rng.usize(0..options.len())].clone())
            }
        }
    }
}
