//! Ordered parameter spaces and their problem-type classification.

use std::collections::HashSet;
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::param::{ParamValue, ParameterVector};
use crate::parameter::{Parameter, ParameterType};

/// Which parameter types a space mixes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProblemType {
    /// Only continuous parameters.
    FullyContinuous,
    /// Only discrete parameters.
    FullyDiscrete,
    /// Only categorical parameters.
    FullyCategorical,
    /// Discrete and continuous parameters.
    MixedDiscCont,
    /// Categorical and continuous parameters.
    MixedCatCont,
    /// Categorical and discrete parameters.
    MixedCatDisc,
    /// All three parameter types.
    MixedCatDiscCont,
}

impl ProblemType {
    /// Returns `true` if the space contains at least one categorical parameter.
    #[must_use]
    pub fn has_categorical(self) -> bool {
        matches!(
            self,
            Self::FullyCategorical | Self::MixedCatCont | Self::MixedCatDisc | Self::MixedCatDiscCont
        )
    }
}

/// Classify a list of parameters by the types it mixes.
///
/// # Panics
///
/// Panics on an empty list; [`ParameterSpace::new`] rejects those first.
#[must_use]
pub fn classify(params: &[Parameter]) -> ProblemType {
    let has = |t: ParameterType| params.iter().any(|p| p.parameter_type() == t);
    match (
        has(ParameterType::Continuous),
        has(ParameterType::Discrete),
        has(ParameterType::Categorical),
    ) {
        (true, false, false) => ProblemType::FullyContinuous,
        (false, true, false) => ProblemType::FullyDiscrete,
        (false, false, true) => ProblemType::FullyCategorical,
        (true, true, false) => ProblemType::MixedDiscCont,
        (true, false, true) => ProblemType::MixedCatCont,
        (false, true, true) => ProblemType::MixedCatDisc,
        (true, true, true) => ProblemType::MixedCatDiscCont,
        (false, false, false) => panic!("cannot classify an empty parameter list"),
    }
}

/// An ordered, immutable sequence of uniquely named parameters.
///
/// The order is shared by every representation of a point: raw value
/// arrays, [`ParameterVector`]s, and both encoded forms.
///
/// # Example
///
/// ```
/// use acqopt::parameter::Parameter;
/// use acqopt::space::{ParameterSpace, ProblemType};
///
/// let space = ParameterSpace::new(vec![
///     Parameter::categorical("catalyst", ["Pd", "Ni", "Cu"]).unwrap(),
///     Parameter::discrete("loading", [0.0, 0.25, 0.5, 0.75, 1.0]).unwrap(),
/// ])
/// .unwrap();
/// assert_eq!(space.problem_type(), ProblemType::MixedCatDisc);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSpace {
    params: Vec<Parameter>,
    names: Arc<[String]>,
    problem_type: ProblemType,
    has_descriptors: bool,
}

impl ParameterSpace {
    /// Creates a space from parameters in their canonical order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptySpace`] for an empty list and
    /// [`Error::DuplicateParameter`] if two parameters share a name.
    pub fn new(params: Vec<Parameter>) -> Result<Self> {
        if params.is_empty() {
            return Err(Error::EmptySpace);
        }
        let mut seen = HashSet::with_capacity(params.len());
        for p in &params {
            if !seen.insert(p.name()) {
                return Err(Error::DuplicateParameter(p.name().to_owned()));
            }
        }
        let names: Arc<[String]> = params.iter().map(|p| p.name().to_owned()).collect();
        let problem_type = classify(&params);
        let has_descriptors = params.iter().any(Parameter::has_descriptors);
        Ok(Self {
            params,
            names,
            problem_type,
            has_descriptors,
        })
    }

    /// Returns the parameters in order.
    #[must_use]
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Returns the parameter names in order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub(crate) fn shared_names(&self) -> Arc<[String]> {
        Arc::clone(&self.names)
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Always `false`; empty spaces cannot be constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the parameter with the given name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name() == name)
    }

    /// Returns the cached problem-type classification.
    #[must_use]
    pub fn problem_type(&self) -> ProblemType {
        self.problem_type
    }

    /// Returns `true` if any categorical parameter carries descriptors.
    #[must_use]
    pub fn has_descriptors(&self) -> bool {
        self.has_descriptors
    }

    /// Checks a raw value array against the space.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] for a wrong length and
    /// [`Error::ValueMismatch`] for a value outside its parameter's domain.
    pub fn check(&self, values: &[ParamValue]) -> Result<()> {
        if values.len() != self.params.len() {
            return Err(Error::DimensionMismatch {
                expected: self.params.len(),
                got: values.len(),
            });
        }
        self.params
            .iter()
            .zip(values)
            .try_for_each(|(p, v)| p.check(v))
    }

    /// Returns `true` if `values` is a valid point of this space.
    #[must_use]
    pub fn contains(&self, values: &[ParamValue]) -> bool {
        self.check(values).is_ok()
    }

    /// Builds a [`ParameterVector`] from raw values.
    ///
    /// # Errors
    ///
    /// Same as [`check`](Self::check).
    pub fn vector(&self, values: Vec<ParamValue>) -> Result<ParameterVector> {
        self.check(&values)?;
        Ok(ParameterVector::new(self.shared_names(), values))
    }

    /// Draws a uniformly random raw assignment.
    ///
    /// Continuous parameters are uniform over their range, discrete and
    /// categorical parameters uniform over their options.
    pub fn sample_random(&self, rng: &mut fastrand::Rng) -> Vec<ParamValue> {
        self.params.iter().map(|p| p.sample(rng)).collect()
    }

    /// Number of distinct categorical assignments, saturating at `usize::MAX`.
    ///
    /// Only categorical parameters without descriptors are counted when
    /// `plain_only` is set.
    #[must_use]
    pub fn categorical_combinations(&self, plain_only: bool) -> usize {
        self.params
            .iter()
            .filter(|p| p.parameter_type() == ParameterType::Categorical)
            .filter(|p| !plain_only || !p.has_descriptors())
            .filter_map(Parameter::n_options)
            .fold(1usize, usize::saturating_mul)
    }
}
