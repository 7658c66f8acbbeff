//! Known (directly evaluable) feasibility constraints.
//!
//! A known constraint is a boolean predicate over a raw value array in
//! parameter-space order. Several predicates combine with logical AND.
//! Backends that need a numeric constraint signal use
//! [`KnownConstraints::as_penalty`], which follows the "`<= 0` is
//! feasible" convention.
//!
//! Predicates are re-evaluated for every candidate they see; they are
//! assumed cheap, pure, and total over the declared domain. A predicate
//! that panics propagates the panic.
//!
//! # Example
//!
//! ```
//! use acqopt::constraint::KnownConstraints;
//! use acqopt::param::ParamValue;
//!
//! let constraints = KnownConstraints::new().with(|p: &[ParamValue]| {
//!     p[0].as_f64().is_some_and(|x| x <= 0.8)
//! });
//! assert!(constraints.is_satisfied(&[ParamValue::Float(0.5)]));
//! assert!(constraints.penalty(&[ParamValue::Float(0.9)]) > 0.0);
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::param::{ParamValue, ParameterVector};

/// How predicate outcomes are turned into a numeric constraint value.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PenaltyPolicy {
    /// A fixed margin: `feasible` (< 0) if every predicate holds,
    /// `infeasible` (> 0) otherwise.
    Margin {
        /// Value reported for feasible points.
        feasible: f64,
        /// Value reported for infeasible points.
        infeasible: f64,
    },
    /// `-scale` if every predicate holds, otherwise `scale` times the
    /// number of violated predicates.
    ViolationCount {
        /// Positive scale factor.
        scale: f64,
    },
}

impl Default for PenaltyPolicy {
    fn default() -> Self {
        Self::Margin {
            feasible: -2.0,
            infeasible: 2.0,
        }
    }
}

impl PenaltyPolicy {
    /// Checks that the policy separates feasible from infeasible points.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPenalty`] if the feasible value is not
    /// negative or the infeasible value is not positive.
    pub fn validate(&self) -> Result<()> {
        let ok = match *self {
            Self::Margin {
                feasible,
                infeasible,
            } => feasible < 0.0 && infeasible > 0.0,
            Self::ViolationCount { scale } => scale > 0.0 && scale.is_finite(),
        };
        if ok { Ok(()) } else { Err(Error::InvalidPenalty) }
    }
}

type Predicate<'a> = Box<dyn Fn(&[ParamValue]) -> bool + 'a>;

/// A conjunction of known constraint predicates.
#[derive(Default)]
pub struct KnownConstraints<'a> {
    predicates: Vec<Predicate<'a>>,
    policy: PenaltyPolicy,
}

impl<'a> KnownConstraints<'a> {
    /// Creates an empty constraint set (everything is feasible).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a predicate; builder style.
    #[must_use]
    pub fn with(mut self, predicate: impl Fn(&[ParamValue]) -> bool + 'a) -> Self {
        self.push(predicate);
        self
    }

    /// Adds a predicate.
    pub fn push(&mut self, predicate: impl Fn(&[ParamValue]) -> bool + 'a) {
        self.predicates.push(Box::new(predicate));
    }

    /// Replaces the penalty policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPenalty`] for a policy that does not separate
    /// feasible from infeasible points.
    pub fn with_policy(mut self, policy: PenaltyPolicy) -> Result<Self> {
        policy.validate()?;
        self.policy = policy;
        Ok(self)
    }

    /// Returns the penalty policy.
    #[must_use]
    pub fn policy(&self) -> PenaltyPolicy {
        self.policy
    }

    /// Returns `true` if no predicates are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Returns the number of registered predicates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Number of numeric constraint outputs a backend should expect:
    /// 0 without predicates, 1 otherwise.
    #[must_use]
    pub fn n_outputs(&self) -> usize {
        usize::from(!self.is_empty())
    }

    /// Returns `true` if every predicate holds for `values`.
    #[must_use]
    pub fn is_satisfied(&self, values: &[ParamValue]) -> bool {
        self.predicates.iter().all(|p| p(values))
    }

    /// Returns `true` if every predicate holds for the vector.
    #[must_use]
    pub fn is_feasible(&self, vector: &ParameterVector) -> bool {
        self.is_satisfied(vector.values())
    }

    /// Counts the predicates that fail for `values`.
    #[must_use]
    pub fn violations(&self, values: &[ParamValue]) -> usize {
        self.predicates.iter().filter(|p| !p(values)).count()
    }

    /// Numeric constraint value for one point under the current policy.
    #[must_use]
    pub fn penalty(&self, values: &[ParamValue]) -> f64 {
        self.penalty_with(self.policy, values)
    }

    /// Numeric constraint value for one point under an explicit policy.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn penalty_with(&self, policy: PenaltyPolicy, values: &[ParamValue]) -> f64 {
        match policy {
            PenaltyPolicy::Margin {
                feasible,
                infeasible,
            } => {
                if self.is_satisfied(values) {
                    feasible
                } else {
                    infeasible
                }
            }
            PenaltyPolicy::ViolationCount { scale } => match self.violations(values) {
                0 => -scale,
                n => scale * n as f64,
            },
        }
    }

    /// Numeric constraint values for a batch of points.
    #[must_use]
    pub fn as_penalty(&self, vectors: &[ParameterVector]) -> Vec<f64> {
        vectors.iter().map(|v| self.penalty(v.values())).collect()
    }
}

impl core::fmt::Debug for KnownConstraints<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KnownConstraints")
            .field("predicates", &self.predicates.len())
            .field("policy", &self.policy)
            .finish()
    }
}
