//! Decision-variable domains for population-based search.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Domain of a real-valued decision variable.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RealDomain {
    /// Lower bound (inclusive).
    pub low: f64,
    /// Upper bound (inclusive).
    pub high: f64,
}

/// Domain of an ordered integer index `0..n_values`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IndexDomain {
    /// Number of admissible indices.
    pub n_values: usize,
}

/// Domain of an unordered choice among `n_choices` options.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChoiceDomain {
    /// Number of options.
    pub n_choices: usize,
}

/// A typed decision variable of a [`Problem`](crate::search::Problem).
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Variable {
    /// A real value (continuous parameters).
    Real(RealDomain),
    /// An ordered option index (discrete parameters).
    Index(IndexDomain),
    /// An unordered option (categorical parameters).
    Choice(ChoiceDomain),
}

/// One typed entry of a native encoded point.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Gene {
    /// Raw continuous value.
    Real(f64),
    /// Index into a discrete parameter's option list.
    Index(usize),
    /// Index into a categorical parameter's option list.
    Choice(usize),
}

impl Gene {
    /// Returns `true` if the gene's type matches the variable and its value
    /// lies inside the domain.
    #[must_use]
    pub fn fits(&self, variable: &Variable) -> bool {
        match (self, variable) {
            (Self::Real(v), Variable::Real(d)) => (d.low..=d.high).contains(v),
            (Self::Index(i), Variable::Index(d)) => *i < d.n_values,
            (Self::Choice(i), Variable::Choice(d)) => *i < d.n_choices,
            _ => false,
        }
    }

    /// Exact equality used for duplicate elimination.
    pub(crate) fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Real(a), Self::Real(b)) => a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }
}

/// Draw a random gene for a variable.
pub(crate) fn sample_gene(rng: &mut fastrand::Rng, variable: &Variable) -> Gene {
    match variable {
        Variable::Real(d) => Gene::Real(crate::rng_util::f64_range(rng, d.low, d.high)),
        Variable::Index(d) => Gene::Index(rng.usize(0..d.n_values)),
        Variable::Choice(d) => Gene::Choice(rng.usize(0..d.n_choices)),
    }
}

/// Draw a random genome, one gene per variable.
pub(crate) fn sample_genome(rng: &mut fastrand::Rng, variables: &[Variable]) -> Vec<Gene> {
    variables.iter().map(|v| sample_gene(rng, v)).collect()
}

/// Exact genome equality used for duplicate elimination.
pub(crate) fn same_genome(a: &[Gene], b: &[Gene]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same(y))
}
