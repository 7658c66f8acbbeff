//! The generic population problem and the acquisition problem that
//! implements it.
//!
//! A [`Problem`] is a minimization problem over typed decision variables
//! with at most one inequality constraint (`<= 0` is feasible). It knows
//! nothing about parameter names or raw values, so any
//! [`PopulationAlgorithm`] can drive it.

use core::cmp::Ordering;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::acquisition::{AcquisitionFunction, MinimizationObjective};
use crate::constraint::{KnownConstraints, PenaltyPolicy};
use crate::encoding::Encoder;
use crate::error::{Error, Result};
use crate::param::ParameterVector;
use crate::variable::{Gene, Variable};

/// Objective and constraint values for a batch of genomes.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    /// One objective value per genome (lower is better).
    pub objectives: Vec<f64>,
    /// One constraint value per genome (`<= 0` is feasible), or `None` for
    /// an unconstrained problem.
    pub constraints: Option<Vec<f64>>,
}

/// A single-objective minimization problem over typed variables.
pub trait Problem {
    /// The decision variables, one per gene.
    fn variables(&self) -> &[Variable];

    /// Number of inequality constraints (0 or 1).
    fn n_constraints(&self) -> usize;

    /// Evaluates a batch of genomes.
    ///
    /// # Errors
    ///
    /// Implementations return an error if a genome does not fit the
    /// variables or the underlying evaluation fails.
    fn evaluate(&self, genomes: &[Vec<Gene>]) -> Result<Evaluation>;
}

/// An evaluated member of a population.
#[derive(Clone, Debug, PartialEq)]
pub struct Individual {
    /// Decision variable values.
    pub genes: Vec<Gene>,
    /// Objective value (lower is better).
    pub objective: f64,
    /// Constraint value, `None` for unconstrained problems.
    pub constraint: Option<f64>,
}

impl Individual {
    /// Returns `true` if the individual satisfies its constraint.
    #[must_use]
    pub fn is_feasible(&self) -> bool {
        self.constraint.is_none_or(|c| c <= 0.0)
    }

    /// Constrained comparison: feasible before infeasible, two infeasible
    /// individuals by constraint violation, otherwise by objective.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self.is_feasible(), other.is_feasible()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => {
                let a = self.constraint.unwrap_or_default();
                let b = other.constraint.unwrap_or_default();
                a.total_cmp(&b)
                    .then_with(|| self.objective.total_cmp(&other.objective))
            }
            (true, true) => self.objective.total_cmp(&other.objective),
        }
    }

    /// Returns `true` if `self` ranks strictly before `other`.
    #[must_use]
    pub fn better_than(&self, other: &Self) -> bool {
        self.compare(other) == Ordering::Less
    }
}

/// Sorts a population best first; stable, so equal members keep their order.
pub fn sort_population(population: &mut [Individual]) {
    population.sort_by(Individual::compare);
}

/// Evaluates genomes and pairs them with their results.
///
/// # Errors
///
/// Propagates evaluation errors and returns [`Error::AcquisitionShape`] if
/// the problem returns the wrong number of values.
pub fn evaluate_population(problem: &dyn Problem, genomes: Vec<Vec<Gene>>) -> Result<Vec<Individual>> {
    if genomes.is_empty() {
        return Ok(Vec::new());
    }
    let Evaluation {
        objectives,
        constraints,
    } = problem.evaluate(&genomes)?;
    let shape = |got: usize| Error::AcquisitionShape {
        expected: genomes.len(),
        got,
    };
    if objectives.len() != genomes.len() {
        return Err(shape(objectives.len()));
    }
    if let Some(c) = &constraints
        && c.len() != genomes.len()
    {
        return Err(shape(c.len()));
    }
    Ok(genomes
        .into_iter()
        .zip(objectives)
        .enumerate()
        .map(|(i, (genes, objective))| Individual {
            genes,
            objective,
            constraint: constraints.as_ref().map(|c| c[i]),
        })
        .collect())
}

/// When a population search stops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Termination {
    /// Stop once at least this many genomes have been evaluated. The
    /// generation that crosses the limit completes.
    Evaluations(usize),
    /// Stop after this many generations following the initial population.
    Generations(usize),
}

impl Default for Termination {
    fn default() -> Self {
        Self::Evaluations(5000)
    }
}

impl Termination {
    /// Returns `true` once the budget is used up.
    #[must_use]
    pub fn reached(self, generations: usize, n_evals: usize) -> bool {
        match self {
            Self::Evaluations(limit) => n_evals >= limit,
            Self::Generations(limit) => generations >= limit,
        }
    }
}

/// A population-based minimizer that can drive any [`Problem`].
///
/// `observer` is called with the generation number (0 for the initial
/// population) and the population after each generation.
pub trait PopulationAlgorithm {
    /// Short name used in log events.
    fn name(&self) -> &'static str;

    /// Minimizes `problem` and returns the final population, best first.
    ///
    /// # Errors
    ///
    /// Returns configuration errors before evaluating anything and
    /// propagates evaluation errors from the problem.
    fn minimize(
        &self,
        problem: &dyn Problem,
        termination: Termination,
        rng: &mut fastrand::Rng,
        observer: &mut dyn FnMut(usize, &[Individual]),
    ) -> Result<Vec<Individual>>;
}

/// The acquisition search framed as a [`Problem`].
///
/// One gene per parameter, one objective (the negated acquisition value),
/// and one constraint (the known-constraint penalty) when constraints are
/// registered.
pub struct AcquisitionProblem<'a, A: ?Sized> {
    encoder: &'a Encoder,
    objective: &'a MinimizationObjective<'a, A>,
    constraints: &'a KnownConstraints<'a>,
    policy: PenaltyPolicy,
}

impl<'a, A: AcquisitionFunction + ?Sized> AcquisitionProblem<'a, A> {
    /// Wraps an objective and a constraint set; the penalty follows the
    /// constraint set's policy.
    #[must_use]
    pub fn new(
        encoder: &'a Encoder,
        objective: &'a MinimizationObjective<'a, A>,
        constraints: &'a KnownConstraints<'a>,
    ) -> Self {
        Self {
            encoder,
            objective,
            constraints,
            policy: constraints.policy(),
        }
    }

    /// Overrides the penalty policy.
    #[must_use]
    pub fn with_policy(mut self, policy: PenaltyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Number of acquisition evaluations so far.
    #[must_use]
    pub fn n_evals(&self) -> usize {
        self.objective.n_evals()
    }

    /// Decodes a genome into a parameter vector.
    ///
    /// # Errors
    ///
    /// Same as [`Encoder::decode_genome`].
    pub fn decode(&self, genes: &[Gene]) -> Result<ParameterVector> {
        self.encoder.decode_genome(genes)
    }
}

impl<A: AcquisitionFunction + ?Sized> Problem for AcquisitionProblem<'_, A> {
    fn variables(&self) -> &[Variable] {
        self.encoder.variables()
    }

    fn n_constraints(&self) -> usize {
        self.constraints.n_outputs()
    }

    fn evaluate(&self, genomes: &[Vec<Gene>]) -> Result<Evaluation> {
        let values = genomes
            .iter()
            .map(|g| self.encoder.genome_values(g))
            .collect::<Result<Vec<_>>>()?;
        let relaxed = values
            .iter()
            .map(|v| self.encoder.to_relaxed(v))
            .collect::<Result<Vec<_>>>()?;
        let objectives = self.objective.values(&relaxed)?;
        let constraints = (!self.constraints.is_empty()).then(|| {
            values
                .iter()
                .map(|v| self.constraints.penalty_with(self.policy, v))
                .collect()
        });
        Ok(Evaluation {
            objectives,
            constraints,
        })
    }
}
