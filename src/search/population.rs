//! Population backend: runs any [`PopulationAlgorithm`] on the
//! [`AcquisitionProblem`] and turns the final population into candidates.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::Candidate;
use super::problem::{AcquisitionProblem, Individual, PopulationAlgorithm, Termination};
use crate::acquisition::{AcquisitionFunction, MinimizationObjective};
use crate::constraint::{KnownConstraints, PenaltyPolicy};
use crate::encoding::Encoder;
use crate::error::Result;
use crate::history::{GenerationRecord, Recorder};

/// Built-in algorithms for the generic-population backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AlgorithmKind {
    /// [`DifferentialEvolution`](super::DifferentialEvolution).
    #[default]
    DifferentialEvolution,
    /// [`GeneticAlgorithm`](super::GeneticAlgorithm).
    Genetic,
}

/// Backend driving a population algorithm.
pub struct PopulationBackend {
    algorithm: Box<dyn PopulationAlgorithm + Send + Sync>,
    termination: Termination,
    policy: Option<PenaltyPolicy>,
}

impl PopulationBackend {
    /// Wraps an algorithm with a termination budget.
    #[must_use]
    pub fn new(algorithm: Box<dyn PopulationAlgorithm + Send + Sync>, termination: Termination) -> Self {
        Self {
            algorithm,
            termination,
            policy: None,
        }
    }

    /// Overrides the penalty policy of the constraint set passed at
    /// search time.
    #[must_use]
    pub fn with_policy(mut self, policy: Option<PenaltyPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the algorithm name.
    #[must_use]
    pub fn algorithm_name(&self) -> &'static str {
        self.algorithm.name()
    }

    /// Returns the termination budget.
    #[must_use]
    pub fn termination(&self) -> Termination {
        self.termination
    }

    /// Runs the algorithm and returns the final population as candidates.
    pub(crate) fn search<A: AcquisitionFunction + ?Sized>(
        &self,
        encoder: &Encoder,
        objective: &MinimizationObjective<'_, A>,
        constraints: &KnownConstraints<'_>,
        rng: &mut fastrand::Rng,
        recorder: &mut Recorder,
    ) -> Result<Vec<Candidate>> {
        let mut problem = AcquisitionProblem::new(encoder, objective, constraints);
        if let Some(policy) = self.policy {
            problem = problem.with_policy(policy);
        }

        let mut observer = |generation: usize, population: &[Individual]| {
            if !recorder.is_active() {
                return;
            }
            let feasible = population.iter().filter(|m| m.is_feasible());
            let n_feasible = feasible.clone().count();
            let pool: Vec<f64> = if n_feasible > 0 {
                feasible.map(|m| m.objective).collect()
            } else {
                population.iter().map(|m| m.objective).collect()
            };
            recorder.record(GenerationRecord {
                generation,
                n_evals: problem.n_evals(),
                best_objective: pool.into_iter().fold(f64::INFINITY, f64::min),
                n_feasible,
                population_size: population.len(),
            });
        };
        let population = self
            .algorithm
            .minimize(&problem, self.termination, rng, &mut observer)?;

        population
            .into_iter()
            .map(|member| {
                let vector = problem.decode(&member.genes)?;
                Ok(Candidate {
                    feasible: constraints.is_feasible(&vector),
                    vector,
                    objective: member.objective,
                })
            })
            .collect()
    }
}

impl fmt::Debug for PopulationBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PopulationBackend")
            .field("algorithm", &self.algorithm.name())
            .field("termination", &self.termination)
            .field("policy", &self.policy)
            .finish()
    }
}
