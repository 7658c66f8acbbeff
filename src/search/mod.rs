//! Search backends and the generic population problem.
//!
//! | Backend | Encoding | Strategy |
//! |---------|----------|----------|
//! | [`GradientBackend`] | relaxed | multi-start Adam with projection onto `[0, 1]^d` |
//! | [`PopulationBackend`] + [`GeneticAlgorithm`] | native | elitist GA with mixed-variable operators |
//! | [`PopulationBackend`] + [`DifferentialEvolution`] | native | mixed-variable DE |
//!
//! Population algorithms only see the [`Problem`] trait, so a custom
//! [`PopulationAlgorithm`] can be plugged into the optimizer without
//! knowing anything about parameter names or raw values.

mod de;
mod genetic;
mod gradient;
mod population;
mod problem;

pub use de::{DifferentialEvolution, DifferentialEvolutionConfig, DifferentialEvolutionStrategy};
pub use genetic::{GeneticAlgorithm, GeneticConfig};
pub use gradient::{GradientBackend, GradientConfig, StartInit};
pub use population::{AlgorithmKind, PopulationBackend};
pub use problem::{
    AcquisitionProblem, Evaluation, Individual, PopulationAlgorithm, Problem, Termination,
    evaluate_population, sort_population,
};

use crate::param::ParameterVector;

/// A decoded, scored search result.
#[derive(Clone, Debug)]
pub(crate) struct Candidate {
    pub(crate) vector: ParameterVector,
    /// Objective value (negated acquisition).
    pub(crate) objective: f64,
    pub(crate) feasible: bool,
}

/// Ranks candidates best first: feasible before infeasible, then by
/// objective. Stable, so ties keep their search order.
pub(crate) fn rank(candidates: &mut [Candidate]) {
    candidates.sort_by(|a, b| {
        b.feasible
            .cmp(&a.feasible)
            .then_with(|| a.objective.total_cmp(&b.objective))
    });
}
