//! Genetic algorithm over natively typed genomes.
//!
//! Each generation draws parents by binary tournament, recombines them and
//! mutates the children with operators chosen per variable type:
//!
//! | Variable | Crossover | Mutation |
//! |----------|-----------|----------|
//! | [`Variable::Real`] | SBX | polynomial |
//! | [`Variable::Index`] | SBX on the index, rounded | polynomial on the index, rounded |
//! | [`Variable::Choice`] | uniform swap | random reset |
//!
//! Survival is elitist (μ + λ): parents and offspring are merged, ranked
//! with the constrained comparison of [`Individual::compare`], and the best
//! `pop_size` are kept. The returned population is therefore ordered best
//! first, feasible members ahead of infeasible ones.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::problem::{
    Individual, PopulationAlgorithm, Problem, Termination, evaluate_population, sort_population,
};
use crate::error::{Error, Result};
use crate::rng_util;
use crate::variable::{Gene, Variable, sample_genome, same_genome};

/// Operator settings of the [`GeneticAlgorithm`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GeneticConfig {
    /// Probability that a pair of parents is recombined. Default: 0.9.
    pub crossover_prob: f64,
    /// SBX distribution index; larger keeps children closer to the
    /// parents. Default: 15.
    pub crossover_eta: f64,
    /// Polynomial mutation distribution index. Default: 20.
    pub mutation_eta: f64,
    /// Per-gene mutation probability. Default: `1 / n_variables`.
    pub mutation_prob: Option<f64>,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            crossover_prob: 0.9,
            crossover_eta: 15.0,
            mutation_eta: 20.0,
            mutation_prob: None,
        }
    }
}

impl GeneticConfig {
    /// Checks probabilities and distribution indices.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for out-of-range settings.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.crossover_prob) {
            return Err(Error::InvalidConfig("crossover_prob must be in [0, 1]"));
        }
        if !(self.crossover_eta > 0.0 && self.mutation_eta > 0.0) {
            return Err(Error::InvalidConfig("distribution indices must be positive"));
        }
        if self.mutation_prob.is_some_and(|p| !(0.0..=1.0).contains(&p)) {
            return Err(Error::InvalidConfig("mutation_prob must be in [0, 1]"));
        }
        Ok(())
    }
}

/// Retry factor for drawing unique genomes.
const UNIQUE_ATTEMPTS: usize = 10;

/// Elitist genetic algorithm with mixed-variable operators.
///
/// # Example
///
/// ```
/// use acqopt::search::{GeneticAlgorithm, GeneticConfig};
///
/// let ga = GeneticAlgorithm::new(40)
///     .with_config(GeneticConfig {
///         crossover_prob: 0.8,
///         ..GeneticConfig::default()
///     })
///     .eliminate_duplicates(false);
/// assert_eq!(ga.pop_size(), 40);
/// ```
#[derive(Clone, Debug)]
pub struct GeneticAlgorithm {
    pop_size: usize,
    eliminate_duplicates: bool,
    config: GeneticConfig,
}

impl GeneticAlgorithm {
    /// Creates a genetic algorithm with default operators and duplicate
    /// elimination enabled.
    #[must_use]
    pub fn new(pop_size: usize) -> Self {
        Self {
            pop_size,
            eliminate_duplicates: true,
            config: GeneticConfig::default(),
        }
    }

    /// Replaces the operator settings.
    #[must_use]
    pub fn with_config(mut self, config: GeneticConfig) -> Self {
        self.config = config;
        self
    }

    /// Drops offspring identical to a population member or an earlier
    /// offspring before they are evaluated. Default: `true`.
    #[must_use]
    pub fn eliminate_duplicates(mut self, enabled: bool) -> Self {
        self.eliminate_duplicates = enabled;
        self
    }

    /// Returns the population size.
    #[must_use]
    pub fn pop_size(&self) -> usize {
        self.pop_size
    }

    fn is_new(&self, genome: &[Gene], population: &[Individual], offspring: &[Vec<Gene>]) -> bool {
        !self.eliminate_duplicates
            || !(population.iter().any(|p| same_genome(&p.genes, genome))
                || offspring.iter().any(|o| same_genome(o, genome)))
    }

    fn initial_genomes(&self, rng: &mut fastrand::Rng, variables: &[Variable]) -> Vec<Vec<Gene>> {
        let mut genomes: Vec<Vec<Gene>> = Vec::with_capacity(self.pop_size);
        let mut attempts = 0;
        while genomes.len() < self.pop_size && attempts < self.pop_size * UNIQUE_ATTEMPTS {
            attempts += 1;
            let genome = sample_genome(rng, variables);
            if self.is_new(&genome, &[], &genomes) {
                genomes.push(genome);
            }
        }
        genomes
    }

    fn offspring(
        &self,
        rng: &mut fastrand::Rng,
        variables: &[Variable],
        population: &[Individual],
    ) -> Vec<Vec<Gene>> {
        let mut offspring: Vec<Vec<Gene>> = Vec::with_capacity(self.pop_size);
        let mut attempts = 0;
        while offspring.len() < self.pop_size && attempts < self.pop_size * UNIQUE_ATTEMPTS {
            attempts += 1;
            let p1 = tournament(rng, population);
            let p2 = tournament(rng, population);
            let (mut c1, mut c2) = self.crossover(rng, &p1.genes, &p2.genes, variables);
            self.mutate(rng, &mut c1, variables);
            self.mutate(rng, &mut c2, variables);
            for child in [c1, c2] {
                if offspring.len() < self.pop_size && self.is_new(&child, population, &offspring) {
                    offspring.push(child);
                }
            }
        }
        offspring
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn crossover(
        &self,
        rng: &mut fastrand::Rng,
        parent1: &[Gene],
        parent2: &[Gene],
        variables: &[Variable],
    ) -> (Vec<Gene>, Vec<Gene>) {
        let mut child1 = parent1.to_vec();
        let mut child2 = parent2.to_vec();
        if rng.f64() > self.config.crossover_prob {
            return (child1, child2);
        }
        let eta = self.config.crossover_eta;

        for (i, variable) in variables.iter().enumerate() {
            match (parent1[i], parent2[i], variable) {
                (Gene::Real(p1), Gene::Real(p2), Variable::Real(d)) => {
                    if (p1 - p2).abs() < 1e-14 {
                        continue;
                    }
                    let (c1, c2) = sbx(rng, p1, p2, d.low, d.high, eta);
                    child1[i] = Gene::Real(c1);
                    child2[i] = Gene::Real(c2);
                }
                (Gene::Index(p1), Gene::Index(p2), Variable::Index(d)) => {
                    if p1 == p2 {
                        continue;
                    }
                    let high = (d.n_values - 1) as f64;
                    let (c1, c2) = sbx(rng, p1 as f64, p2 as f64, 0.0, high, eta);
                    child1[i] = Gene::Index(c1.round().clamp(0.0, high) as usize);
                    child2[i] = Gene::Index(c2.round().clamp(0.0, high) as usize);
                }
                (Gene::Choice(_), Gene::Choice(_), Variable::Choice(_)) => {
                    if rng.bool() {
                        core::mem::swap(&mut child1[i], &mut child2[i]);
                    }
                }
                _ => {}
            }
        }

        (child1, child2)
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn mutate(&self, rng: &mut fastrand::Rng, genome: &mut [Gene], variables: &[Variable]) {
        if genome.is_empty() {
            return;
        }
        let prob = self
            .config
            .mutation_prob
            .unwrap_or(1.0 / genome.len() as f64);
        let eta = self.config.mutation_eta;

        for (gene, variable) in genome.iter_mut().zip(variables) {
            if rng.f64() >= prob {
                continue;
            }
            *gene = match (*gene, variable) {
                (Gene::Real(x), Variable::Real(d)) => {
                    Gene::Real(polynomial_mutation(rng, x, d.low, d.high, eta))
                }
                (Gene::Index(i), Variable::Index(d)) => {
                    let high = (d.n_values - 1) as f64;
                    let m = polynomial_mutation(rng, i as f64, 0.0, high, eta);
                    Gene::Index(m.round().clamp(0.0, high) as usize)
                }
                (Gene::Choice(_), Variable::Choice(d)) => Gene::Choice(rng.usize(0..d.n_choices)),
                (other, _) => other,
            };
        }
    }
}

impl PopulationAlgorithm for GeneticAlgorithm {
    fn name(&self) -> &'static str {
        "genetic"
    }

    fn minimize(
        &self,
        problem: &dyn Problem,
        termination: Termination,
        rng: &mut fastrand::Rng,
        observer: &mut dyn FnMut(usize, &[Individual]),
    ) -> Result<Vec<Individual>> {
        if self.pop_size < 2 {
            return Err(Error::PopulationTooSmall {
                min: 2,
                got: self.pop_size,
            });
        }
        self.config.validate()?;
        let variables = problem.variables();

        let genomes = self.initial_genomes(rng, variables);
        let mut n_evals = genomes.len();
        let mut population = evaluate_population(problem, genomes)?;
        sort_population(&mut population);
        observer(0, &population);

        let mut generation = 0;
        while !population.is_empty() && !termination.reached(generation, n_evals) {
            let offspring = self.offspring(rng, variables, &population);
            if offspring.is_empty() {
                trace_debug!(generation, "no new offspring, stopping early");
                break;
            }
            n_evals += offspring.len();
            population.extend(evaluate_population(problem, offspring)?);
            sort_population(&mut population);
            population.truncate(self.pop_size);
            generation += 1;
            observer(generation, &population);
        }

        Ok(population)
    }
}

/// Binary tournament on a population sorted best first.
fn tournament<'p>(rng: &mut fastrand::Rng, population: &'p [Individual]) -> &'p Individual {
    let a = rng.usize(0..population.len());
    let b = rng.usize(0..population.len());
    &population[a.min(b)]
}

/// Simulated binary crossover for one real dimension.
fn sbx(rng: &mut fastrand::Rng, p1: f64, p2: f64, low: f64, high: f64, eta: f64) -> (f64, f64) {
    let u = rng_util::f64_range(rng, 0.0, 1.0);
    let beta = if u <= 0.5 {
        (2.0 * u).powf(1.0 / (eta + 1.0))
    } else {
        (1.0 / (2.0 * (1.0 - u))).powf(1.0 / (eta + 1.0))
    };
    let c1 = 0.5 * ((1.0 + beta) * p1 + (1.0 - beta) * p2);
    let c2 = 0.5 * ((1.0 - beta) * p1 + (1.0 + beta) * p2);
    (c1.clamp(low, high), c2.clamp(low, high))
}

/// Polynomial mutation of one real value.
fn polynomial_mutation(rng: &mut fastrand::Rng, x: f64, low: f64, high: f64, eta: f64) -> f64 {
    let range = high - low;
    if range <= 0.0 {
        return x;
    }
    let u = rng_util::f64_range(rng, 0.0, 1.0);
    let delta1 = (x - low) / range;
    let delta2 = (high - x) / range;
    let delta_q = if u < 0.5 {
        let val = 2.0 * u + (1.0 - 2.0 * u) * (1.0 - delta1).powf(eta + 1.0);
        val.powf(1.0 / (eta + 1.0)) - 1.0
    } else {
        let val = 2.0 * (1.0 - u) + 2.0 * (u - 0.5) * (1.0 - delta2).powf(eta + 1.0);
        1.0 - val.powf(1.0 / (eta + 1.0))
    };
    (x + delta_q * range).clamp(low, high)
}
