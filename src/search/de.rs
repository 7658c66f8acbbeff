//! Differential evolution over natively typed genomes.
//!
//! Each generation builds one trial genome per member *xᵢ*:
//! 1. **Mutation**: a donor from other members, per
//!    [`DifferentialEvolutionStrategy`]:
//!    - `Rand1`: `v = x_r1 + F * (x_r2 - x_r3)`
//!    - `Best1`: `v = x_best + F * (x_r1 - x_r2)`
//!    - `CurrentToBest1`: `v = x_i + F * (x_best - x_i) + F * (x_r1 - x_r2)`
//! 2. **Crossover**: binomial, each gene taken from the donor with
//!    probability CR (one gene always is).
//! 3. **Selection**: the trial replaces *xᵢ* unless it ranks strictly worse
//!    under [`Individual::compare`].
//!
//! With duplicate elimination on, the initial population is drawn distinct,
//! a trial equal to a member or an earlier trial is redrawn a few times, and
//! a trial that stays a duplicate never replaces its member. The population
//! therefore stays pairwise distinct.
//!
//! Index genes follow the same arithmetic and are rounded back into range.
//! Choice genes have no arithmetic: the donor takes the choice of the
//! difference member (`x_r2` for `Rand1`, `x_r1` for `Best1`, `x_best` for
//! `CurrentToBest1`) with probability F and keeps the base member's choice
//! otherwise.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::problem::{
    Individual, PopulationAlgorithm, Problem, Termination, evaluate_population, sort_population,
};
use crate::error::{Error, Result};
use crate::rng_util;
use crate::variable::{Gene, Variable, same_genome, sample_genome};

/// Donor construction rule.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DifferentialEvolutionStrategy {
    /// DE/rand/1; the most robust choice.
    #[default]
    Rand1,
    /// DE/best/1; greedier, biased toward the current best member.
    Best1,
    /// DE/current-to-best/1; blends each member with the best.
    CurrentToBest1,
}

/// Settings of [`DifferentialEvolution`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DifferentialEvolutionConfig {
    /// Donor construction rule. Default: [`DifferentialEvolutionStrategy::Rand1`].
    pub strategy: DifferentialEvolutionStrategy,
    /// Mutation factor F, in `(0, 2]`. Default: 0.8.
    pub mutation_factor: f64,
    /// Crossover rate CR, in `[0, 1]`. Default: 0.9.
    pub crossover_rate: f64,
}

impl Default for DifferentialEvolutionConfig {
    fn default() -> Self {
        Self {
            strategy: DifferentialEvolutionStrategy::Rand1,
            mutation_factor: 0.8,
            crossover_rate: 0.9,
        }
    }
}

impl DifferentialEvolutionConfig {
    /// Checks F and CR.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for out-of-range settings.
    pub fn validate(&self) -> Result<()> {
        if !(self.mutation_factor > 0.0 && self.mutation_factor <= 2.0) {
            return Err(Error::InvalidConfig("mutation_factor must be in (0, 2]"));
        }
        if !(0.0..=1.0).contains(&self.crossover_rate) {
            return Err(Error::InvalidConfig("crossover_rate must be in [0, 1]"));
        }
        Ok(())
    }
}

/// Draws per slot before a duplicate is accepted.
const UNIQUE_ATTEMPTS: usize = 10;

/// Mixed-variable differential evolution.
#[derive(Clone, Debug)]
pub struct DifferentialEvolution {
    pop_size: usize,
    eliminate_duplicates: bool,
    config: DifferentialEvolutionConfig,
}

impl DifferentialEvolution {
    /// Smallest population the strategies can draw distinct members from.
    pub const MIN_POP_SIZE: usize = 4;

    /// Creates a DE instance with default settings.
    #[must_use]
    pub fn new(pop_size: usize) -> Self {
        Self {
            pop_size,
            eliminate_duplicates: true,
            config: DifferentialEvolutionConfig::default(),
        }
    }

    /// Keeps the population free of identical genomes. Default: `true`.
    #[must_use]
    pub fn eliminate_duplicates(mut self, enabled: bool) -> Self {
        self.eliminate_duplicates = enabled;
        self
    }

    /// Replaces the settings.
    #[must_use]
    pub fn with_config(mut self, config: DifferentialEvolutionConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the population size.
    #[must_use]
    pub fn pop_size(&self) -> usize {
        self.pop_size
    }

    fn is_new(&self, genome: &[Gene], population: &[Individual], trials: &[Vec<Gene>]) -> bool {
        !self.eliminate_duplicates
            || !(population.iter().any(|p| same_genome(&p.genes, genome))
                || trials.iter().any(|t| same_genome(t, genome)))
    }

    /// Distinct random genomes where the space allows, topped up with plain
    /// samples so the population always has `pop_size` members.
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
        while genomes.len() < self.pop_size {
            genomes.push(sample_genome(rng, variables));
        }
        genomes
    }

    /// One trial per member, each paired with whether it is new.
    fn trials(
        &self,
        rng: &mut fastrand::Rng,
        variables: &[Variable],
        population: &[Individual],
    ) -> (Vec<Vec<Gene>>, Vec<bool>) {
        let best = best_index(population);
        let mut trials: Vec<Vec<Gene>> = Vec::with_capacity(population.len());
        let mut fresh = Vec::with_capacity(population.len());
        for i in 0..population.len() {
            let mut trial = self.trial(rng, variables, population, i, best);
            let mut attempts = 1;
            while !self.is_new(&trial, population, &trials) && attempts < UNIQUE_ATTEMPTS {
                attempts += 1;
                trial = self.trial(rng, variables, population, i, best);
            }
            fresh.push(self.is_new(&trial, population, &trials));
            trials.push(trial);
        }
        (trials, fresh)
    }

    fn trial(
        &self,
        rng: &mut fastrand::Rng,
        variables: &[Variable],
        population: &[Individual],
        target: usize,
        best: usize,
    ) -> Vec<Gene> {
        let f = self.config.mutation_factor;
        let n = population.len();
        let genes = |i: usize| population[i].genes.as_slice();

        // (base, terms) such that donor = base + sum(weight * (a - b)),
        // plus the member whose choices the donor may adopt.
        let (base, terms, choice_from): (usize, Vec<(usize, usize)>, usize) = match self.config.strategy {
            DifferentialEvolutionStrategy::Rand1 => {
                let r = rng_util::distinct_indices(rng, n, 3, &[target]);
                (r[0], vec![(r[1], r[2])], r[1])
            }
            DifferentialEvolutionStrategy::Best1 => {
                let r = rng_util::distinct_indices(rng, n, 2, &[target]);
                (best, vec![(r[0], r[1])], r[0])
            }
            DifferentialEvolutionStrategy::CurrentToBest1 => {
                let r = rng_util::distinct_indices(rng, n, 2, &[target]);
                (target, vec![(best, target), (r[0], r[1])], best)
            }
        };

        let j_rand = rng.usize(0..variables.len().max(1));
        variables
            .iter()
            .enumerate()
            .map(|(j, variable)| {
                let from_donor = j == j_rand || rng.f64() < self.config.crossover_rate;
                if !from_donor {
                    return genes(target)[j];
                }
                match variable {
                    Variable::Real(d) => {
                        let v = donor_value(genes(base)[j], &terms, f, |i| genes(i)[j]);
                        Gene::Real(v.clamp(d.low, d.high))
                    }
                    Variable::Index(d) => {
                        let v = donor_value(genes(base)[j], &terms, f, |i| genes(i)[j]);
                        Gene::Index(round_index(v, d.n_values))
                    }
                    Variable::Choice(_) => {
                        if rng.f64() < f {
                            genes(choice_from)[j]
                        } else {
                            genes(base)[j]
                        }
                    }
                }
            })
            .collect()
    }
}

#[allow(clippy::cast_precision_loss)]
fn numeric(gene: Gene) -> f64 {
    match gene {
        Gene::Real(v) => v,
        Gene::Index(i) | Gene::Choice(i) => i as f64,
    }
}

fn donor_value(base: Gene, terms: &[(usize, usize)], f: f64, gene_of: impl Fn(usize) -> Gene) -> f64 {
    terms
        .iter()
        .fold(numeric(base), |acc, &(a, b)| acc + f * (numeric(gene_of(a)) - numeric(gene_of(b))))
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn round_index(value: f64, n_values: usize) -> usize {
    value.round().clamp(0.0, (n_values - 1) as f64) as usize
}

fn best_index(population: &[Individual]) -> usize {
    population
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.compare(b))
        .map_or(0, |(i, _)| i)
}

impl PopulationAlgorithm for DifferentialEvolution {
    fn name(&self) -> &'static str {
        "differential-evolution"
    }

    fn minimize(
        &self,
        problem: &dyn Problem,
        termination: Termination,
        rng: &mut fastrand::Rng,
        observer: &mut dyn FnMut(usize, &[Individual]),
    ) -> Result<Vec<Individual>> {
        if self.pop_size < Self::MIN_POP_SIZE {
            return Err(Error::PopulationTooSmall {
                min: Self::MIN_POP_SIZE,
                got: self.pop_size,
            });
        }
        self.config.validate()?;
        let variables = problem.variables();

        let genomes = self.initial_genomes(rng, variables);
        let mut n_evals = genomes.len();
        let mut population = evaluate_population(problem, genomes)?;
        observer(0, &population);

        let mut generation = 0;
        while !termination.reached(generation, n_evals) {
            let (trials, fresh) = self.trials(rng, variables, &population);
            n_evals += trials.len();
            let trials = evaluate_population(problem, trials)?;
            for ((member, trial), fresh) in population.iter_mut().zip(trials).zip(fresh) {
                if fresh && !member.better_than(&trial) {
                    *member = trial;
                }
            }
            generation += 1;
            observer(generation, &population);
        }

        sort_population(&mut population);
        Ok(population)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::problem::Evaluation;
    use crate::variable::{ChoiceDomain, IndexDomain, RealDomain};

    struct Bowl(Vec<Variable>);

    impl Problem for Bowl {
        fn variables(&self) -> &[Variable] {
            &self.0
        }

        fn n_constraints(&self) -> usize {
            0
        }

        #[allow(clippy::cast_precision_loss)]
        fn evaluate(&self, genomes: &[Vec<Gene>]) -> Result<Evaluation> {
            let objectives = genomes
                .iter()
                .map(|g| {
                    g.iter()
                        .map(|gene| match *gene {
                            Gene::Real(x) => (x - 0.7).powi(2),
                            Gene::Index(i) => (i as f64 - 3.0).powi(2),
                            Gene::Choice(c) => f64::from(u8::from(c != 0)),
                        })
                        .sum()
                })
                .collect();
            Ok(Evaluation {
                objectives,
                constraints: None,
            })
        }
    }

    fn bowl() -> Bowl {
        Bowl(vec![
            Variable::Real(RealDomain { low: 0.0, high: 1.0 }),
            Variable::Real(RealDomain { low: -1.0, high: 1.0 }),
            Variable::Index(IndexDomain { n_values: 6 }),
            Variable::Choice(ChoiceDomain { n_choices: 4 }),
        ])
    }

    #[test]
    fn finds_bowl_minimum_with_every_strategy() {
        for strategy in [
            DifferentialEvolutionStrategy::Rand1,
            DifferentialEvolutionStrategy::Best1,
            DifferentialEvolutionStrategy::CurrentToBest1,
        ] {
            let de = DifferentialEvolution::new(20).with_config(DifferentialEvolutionConfig {
                strategy,
                ..DifferentialEvolutionConfig::default()
            });
            let mut rng = fastrand::Rng::with_seed(7);
            let pop = de
                .minimize(&bowl(), Termination::Generations(60), &mut rng, &mut |_: usize, _: &[Individual]| {})
                .unwrap();
            assert_eq!(pop.len(), 20);
            let best = &pop[0];
            assert!(best.objective < 0.05, "{strategy:?}: {}", best.objective);
            assert_eq!(best.genes[2], Gene::Index(3));
            assert_eq!(best.genes[3], Gene::Choice(0));
        }
    }

    #[test]
    fn trials_stay_in_domain() {
        let problem = bowl();
        let de = DifferentialEvolution::new(6).with_config(DifferentialEvolutionConfig {
            mutation_factor: 2.0,
            crossover_rate: 1.0,
            ..DifferentialEvolutionConfig::default()
        });
        let mut rng = fastrand::Rng::with_seed(1);
        let genomes = (0..6).map(|_| sample_genome(&mut rng, &problem.0)).collect();
        let population = evaluate_population(&problem, genomes).unwrap();
        for i in 0..6 {
            let trial = de.trial(&mut rng, &problem.0, &population, i, 0);
            assert!(trial.iter().zip(&problem.0).all(|(g, v)| g.fits(v)));
        }
    }

    #[test]
    fn population_never_gets_worse() {
        let mut rng = fastrand::Rng::with_seed(2);
        let mut best_so_far = f64::INFINITY;
        let mut monotone = true;
        DifferentialEvolution::new(10)
            .minimize(&bowl(), Termination::Evaluations(300), &mut rng, &mut |_: usize, pop: &[Individual]| {
                let best = pop.iter().map(|m| m.objective).fold(f64::INFINITY, f64::min);
                monotone &= best <= best_so_far;
                best_so_far = best;
            })
            .unwrap();
        assert!(monotone);
    }

    #[test]
    fn population_stays_distinct_on_a_small_grid() {
        // 6 x 4 = 24 genomes; the bowl alone would collapse onto (3, 0).
        let grid = Bowl(vec![
            Variable::Index(IndexDomain { n_values: 6 }),
            Variable::Choice(ChoiceDomain { n_choices: 4 }),
        ]);
        for strategy in [
            DifferentialEvolutionStrategy::Rand1,
            DifferentialEvolutionStrategy::Best1,
            DifferentialEvolutionStrategy::CurrentToBest1,
        ] {
            let de = DifferentialEvolution::new(10).with_config(DifferentialEvolutionConfig {
                strategy,
                ..DifferentialEvolutionConfig::default()
            });
            let mut rng = fastrand::Rng::with_seed(3);
            let mut distinct_every_generation = true;
            let pop = de
                .minimize(&grid, Termination::Generations(40), &mut rng, &mut |_: usize, pop: &[Individual]| {
                    for (i, a) in pop.iter().enumerate() {
                        distinct_every_generation &= !pop[i + 1..].iter().any(|b| same_genome(&a.genes, &b.genes));
                    }
                })
                .unwrap();
            assert!(distinct_every_generation, "{strategy:?}");
            assert_eq!(pop.len(), 10);
            assert!(pop.windows(2).all(|w| w[0].objective <= w[1].objective));
        }
    }

    #[test]
    fn duplicates_are_kept_when_elimination_is_off() {
        let grid = Bowl(vec![Variable::Choice(ChoiceDomain { n_choices: 2 })]);
        let mut rng = fastrand::Rng::with_seed(4);
        let pop = DifferentialEvolution::new(6)
            .eliminate_duplicates(false)
            .minimize(&grid, Termination::Generations(5), &mut rng, &mut |_: usize, _: &[Individual]| {})
            .unwrap();
        // Two genomes cannot fill six slots without repeats.
        assert_eq!(pop.len(), 6);
        assert!(pop.iter().any(|m| pop.iter().filter(|o| same_genome(&m.genes, &o.genes)).count() > 1));
    }

    #[test]
    fn rejects_small_population_and_bad_factor() {
        let mut rng = fastrand::Rng::with_seed(0);
        assert!(matches!(
            DifferentialEvolution::new(3).minimize(&bowl(), Termination::default(), &mut rng, &mut |_: usize, _: &[Individual]| {}),
            Err(Error::PopulationTooSmall { min: 4, got: 3 })
        ));
        let bad = DifferentialEvolutionConfig {
            mutation_factor: 0.0,
            ..DifferentialEvolutionConfig::default()
        };
        assert!(matches!(bad.validate(), Err(Error::InvalidConfig(_))));
    }
}
