//! The optimizer facade: backend selection, validation and the
//! rank → filter → select pipeline shared by every backend.

use core::fmt;
use core::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::acquisition::{AcquisitionFunction, MinimizationObjective};
use crate::constraint::{KnownConstraints, PenaltyPolicy};
use crate::encoding::Encoder;
use crate::error::{Error, Result};
use crate::history::{Recorder, SearchHistory};
use crate::param::{ParamValue, ParameterVector};
use crate::rng_util;
use crate::search::{
    AlgorithmKind, DifferentialEvolution, DifferentialEvolutionConfig, GeneticAlgorithm,
    GeneticConfig, GradientBackend, GradientConfig, PopulationAlgorithm, PopulationBackend,
    Termination, rank,
};
use crate::selection::select_batch;
use crate::space::ParameterSpace;

/// Which search backend the optimizer runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum BackendKind {
    /// Multi-start gradient search on the relaxed encoding.
    #[default]
    Gradient,
    /// Genetic algorithm on the native encoding.
    Genetic,
    /// Any [`PopulationAlgorithm`] on the native encoding, driven through
    /// the generic problem wrapper.
    GenericPopulation,
}

impl BackendKind {
    /// Returns `true` for the backends that keep a population.
    #[must_use]
    pub fn is_population(self) -> bool {
        !matches!(self, Self::Gradient)
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gradient" => Ok(Self::Gradient),
            "genetic" => Ok(Self::Genetic),
            "generic-population" | "population" => Ok(Self::GenericPopulation),
            _ => Err(Error::UnknownBackend(s.to_owned())),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gradient => "gradient",
            Self::Genetic => "genetic",
            Self::GenericPopulation => "generic-population",
        })
    }
}

/// Every recognized optimizer option.
///
/// Usually assembled through [`AcquisitionOptimizerBuilder`]; with the
/// `serde` feature it can also be read from a file and passed to
/// [`AcquisitionOptimizer::from_config`]. Missing fields take their
/// defaults.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OptimizerConfig {
    /// Search backend. Default: [`BackendKind::Gradient`].
    pub backend: BackendKind,
    /// Number of points proposed per call. Default: 1.
    pub batch_size: usize,
    /// Population size of the population backends. Default: 200.
    pub pop_size: usize,
    /// Budget of the population backends. Default: 5000 evaluations.
    pub termination: Termination,
    /// Random seed. `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Log one debug event per generation or iteration. Default: `false`.
    pub verbose: bool,
    /// Keep identical genomes out of the population of every built-in
    /// population algorithm. Default: `true`.
    pub eliminate_duplicates: bool,
    /// Keep a [`SearchHistory`] in the report. Default: `false`.
    pub save_history: bool,
    /// Algorithm of the generic-population backend. Default: differential
    /// evolution.
    pub algorithm: AlgorithmKind,
    /// Gradient backend settings.
    pub gradient: GradientConfig,
    /// Genetic operator settings.
    pub genetic: GeneticConfig,
    /// Differential evolution settings.
    pub de: DifferentialEvolutionConfig,
    /// Overrides the penalty policy of the constraint set passed to
    /// [`AcquisitionOptimizer::optimize`]. Default: `None`.
    pub penalty: Option<PenaltyPolicy>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            batch_size: 1,
            pop_size: 200,
            termination: Termination::default(),
            seed: None,
            verbose: false,
            eliminate_duplicates: true,
            save_history: false,
            algorithm: AlgorithmKind::default(),
            gradient: GradientConfig::default(),
            genetic: GeneticConfig::default(),
            de: DifferentialEvolutionConfig::default(),
            penalty: None,
        }
    }
}

impl OptimizerConfig {
    /// Checks every option that can be checked without a search.
    ///
    /// # Errors
    ///
    /// - [`Error::ZeroBatchSize`] if `batch_size` is zero.
    /// - [`Error::BatchSizeExceedsPopulation`] if a population backend is
    ///   selected and `batch_size >= pop_size`.
    /// - [`Error::PopulationTooSmall`] if `pop_size` is below the minimum
    ///   of the selected algorithm.
    /// - [`Error::InvalidPenalty`] / [`Error::InvalidConfig`] for invalid
    ///   nested settings.
    pub fn validate(&self) -> Result<()> {
        self.check(self.min_pop_size())
    }

    fn min_pop_size(&self) -> usize {
        match (self.backend, self.algorithm) {
            (BackendKind::GenericPopulation, AlgorithmKind::DifferentialEvolution) => {
                DifferentialEvolution::MIN_POP_SIZE
            }
            _ => 2,
        }
    }

    fn check(&self, min_pop_size: usize) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::ZeroBatchSize);
        }
        if self.backend.is_population() {
            if self.batch_size >= self.pop_size {
                return Err(Error::BatchSizeExceedsPopulation {
                    batch_size: self.batch_size,
                    pop_size: self.pop_size,
                });
            }
            if self.pop_size < min_pop_size {
                return Err(Error::PopulationTooSmall {
                    min: min_pop_size,
                    got: self.pop_size,
                });
            }
        }
        if let Some(policy) = &self.penalty {
            policy.validate()?;
        }
        self.gradient.validate()?;
        self.genetic.validate()?;
        self.de.validate()
    }
}

/// Builder for [`AcquisitionOptimizer`].
///
/// Created with [`AcquisitionOptimizer::builder`]. Every option starts at
/// the default documented on [`OptimizerConfig`].
///
/// # Examples
///
/// ```
/// use acqopt::parameter::Parameter;
/// use acqopt::space::ParameterSpace;
/// use acqopt::{AcquisitionOptimizer, BackendKind, Error};
///
/// let space = ParameterSpace::new(vec![Parameter::continuous("x", 0.0, 1.0).unwrap()]).unwrap();
///
/// let err = AcquisitionOptimizer::builder(space)
///     .backend(BackendKind::Genetic)
///     .pop_size(4)
///     .batch_size(4)
///     .build()
///     .unwrap_err();
/// assert!(matches!(err, Error::BatchSizeExceedsPopulation { .. }));
/// ```
pub struct AcquisitionOptimizerBuilder {
    space: Arc<ParameterSpace>,
    config: OptimizerConfig,
    custom: Option<Box<dyn PopulationAlgorithm + Send + Sync>>,
}

impl AcquisitionOptimizerBuilder {
    fn new(space: Arc<ParameterSpace>) -> Self {
        Self {
            space,
            config: OptimizerConfig::default(),
            custom: None,
        }
    }

    /// Replace every option at once.
    #[must_use]
    pub fn config(mut self, config: OptimizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Select the search backend.
    #[must_use]
    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.config.backend = backend;
        self
    }

    /// Number of points proposed per call. Default: 1.
    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    /// Population size of the population backends. Default: 200.
    #[must_use]
    pub fn pop_size(mut self, pop_size: usize) -> Self {
        self.config.pop_size = pop_size;
        self
    }

    /// Budget of the population backends.
    #[must_use]
    pub fn termination(mut self, termination: Termination) -> Self {
        self.config.termination = termination;
        self
    }

    /// Shorthand for `termination(Termination::Evaluations(n))`.
    #[must_use]
    pub fn max_evaluations(self, n: usize) -> Self {
        self.termination(Termination::Evaluations(n))
    }

    /// Shorthand for `termination(Termination::Generations(n))`.
    #[must_use]
    pub fn max_generations(self, n: usize) -> Self {
        self.termination(Termination::Generations(n))
    }

    /// Seed the random number generator for reproducible proposals.
    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    /// Log one debug event per generation or iteration.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// Keep identical genomes out of the population of every built-in
    /// population algorithm. Default: `true`.
    #[must_use]
    pub fn eliminate_duplicates(mut self, enabled: bool) -> Self {
        self.config.eliminate_duplicates = enabled;
        self
    }

    /// Keep a per-generation [`SearchHistory`] in the
    /// [`OptimizationReport`]. Default: `false`.
    #[must_use]
    pub fn save_history(mut self, enabled: bool) -> Self {
        self.config.save_history = enabled;
        self
    }

    /// Algorithm of the generic-population backend.
    #[must_use]
    pub fn algorithm(mut self, algorithm: AlgorithmKind) -> Self {
        self.config.algorithm = algorithm;
        self
    }

    /// Install a custom algorithm and select the generic-population
    /// backend. `pop_size` is still used for the batch size check.
    #[must_use]
    pub fn custom_algorithm(mut self, algorithm: impl PopulationAlgorithm + Send + Sync + 'static) -> Self {
        self.config.backend = BackendKind::GenericPopulation;
        self.custom = Some(Box::new(algorithm));
        self
    }

    /// Gradient backend settings.
    #[must_use]
    pub fn gradient(mut self, config: GradientConfig) -> Self {
        self.config.gradient = config;
        self
    }

    /// Genetic operator settings.
    #[must_use]
    pub fn genetic(mut self, config: GeneticConfig) -> Self {
        self.config.genetic = config;
        self
    }

    /// Differential evolution settings.
    #[must_use]
    pub fn differential_evolution(mut self, config: DifferentialEvolutionConfig) -> Self {
        self.config.de = config;
        self
    }

    /// Override the penalty policy of the constraint set.
    #[must_use]
    pub fn penalty(mut self, policy: PenaltyPolicy) -> Self {
        self.config.penalty = Some(policy);
        self
    }

    /// Validate the options and build the optimizer.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by [`OptimizerConfig::validate`].
    pub fn build(self) -> Result<AcquisitionOptimizer> {
        let config = self.config;
        let min_pop_size = if self.custom.is_some() {
            1
        } else {
            config.min_pop_size()
        };
        config.check(min_pop_size)?;

        let genetic = || {
            GeneticAlgorithm::new(config.pop_size)
                .with_config(config.genetic.clone())
                .eliminate_duplicates(config.eliminate_duplicates)
        };
        let algorithm: Box<dyn PopulationAlgorithm + Send + Sync> = match (config.backend, self.custom) {
            (BackendKind::Gradient, _) => {
                let backend = Backend::Gradient(GradientBackend::new(config.gradient.clone()));
                return Ok(AcquisitionOptimizer::new(self.space, config, backend));
            }
            (BackendKind::Genetic, _) => Box::new(genetic()),
            (BackendKind::GenericPopulation, Some(custom)) => custom,
            (BackendKind::GenericPopulation, None) => match config.algorithm {
                AlgorithmKind::DifferentialEvolution => {
                    Box::new(
                        DifferentialEvolution::new(config.pop_size)
                            .with_config(config.de.clone())
                            .eliminate_duplicates(config.eliminate_duplicates),
                    )
                }
                AlgorithmKind::Genetic => Box::new(genetic()),
            },
        };
        let backend = Backend::Population(
            PopulationBackend::new(algorithm, config.termination).with_policy(config.penalty),
        );
        Ok(AcquisitionOptimizer::new(self.space, config, backend))
    }
}

#[derive(Debug)]
enum Backend {
    Gradient(GradientBackend),
    Population(PopulationBackend),
}

/// Result of one [`AcquisitionOptimizer::optimize_with_report`] call.
#[derive(Clone, Debug)]
pub struct OptimizationReport {
    /// Proposed points, best first. May be shorter than the batch size.
    pub batch: Vec<ParameterVector>,
    /// Number of candidates the backend produced before filtering.
    pub n_candidates: usize,
    /// Number of points the acquisition function scored.
    pub n_evals: usize,
    /// Wall-clock time of the call.
    pub elapsed: Duration,
    /// Per-generation history, if enabled.
    pub history: Option<SearchHistory>,
}

impl OptimizationReport {
    /// Returns `true` if fewer points than requested were found.
    #[must_use]
    pub fn is_degraded(&self, batch_size: usize) -> bool {
        self.batch.len() < batch_size
    }
}

/// Proposes batches of points that maximize an acquisition function.
///
/// The optimizer owns its random generator, so repeated calls on the same
/// instance continue one random stream; two instances built with the same
/// seed produce identical proposals for identical inputs.
///
/// # Examples
///
/// ```
/// use acqopt::acquisition::Pointwise;
/// use acqopt::constraint::KnownConstraints;
/// use acqopt::parameter::Parameter;
/// use acqopt::space::ParameterSpace;
/// use acqopt::AcquisitionOptimizer;
///
/// let space = ParameterSpace::new(vec![
///     Parameter::continuous("x", 0.0, 1.0).unwrap(),
///     Parameter::categorical("kind", ["a", "b"]).unwrap(),
/// ])
/// .unwrap();
/// let optimizer = AcquisitionOptimizer::builder(space).batch_size(2).seed(7).build().unwrap();
///
/// // Relaxed layout: [x, kind=a, kind=b].
/// let acqf = Pointwise(|x: &[f64]| -(x[0] - 0.4).powi(2) + x[2]);
/// let batch = optimizer.optimize(&acqf, &KnownConstraints::new(), &[]).unwrap();
/// assert_eq!(batch.len(), 2);
/// assert_eq!(batch[0].get("kind").and_then(|v| v.as_str()), Some("b"));
/// ```
#[derive(Debug)]
pub struct AcquisitionOptimizer {
    encoder: Encoder,
    config: OptimizerConfig,
    backend: Backend,
    rng: Mutex<fastrand::Rng>,
}

impl AcquisitionOptimizer {
    fn new(space: Arc<ParameterSpace>, config: OptimizerConfig, backend: Backend) -> Self {
        Self {
            encoder: Encoder::new(space),
            rng: Mutex::new(rng_util::from_seed(config.seed)),
            config,
            backend,
        }
    }

    /// Start building an optimizer over `space`.
    #[must_use]
    pub fn builder(space: impl Into<Arc<ParameterSpace>>) -> AcquisitionOptimizerBuilder {
        AcquisitionOptimizerBuilder::new(space.into())
    }

    /// Build an optimizer from a complete configuration.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by [`OptimizerConfig::validate`].
    pub fn from_config(space: impl Into<Arc<ParameterSpace>>, config: OptimizerConfig) -> Result<Self> {
        Self::builder(space).config(config).build()
    }

    /// Returns the parameter space.
    #[must_use]
    pub fn space(&self) -> &ParameterSpace {
        self.encoder.space()
    }

    /// Returns the encoder shared by all backends.
    #[must_use]
    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Propose up to `batch_size` feasible points that maximize `acqf`
    /// and differ from every point in `measured`.
    ///
    /// An empty or short batch is a degraded result, not an error; callers
    /// should fall back to another proposal strategy (e.g. random).
    ///
    /// # Errors
    ///
    /// - [`Error::DimensionMismatch`] if a measured entry does not have one
    ///   value per parameter.
    /// - [`Error::AcquisitionShape`] if `acqf` returns the wrong number of
    ///   scores.
    pub fn optimize<A: AcquisitionFunction + ?Sized>(
        &self,
        acqf: &A,
        constraints: &KnownConstraints<'_>,
        measured: &[Vec<ParamValue>],
    ) -> Result<Vec<ParameterVector>> {
        self.optimize_with_report(acqf, constraints, measured)
            .map(|report| report.batch)
    }

    /// Like [`optimize`](Self::optimize), but also reports evaluation
    /// counts, timing and (if enabled) the search history.
    ///
    /// # Errors
    ///
    /// See [`optimize`](Self::optimize).
    pub fn optimize_with_report<A: AcquisitionFunction + ?Sized>(
        &self,
        acqf: &A,
        constraints: &KnownConstraints<'_>,
        measured: &[Vec<ParamValue>],
    ) -> Result<OptimizationReport> {
        let n_params = self.encoder.space().len();
        if let Some(entry) = measured.iter().find(|m| m.len() != n_params) {
            return Err(Error::DimensionMismatch {
                expected: n_params,
                got: entry.len(),
            });
        }

        let started = Instant::now();
        trace_info!(
            backend = %self.config.backend,
            batch_size = self.config.batch_size,
            n_measured = measured.len(),
            "acquisition optimization started"
        );

        let objective = MinimizationObjective::new(acqf, self.config.batch_size);
        let mut recorder = Recorder::new(self.config.save_history, self.config.verbose);
        let mut candidates = {
            let mut rng = self.rng.lock();
            match &self.backend {
                Backend::Gradient(backend) => {
                    backend.search(&self.encoder, &objective, constraints, &mut rng, &mut recorder)?
                }
                Backend::Population(backend) => {
                    backend.search(&self.encoder, &objective, constraints, &mut rng, &mut recorder)?
                }
            }
        };

        let n_candidates = candidates.len();
        rank(&mut candidates);
        let ranked: Vec<ParameterVector> = candidates
            .into_iter()
            .filter(|c| c.feasible)
            .map(|c| c.vector)
            .collect();
        if ranked.len() < n_candidates {
            trace_debug!(
                dropped = n_candidates - ranked.len(),
                "infeasible candidates removed"
            );
        }
        let batch = select_batch(&ranked, self.config.batch_size, measured);

        let elapsed = started.elapsed();
        trace_info!(
            elapsed_ms = elapsed.as_millis(),
            n_evals = objective.n_evals(),
            batch_len = batch.len(),
            "acquisition optimization finished"
        );

        Ok(OptimizationReport {
            batch,
            n_candidates,
            n_evals: objective.n_evals(),
            elapsed,
            history: recorder.finish(),
        })
    }
}
