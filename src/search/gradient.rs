//! Multi-start projected gradient search on the relaxed encoding.
//!
//! The search runs in three phases:
//!
//! 1. **Raw samples.** `raw_samples` points are drawn uniformly (or from a
//!    scrambled Sobol sequence with the `sobol` feature). Points violating a
//!    known constraint are discarded and the rest are scored in one batch.
//!    The best `num_restarts` become start points.
//! 2. **Descent.** All starts take Adam steps in lockstep on `[0, 1]^d`.
//!    Gradients come from [`AcquisitionFunction::gradient`] when available,
//!    otherwise from central finite differences evaluated in one batch per
//!    iteration (one-sided at the bounds). Each step is clipped to the unit
//!    box. A step whose decoded point violates a known constraint is halved
//!    up to four times; a start that cannot move feasibly stops at its last
//!    feasible iterate. Starts with a non-finite gradient are dropped.
//! 3. **Snapping.** Final iterates are decoded to the nearest admissible
//!    point, re-encoded and re-scored.
//!
//! Categorical parameters without descriptors are enumerated when the
//! number of option combinations is at most `max_categorical_combinations`:
//! their one-hot columns are fixed per combination and only the remaining
//! columns move. A space left with no free columns is scored exhaustively.
//!
//! Given a seed the search is deterministic.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::Candidate;
use crate::acquisition::{AcquisitionFunction, MinimizationObjective};
use crate::constraint::KnownConstraints;
use crate::encoding::{Block, Encoder};
use crate::error::{Error, Result};
use crate::history::{GenerationRecord, Recorder};
use crate::param::{ParamValue, ParameterVector};
#[cfg(feature = "sobol")]
use crate::parameter::ParameterKind;
use crate::space::ParameterSpace;

const BETA1: f64 = 0.9;
const BETA2: f64 = 0.999;
const EPSILON: f64 = 1e-8;
const MAX_BACKTRACKS: usize = 4;

/// How raw start-point candidates are drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StartInit {
    /// Uniform random samples.
    #[default]
    Random,
    /// Scrambled Sobol samples (requires the `sobol` feature).
    #[cfg(feature = "sobol")]
    Sobol,
}

/// Settings of the [`GradientBackend`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GradientConfig {
    /// Number of start points to optimize. Default: 10.
    pub num_restarts: usize,
    /// Raw samples scored to pick the starts. Default: 512.
    pub raw_samples: usize,
    /// Maximum Adam iterations per start. Default: 200.
    pub max_iters: usize,
    /// Adam step size in relaxed coordinates. Default: 0.025.
    pub learning_rate: f64,
    /// A start stops once its step is shorter than this (max-norm).
    /// Default: 1e-6.
    pub tolerance: f64,
    /// Finite-difference half-width in relaxed coordinates. Default: 1e-4.
    pub fd_step: f64,
    /// Enumerate plain categorical combinations up to this count.
    /// Default: 64.
    pub max_categorical_combinations: usize,
    /// Raw sample source. Default: [`StartInit::Random`].
    pub init: StartInit,
}

impl Default for GradientConfig {
    fn default() -> Self {
        Self {
            num_restarts: 10,
            raw_samples: 512,
            max_iters: 200,
            learning_rate: 0.025,
            tolerance: 1e-6,
            fd_step: 1e-4,
            max_categorical_combinations: 64,
            init: StartInit::Random,
        }
    }
}

impl GradientConfig {
    /// Checks the settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for out-of-range settings.
    pub fn validate(&self) -> Result<()> {
        if self.num_restarts == 0 || self.raw_samples == 0 {
            return Err(Error::InvalidConfig("num_restarts and raw_samples must be positive"));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(Error::InvalidConfig("learning_rate must be positive and finite"));
        }
        if self.tolerance.is_nan() || self.tolerance < 0.0 {
            return Err(Error::InvalidConfig("tolerance must not be negative"));
        }
        if !(self.fd_step > 0.0 && self.fd_step <= 0.5) {
            return Err(Error::InvalidConfig("fd_step must be in (0, 0.5]"));
        }
        Ok(())
    }
}

/// Multi-start gradient backend.
#[derive(Clone, Debug, Default)]
pub struct GradientBackend {
    config: GradientConfig,
}

/// Adam state of one start.
struct Start {
    x: Vec<f64>,
    m: Vec<f64>,
    v: Vec<f64>,
    active: bool,
}

impl Start {
    fn new(x: Vec<f64>) -> Self {
        let dim = x.len();
        Self {
            x,
            m: vec![0.0; dim],
            v: vec![0.0; dim],
            active: true,
        }
    }
}

impl GradientBackend {
    /// Creates a backend with the given settings.
    #[must_use]
    pub fn new(config: GradientConfig) -> Self {
        Self { config }
    }

    /// Returns the settings.
    #[must_use]
    pub fn config(&self) -> &GradientConfig {
        &self.config
    }

    /// Runs the search and returns every scored candidate, unranked.
    pub(crate) fn search<A: AcquisitionFunction + ?Sized>(
        &self,
        encoder: &Encoder,
        objective: &MinimizationObjective<'_, A>,
        constraints: &KnownConstraints<'_>,
        rng: &mut fastrand::Rng,
        recorder: &mut Recorder,
    ) -> Result<Vec<Candidate>> {
        let space = encoder.space();
        let fixed = self.enumerated_parameters(encoder);
        let combos = combinations(space, &fixed);
        let free = free_columns(encoder, &fixed);

        if free.is_empty() {
            trace_debug!(combinations = combos.len(), "no free columns, scoring exhaustively");
            let points = combos
                .iter()
                .map(|combo| {
                    let mut values = space.sample_random(rng);
                    assign(space, &fixed, combo, &mut values);
                    values
                })
                .collect();
            return score(encoder, objective, constraints, points);
        }

        let restarts_per_combo = self.config.num_restarts.div_ceil(combos.len());
        let raw_per_combo = (self.config.raw_samples / combos.len()).max(restarts_per_combo);
        let mut sampler = RawSampler::new(self.config.init, rng.u32(..));
        let mut candidates = Vec::new();
        let mut starts = Vec::new();

        for combo in &combos {
            let raw: Vec<Vec<ParamValue>> = (0..raw_per_combo)
                .map(|_| {
                    let mut values = sampler.draw(space, rng);
                    assign(space, &fixed, combo, &mut values);
                    values
                })
                .filter(|values| constraints.is_satisfied(values))
                .collect();
            let scored = score(encoder, objective, constraints, raw)?;

            let mut order: Vec<usize> = (0..scored.len()).collect();
            order.sort_by(|&a, &b| scored[a].objective.total_cmp(&scored[b].objective));
            for k in order.into_iter().take(restarts_per_combo) {
                if scored[k].objective.is_finite() {
                    starts.push(Start::new(encoder.to_relaxed(scored[k].vector.values())?));
                }
            }
            candidates.extend(scored);
        }

        if starts.is_empty() {
            trace_debug!("no feasible raw sample with a finite score, skipping descent");
            return Ok(candidates);
        }

        self.descend(encoder, objective, constraints, &free, &mut starts, recorder)?;

        let finals = starts.iter().map(|s| encoder.snap_relaxed(&s.x)).collect();
        candidates.extend(score(encoder, objective, constraints, finals)?);
        Ok(candidates)
    }

    fn descend<A: AcquisitionFunction + ?Sized>(
        &self,
        encoder: &Encoder,
        objective: &MinimizationObjective<'_, A>,
        constraints: &KnownConstraints<'_>,
        free: &[usize],
        starts: &mut [Start],
        recorder: &mut Recorder,
    ) -> Result<()> {
        for iteration in 1..=self.config.max_iters {
            let active: Vec<usize> = (0..starts.len()).filter(|&i| starts[i].active).collect();
            if active.is_empty() {
                break;
            }
            let points: Vec<&[f64]> = active.iter().map(|&i| starts[i].x.as_slice()).collect();
            let gradients = self.gradients(objective, free, &points)?;
            for (&i, gradient) in active.iter().zip(gradients) {
                self.step(&mut starts[i], &gradient, free, iteration, encoder, constraints);
            }

            if recorder.is_active() {
                let xs: Vec<Vec<f64>> = starts.iter().map(|s| s.x.clone()).collect();
                let values = objective.values(&xs)?;
                recorder.record(GenerationRecord {
                    generation: iteration - 1,
                    n_evals: objective.n_evals(),
                    best_objective: values.iter().copied().fold(f64::INFINITY, f64::min),
                    n_feasible: starts
                        .iter()
                        .filter(|s| constraints.is_satisfied(&encoder.snap_relaxed(&s.x)))
                        .count(),
                    population_size: starts.iter().filter(|s| s.active).count(),
                });
            }
        }
        Ok(())
    }

    /// Objective gradients at each point; analytic where the acquisition
    /// function provides one, batched finite differences otherwise.
    fn gradients<A: AcquisitionFunction + ?Sized>(
        &self,
        objective: &MinimizationObjective<'_, A>,
        free: &[usize],
        points: &[&[f64]],
    ) -> Result<Vec<Vec<f64>>> {
        let mut gradients: Vec<Option<Vec<f64>>> = points
            .iter()
            .map(|x| objective.gradient(x).filter(|g| g.len() == x.len()))
            .collect();
        let pending: Vec<usize> = (0..points.len()).filter(|&k| gradients[k].is_none()).collect();
        if pending.is_empty() {
            return Ok(gradients.into_iter().flatten().collect());
        }

        let h = self.config.fd_step;
        let mut probes = Vec::with_capacity(pending.len() * free.len() * 2);
        for &k in &pending {
            for &j in free {
                let x = points[k];
                let mut plus = x.to_vec();
                let mut minus = x.to_vec();
                plus[j] = (x[j] + h).min(1.0);
                minus[j] = (x[j] - h).max(0.0);
                probes.push(plus);
                probes.push(minus);
            }
        }
        let values = objective.values(&probes)?;

        for (p, &k) in pending.iter().enumerate() {
            let x = points[k];
            let mut g = vec![0.0; x.len()];
            for (q, &j) in free.iter().enumerate() {
                let at = 2 * (p * free.len() + q);
                let width = (x[j] + h).min(1.0) - (x[j] - h).max(0.0);
                g[j] = (values[at] - values[at + 1]) / width;
            }
            gradients[k] = Some(g);
        }
        Ok(gradients.into_iter().flatten().collect())
    }

    fn step(
        &self,
        start: &mut Start,
        gradient: &[f64],
        free: &[usize],
        iteration: usize,
        encoder: &Encoder,
        constraints: &KnownConstraints<'_>,
    ) {
        if free.iter().any(|&j| !gradient[j].is_finite()) {
            trace_debug!(iteration, "non-finite gradient, dropping start");
            start.active = false;
            return;
        }

        let t = i32::try_from(iteration).unwrap_or(i32::MAX);
        let bias1 = 1.0 - BETA1.powi(t);
        let bias2 = 1.0 - BETA2.powi(t);
        let mut delta = vec![0.0; start.x.len()];
        for &j in free {
            let g = gradient[j];
            start.m[j] = BETA1 * start.m[j] + (1.0 - BETA1) * g;
            start.v[j] = BETA2 * start.v[j] + (1.0 - BETA2) * g * g;
            let m_hat = start.m[j] / bias1;
            let v_hat = start.v[j] / bias2;
            delta[j] = self.config.learning_rate * m_hat / (v_hat.sqrt() + EPSILON);
        }

        let mut scale = 1.0;
        for _ in 0..=MAX_BACKTRACKS {
            let next: Vec<f64> = start
                .x
                .iter()
                .zip(&delta)
                .map(|(x, d)| (x - scale * d).clamp(0.0, 1.0))
                .collect();
            if constraints.is_empty() || constraints.is_satisfied(&encoder.snap_relaxed(&next)) {
                let moved = next
                    .iter()
                    .zip(&start.x)
                    .map(|(a, b)| (a - b).abs())
                    .fold(0.0, f64::max);
                start.x = next;
                if moved < self.config.tolerance {
                    start.active = false;
                }
                return;
            }
            scale *= 0.5;
        }
        start.active = false;
    }

    /// Parameters whose one-hot columns are fixed per combination.
    fn enumerated_parameters(&self, encoder: &Encoder) -> Vec<usize> {
        let plain: Vec<usize> = encoder
            .segments()
            .iter()
            .enumerate()
            .filter(|(_, s)| matches!(s.block, Block::OneHot))
            .map(|(i, _)| i)
            .collect();
        let n_combos = encoder.space().categorical_combinations(true);
        if plain.is_empty() || n_combos > self.config.max_categorical_combinations {
            if !plain.is_empty() {
                trace_debug!(n_combos, "too many categorical combinations, relaxing one-hot blocks");
            }
            return Vec::new();
        }
        plain
    }
}

/// Cartesian product of the option indices of `fixed` parameters.
fn combinations(space: &ParameterSpace, fixed: &[usize]) -> Vec<Vec<usize>> {
    let mut combos: Vec<Vec<usize>> = vec![Vec::with_capacity(fixed.len())];
    for &p in fixed {
        let n = space.params()[p].n_options().unwrap_or(1);
        combos = combos
            .into_iter()
            .flat_map(|combo| {
                (0..n).map(move |option| {
                    let mut next = combo.clone();
                    next.push(option);
                    next
                })
            })
            .collect();
    }
    combos
}

/// Relaxed columns not owned by a fixed parameter.
fn free_columns(encoder: &Encoder, fixed: &[usize]) -> Vec<usize> {
    let segments = encoder.segments();
    (0..encoder.relaxed_dim())
        .filter(|col| {
            !fixed.iter().any(|&p| {
                let s = &segments[p];
                (s.offset..s.offset + s.width).contains(col)
            })
        })
        .collect()
}

fn assign(space: &ParameterSpace, fixed: &[usize], combo: &[usize], values: &mut [ParamValue]) {
    for (&p, &option) in fixed.iter().zip(combo) {
        values[p] = space.params()[p].option_value(option);
    }
}

/// Scores raw points in one batch.
fn score<A: AcquisitionFunction + ?Sized>(
    encoder: &Encoder,
    objective: &MinimizationObjective<'_, A>,
    constraints: &KnownConstraints<'_>,
    points: Vec<Vec<ParamValue>>,
) -> Result<Vec<Candidate>> {
    let relaxed = points
        .iter()
        .map(|v| encoder.to_relaxed(v))
        .collect::<Result<Vec<_>>>()?;
    let objectives = objective.values(&relaxed)?;
    let names = encoder.space().shared_names();
    Ok(points
        .into_iter()
        .zip(objectives)
        .map(|(values, objective)| Candidate {
            feasible: constraints.is_satisfied(&values),
            vector: ParameterVector::new(names.clone(), values),
            objective,
        })
        .collect())
}

/// Source of raw start-point candidates.
struct RawSampler {
    #[cfg(feature = "sobol")]
    sobol: Option<SobolStream>,
}

impl RawSampler {
    #[cfg_attr(not(feature = "sobol"), allow(unused_variables))]
    fn new(init: StartInit, seed: u32) -> Self {
        Self {
            #[cfg(feature = "sobol")]
            sobol: matches!(init, StartInit::Sobol).then_some(SobolStream { seed, index: 0 }),
        }
    }

    fn draw(&mut self, space: &ParameterSpace, rng: &mut fastrand::Rng) -> Vec<ParamValue> {
        #[cfg(feature = "sobol")]
        let point = self.sobol.as_mut().map(|stream| stream.next_point(space));
        #[cfg(not(feature = "sobol"))]
        let point = None;
        point.unwrap_or_else(|| space.sample_random(rng))
    }
}

#[cfg(feature = "sobol")]
struct SobolStream {
    seed: u32,
    index: u32,
}

#[cfg(feature = "sobol")]
impl SobolStream {
    /// Dimensions supported by `sobol_burley`; larger spaces wrap around.
    const DIMENSIONS: u32 = 256;

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    fn next_point(&mut self, space: &ParameterSpace) -> Vec<ParamValue> {
        let index = self.index;
        self.index = self.index.wrapping_add(1);
        space
            .params()
            .iter()
            .enumerate()
            .map(|(dim, param)| {
                let u = f64::from(sobol_burley::sample(index, dim as u32 % Self::DIMENSIONS, self.seed));
                match param.kind() {
                    ParameterKind::Continuous { low, high } => ParamValue::Float(low + u * (high - low)),
                    _ => {
                        let n = param.n_options().unwrap_or(1);
                        param.option_value(((u * n as f64) as usize).min(n - 1))
                    }
                }
            })
            .collect()
    }
}
