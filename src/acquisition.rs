//! The acquisition-function seam and the minimization boundary.
//!
//! Acquisition functions are external: they are fitted elsewhere and handed
//! to the optimizer as an [`AcquisitionFunction`]. They score points in the
//! relaxed encoding (see [`Encoding::Relaxed`](crate::encoding::Encoding))
//! and **higher is better**.
//!
//! Every backend in this crate minimizes. The sign flip happens in exactly
//! one place, [`MinimizationObjective`], which also replicates each point
//! across the batch dimension before calling the acquisition function.

use core::cell::Cell;

use crate::error::{Error, Result};

/// A fitted acquisition function.
///
/// `evaluate` receives `n` candidates, each given as `q` identical
/// replicas (`q` = batch size) of a relaxed point of length `d`, i.e. a
/// `n × q × d` array, and returns one score per candidate. Joint-batch
/// acquisition functions can use the replicas; pointwise ones read the
/// first row.
///
/// Closures `Fn(&[Vec<Vec<f64>>]) -> Vec<f64>` implement this trait. For
/// pointwise scores wrap a closure in [`Pointwise`].
pub trait AcquisitionFunction {
    /// Scores a batch of candidates. Higher is better.
    fn evaluate(&self, candidates: &[Vec<Vec<f64>>]) -> Vec<f64>;

    /// Analytic gradient of the score at one relaxed point replicated `q`
    /// times, if available. Backends fall back to finite differences when
    /// this returns `None`.
    fn gradient(&self, _x: &[f64], _q: usize) -> Option<Vec<f64>> {
        None
    }
}

impl<F> AcquisitionFunction for F
where
    F: Fn(&[Vec<Vec<f64>>]) -> Vec<f64>,
{
    fn evaluate(&self, candidates: &[Vec<Vec<f64>>]) -> Vec<f64> {
        self(candidates)
    }
}

/// Adapter turning a pointwise score `Fn(&[f64]) -> f64` into an
/// [`AcquisitionFunction`] that ignores the replicas.
///
/// ```
/// use acqopt::acquisition::{AcquisitionFunction, Pointwise};
///
/// let acqf = Pointwise(|x: &[f64]| -(x[0] - 0.3).powi(2));
/// let scores = acqf.evaluate(&[vec![vec![0.3]], vec![vec![0.5]]]);
/// assert!(scores[0] > scores[1]);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Pointwise<F>(pub F);

impl<F> AcquisitionFunction for Pointwise<F>
where
    F: Fn(&[f64]) -> f64,
{
    fn evaluate(&self, candidates: &[Vec<Vec<f64>>]) -> Vec<f64> {
        candidates
            .iter()
            .map(|replicas| replicas.first().map_or(f64::NAN, |x| (self.0)(x)))
            .collect()
    }
}

/// The negated acquisition function seen by all backends.
///
/// Values are `-acqf(x)`; non-finite scores map to `+inf` so broken
/// regions of the acquisition surface rank last. Counts evaluations.
pub struct MinimizationObjective<'a, A: ?Sized> {
    acqf: &'a A,
    batch_size: usize,
    n_evals: Cell<usize>,
}

impl<'a, A: AcquisitionFunction + ?Sized> MinimizationObjective<'a, A> {
    /// Wraps `acqf`, replicating every point `batch_size` times.
    #[must_use]
    pub fn new(acqf: &'a A, batch_size: usize) -> Self {
        Self {
            acqf,
            batch_size: batch_size.max(1),
            n_evals: Cell::new(0),
        }
    }

    /// Objective values (to minimize) for a batch of relaxed points.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AcquisitionShape`] if the acquisition function does
    /// not return one score per point.
    pub fn values(&self, points: &[Vec<f64>]) -> Result<Vec<f64>> {
        if points.is_empty() {
            return Ok(Vec::new());
        }
        let tiled: Vec<Vec<Vec<f64>>> = points
            .iter()
            .map(|x| vec![x.clone(); self.batch_size])
            .collect();
        let scores = self.acqf.evaluate(&tiled);
        if scores.len() != points.len() {
            return Err(Error::AcquisitionShape {
                expected: points.len(),
                got: scores.len(),
            });
        }
        self.n_evals.set(self.n_evals.get() + points.len());
        Ok(scores
            .into_iter()
            .map(|s| if s.is_finite() { -s } else { f64::INFINITY })
            .collect())
    }

    /// Gradient of the objective (negated acquisition gradient), if the
    /// acquisition function provides one.
    pub fn gradient(&self, x: &[f64]) -> Option<Vec<f64>> {
        self.acqf
            .gradient(x, self.batch_size)
            .map(|g| g.into_iter().map(|v| -v).collect())
    }

    /// Number of points evaluated so far.
    #[must_use]
    pub fn n_evals(&self) -> usize {
        self.n_evals.get()
    }

    /// Batch size used for replication.
    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negates_and_counts() {
        let acqf = Pointwise(|x: &[f64]| x[0]);
        let obj = MinimizationObjective::new(&acqf, 3);
        let v = obj.values(&[vec![0.25], vec![2.0]]).unwrap();
        assert_eq!(v, vec![-0.25, -2.0]);
        assert_eq!(obj.n_evals(), 2);
    }

    #[test]
    fn replicates_across_batch_dimension() {
        let acqf = |c: &[Vec<Vec<f64>>]| c.iter().map(|r| r.len() as f64).collect::<Vec<f64>>();
        let obj = MinimizationObjective::new(&acqf, 4);
        assert_eq!(obj.values(&[vec![0.0, 1.0]]).unwrap(), vec![-4.0]);
    }

    #[test]
    fn non_finite_scores_rank_last() {
        let acqf = Pointwise(|x: &[f64]| if x[0] > 0.5 { f64::NAN } else { 1.0 });
        let obj = MinimizationObjective::new(&acqf, 1);
        assert_eq!(obj.values(&[vec![0.9], vec![0.1]]).unwrap(), vec![f64::INFINITY, -1.0]);
    }

    #[test]
    fn wrong_score_count_is_an_error() {
        let acqf = |_: &[Vec<Vec<f64>>]| vec![1.0];
        let obj = MinimizationObjective::new(&acqf, 1);
        assert!(matches!(
            obj.values(&[vec![0.0], vec![1.0]]),
            Err(Error::AcquisitionShape { expected: 2, got: 1 })
        ));
    }
}
