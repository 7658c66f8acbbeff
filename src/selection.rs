//! Batch selection from a ranked candidate list.

use crate::param::{ParamValue, ParameterVector};

/// Picks up to `batch_size` distinct, previously-unmeasured points.
///
/// `ranked` must be ordered best first. Candidates are taken in that order;
/// one is skipped if its values equal (in every dimension) a
/// previously-measured point or a point already in the batch. The first
/// occurrence wins; there is no secondary sort key.
///
/// Returns fewer than `batch_size` points when the candidates run out.
/// That is a degraded result, not an error; callers are expected to check
/// the length and fall back to another proposal strategy.
///
/// # Example
///
/// ```
/// use acqopt::param::ParamValue;
/// use acqopt::parameter::Parameter;
/// use acqopt::selection::select_batch;
/// use acqopt::space::ParameterSpace;
///
/// let space = ParameterSpace::new(vec![Parameter::discrete("d", [1.0, 2.0, 3.0]).unwrap()]).unwrap();
/// let ranked: Vec<_> = [2.0, 2.0, 1.0, 3.0]
///     .into_iter()
///     .map(|v| space.vector(vec![ParamValue::Float(v)]).unwrap())
///     .collect();
/// let measured = vec![vec![ParamValue::Float(1.0)]];
///
/// let batch = select_batch(&ranked, 2, &measured);
/// let picked: Vec<_> = batch.iter().map(|v| v.values()[0].clone()).collect();
/// assert_eq!(picked, vec![ParamValue::Float(2.0), ParamValue::Float(3.0)]);
/// ```
#[must_use]
pub fn select_batch(
    ranked: &[ParameterVector],
    batch_size: usize,
    measured: &[Vec<ParamValue>],
) -> Vec<ParameterVector> {
    let mut batch: Vec<ParameterVector> = Vec::with_capacity(batch_size);
    for candidate in ranked {
        if batch.len() == batch_size {
            break;
        }
        let values = candidate.values();
        let seen = measured.iter().any(|m| m.as_slice() == values)
            || batch.iter().any(|b| b.values() == values);
        if !seen {
            batch.push(candidate.clone());
        }
    }

    if batch.len() < batch_size {
        trace_debug!(
            selected = batch.len(),
            batch_size,
            candidates = ranked.len(),
            "candidates exhausted before the batch was filled"
        );
    }

    batch
}
