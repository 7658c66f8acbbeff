#![allow(clippy::cast_precision_loss)]

mod genetic;
mod gradient;
mod population;
mod scenarios;

use acqopt::param::ParamValue;

/// Euclidean distance between two equally long float arrays.
pub(crate) fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}

/// Float view of an all-numeric raw point.
pub(crate) fn floats(values: &[ParamValue]) -> Vec<f64> {
    values.iter().map(|v| v.as_f64().unwrap()).collect()
}
