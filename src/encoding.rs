//! Bidirectional mapping between raw parameter values and the two encoded
//! forms the search backends work on.
//!
//! | Parameter | [`Encoding::Relaxed`] (gradient) | [`Encoding::Native`] (population) |
//! |-----------|----------------------------------|-----------------------------------|
//! | Continuous | value scaled to `[0, 1]` | [`Gene::Real`] with the raw value |
//! | Discrete | option value scaled to `[0, 1]`, snapped to the nearest option on decode | [`Gene::Index`] into the option list |
//! | Categorical | one-hot block, or the scaled descriptor if descriptors exist | [`Gene::Choice`] into the option list |
//!
//! Native encoding round-trips exactly. Relaxed encoding round-trips every
//! discrete or categorical value exactly, and a continuous value exactly
//! whenever no other float in its range scales to the same column.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::param::{ParamValue, ParameterVector};
use crate::parameter::ParameterKind;
use crate::space::ParameterSpace;
use crate::variable::{ChoiceDomain, Gene, IndexDomain, RealDomain, Variable};

/// Target representation of an encoding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// Fully expanded real vector in `[0, 1]^d`, used by gradient search.
    Relaxed,
    /// One typed gene per parameter, used by population search.
    Native,
}

/// A point in one of the encoded forms.
#[derive(Clone, Debug, PartialEq)]
pub enum EncodedPoint {
    /// Expanded real vector.
    Relaxed(Vec<f64>),
    /// Typed genes.
    Native(Vec<Gene>),
}

impl EncodedPoint {
    /// Returns which encoding this point uses.
    #[must_use]
    pub fn encoding(&self) -> Encoding {
        match self {
            Self::Relaxed(_) => Encoding::Relaxed,
            Self::Native(_) => Encoding::Native,
        }
    }
}

/// How one parameter occupies columns of the relaxed vector.
#[derive(Clone, Debug)]
pub(crate) enum Block {
    /// One column, affine-scaled with `(lo, hi)`.
    Scalar { lo: f64, hi: f64 },
    /// One column per option.
    OneHot,
    /// Descriptor columns, each min/max scaled across options.
    Descriptor { scaled: Vec<Vec<f64>> },
}

#[derive(Clone, Debug)]
pub(crate) struct Segment {
    pub(crate) offset: usize,
    pub(crate) width: usize,
    pub(crate) block: Block,
}

/// Convert a value to `[0, 1]` using bounds.
fn to_normalized(value: f64, lo: f64, hi: f64) -> f64 {
    if (hi - lo).abs() < 1e-15 {
        0.5
    } else {
        (value - lo) / (hi - lo)
    }
}

/// Convert a `[0, 1]` value back to the original range.
fn from_normalized(value: f64, lo: f64, hi: f64) -> f64 {
    if (hi - lo).abs() < 1e-15 {
        lo
    } else {
        lo + value * (hi - lo)
    }
}

/// Nearest-ulp search width used to undo the rounding of [`to_normalized`].
const UNSCALE_ULPS: usize = 4;

/// Inverse of [`to_normalized`] that recovers the encoded float.
///
/// Returns the float closest to the affine inverse whose scaled value is
/// exactly `value`, or the affine inverse if none is within reach.
fn from_normalized_exact(value: f64, lo: f64, hi: f64) -> f64 {
    let guess = from_normalized(value, lo, hi);
    if to_normalized(guess, lo, hi) == value {
        return guess;
    }
    let (mut up, mut down) = (guess, guess);
    for _ in 0..UNSCALE_ULPS {
        up = up.next_up();
        if to_normalized(up, lo, hi) == value {
            return up;
        }
        down = down.next_down();
        if to_normalized(down, lo, hi) == value {
            return down;
        }
    }
    guess
}

/// Index of the first maximum, treating NaN as smaller than everything.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

/// Index of the first option closest to `target`.
fn nearest<'a>(target: &[f64], options: impl Iterator<Item = &'a [f64]>) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, option) in options.enumerate() {
        let dist: f64 = option
            .iter()
            .zip(target)
            .map(|(o, t)| (o - t) * (o - t))
            .sum();
        if dist < best_dist {
            best = i;
            best_dist = dist;
        }
    }
    best
}

/// Encoder for one parameter space.
///
/// Built once per space and shared by every backend; cheap to clone.
#[derive(Clone, Debug)]
pub struct Encoder {
    space: Arc<ParameterSpace>,
    segments: Vec<Segment>,
    variables: Vec<Variable>,
    dim: usize,
}

impl Encoder {
    /// Builds the encoding layout for a space.
    #[must_use]
    pub fn new(space: Arc<ParameterSpace>) -> Self {
        let mut segments = Vec::with_capacity(space.len());
        let mut variables = Vec::with_capacity(space.len());
        let mut offset = 0;

        for param in space.params() {
            let (block, width, variable) = match param.kind() {
                ParameterKind::Continuous { low, high } => (
                    Block::Scalar { lo: *low, hi: *high },
                    1,
                    Variable::Real(RealDomain {
                        low: *low,
                        high: *high,
                    }),
                ),
                ParameterKind::Discrete { options } => {
                    let lo = options.iter().copied().fold(f64::INFINITY, f64::min);
                    let hi = options.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    (
                        Block::Scalar { lo, hi },
                        1,
                        Variable::Index(IndexDomain {
                            n_values: options.len(),
                        }),
                    )
                }
                ParameterKind::Categorical {
                    options,
                    descriptors,
                } => {
                    let variable = Variable::Choice(ChoiceDomain {
                        n_choices: options.len(),
                    });
                    match descriptors {
                        None => (Block::OneHot, options.len(), variable),
                        Some(desc) => {
                            let width = desc[0].len();
                            let scaled = (0..desc.len())
                                .map(|i| {
                                    (0..width)
                                        .map(|j| {
                                            let column = desc.iter().map(|d| d[j]);
                                            let lo = column.clone().fold(f64::INFINITY, f64::min);
                                            let hi = column.fold(f64::NEG_INFINITY, f64::max);
                                            to_normalized(desc[i][j], lo, hi)
                                        })
                                        .collect()
                                })
                                .collect();
                            (Block::Descriptor { scaled }, width, variable)
                        }
                    }
                }
            };
            segments.push(Segment {
                offset,
                width,
                block,
            });
            variables.push(variable);
            offset += width;
        }

        Self {
            space,
            segments,
            variables,
            dim: offset,
        }
    }

    /// Returns the encoded space.
    #[must_use]
    pub fn space(&self) -> &ParameterSpace {
        &self.space
    }

    /// Returns the length of a relaxed vector.
    #[must_use]
    pub fn relaxed_dim(&self) -> usize {
        self.dim
    }

    /// Returns the typed decision variables of the native encoding.
    #[must_use]
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub(crate) fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Encodes a raw value array.
    ///
    /// # Errors
    ///
    /// Returns an error if `values` is not a valid point of the space.
    pub fn encode(&self, values: &[ParamValue], encoding: Encoding) -> Result<EncodedPoint> {
        Ok(match encoding {
            Encoding::Relaxed => EncodedPoint::Relaxed(self.to_relaxed(values)?),
            Encoding::Native => EncodedPoint::Native(self.to_genome(values)?),
        })
    }

    /// Decodes an encoded point back to a parameter vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] for a wrong length and
    /// [`Error::ValueMismatch`] if a gene has the wrong type for its parameter.
    ///
    /// # Panics
    ///
    /// Panics if a gene holds an option index outside its parameter's
    /// option list.
    pub fn decode(&self, point: &EncodedPoint) -> Result<ParameterVector> {
        match point {
            EncodedPoint::Relaxed(x) => self.decode_relaxed(x),
            EncodedPoint::Native(genes) => self.decode_genome(genes),
        }
    }

    /// Encodes raw values into the relaxed `[0, 1]^d` form.
    ///
    /// # Errors
    ///
    /// Returns an error if `values` is not a valid point of the space.
    pub fn to_relaxed(&self, values: &[ParamValue]) -> Result<Vec<f64>> {
        self.space.check(values)?;
        let mut x = vec![0.0; self.dim];
        for ((segment, param), value) in self.segments.iter().zip(self.space.params()).zip(values) {
            match &segment.block {
                Block::Scalar { lo, hi } => {
                    let v = value.as_f64().unwrap_or_default();
                    x[segment.offset] = to_normalized(v, *lo, *hi);
                }
                Block::OneHot => {
                    let idx = param.option_index(value).unwrap_or_default();
                    x[segment.offset + idx] = 1.0;
                }
                Block::Descriptor { scaled } => {
                    let idx = param.option_index(value).unwrap_or_default();
                    x[segment.offset..segment.offset + segment.width].copy_from_slice(&scaled[idx]);
                }
            }
        }
        Ok(x)
    }

    /// Decodes a relaxed vector, snapping every discrete and categorical
    /// block to the nearest admissible option.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] if `x` has the wrong length.
    pub fn decode_relaxed(&self, x: &[f64]) -> Result<ParameterVector> {
        if x.len() != self.dim {
            return Err(Error::DimensionMismatch {
                expected: self.dim,
                got: x.len(),
            });
        }
        Ok(ParameterVector::new(self.space.shared_names(), self.snap_relaxed(x)))
    }

    /// Raw values for a relaxed vector of the correct length.
    pub(crate) fn snap_relaxed(&self, x: &[f64]) -> Vec<ParamValue> {
        self.segments
            .iter()
            .zip(self.space.params())
            .map(|(segment, param)| {
                let cols = &x[segment.offset..segment.offset + segment.width];
                match (&segment.block, param.kind()) {
                    (Block::Scalar { lo, hi }, ParameterKind::Continuous { low, high }) => {
                        ParamValue::Float(from_normalized_exact(cols[0], *lo, *hi).clamp(*low, *high))
                    }
                    (Block::Scalar { lo, hi }, ParameterKind::Discrete { options }) => {
                        let v = from_normalized(cols[0], *lo, *hi);
                        let idx = nearest(&[v], options.iter().map(core::slice::from_ref));
                        ParamValue::Float(options[idx])
                    }
                    (Block::OneHot, _) => param.option_value(argmax(cols)),
                    (Block::Descriptor { scaled }, _) => {
                        param.option_value(nearest(cols, scaled.iter().map(Vec::as_slice)))
                    }
                    (Block::Scalar { .. }, ParameterKind::Categorical { .. }) => {
                        unreachable!("categorical parameters never use a scalar block")
                    }
                }
            })
            .collect()
    }

    /// Encodes raw values as typed genes.
    ///
    /// # Errors
    ///
    /// Returns an error if `values` is not a valid point of the space.
    pub fn to_genome(&self, values: &[ParamValue]) -> Result<Vec<Gene>> {
        self.space.check(values)?;
        Ok(self
            .space
            .params()
            .iter()
            .zip(values)
            .map(|(param, value)| match param.kind() {
                ParameterKind::Continuous { .. } => Gene::Real(value.as_f64().unwrap_or_default()),
                ParameterKind::Discrete { .. } => Gene::Index(param.option_index(value).unwrap_or_default()),
                ParameterKind::Categorical { .. } => {
                    Gene::Choice(param.option_index(value).unwrap_or_default())
                }
            })
            .collect())
    }

    /// Decodes typed genes by index lookup.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimensionMismatch`] for a wrong length and
    /// [`Error::ValueMismatch`] for a gene of the wrong type.
    ///
    /// # Panics
    ///
    /// Panics if an index gene is outside its parameter's option list.
    pub fn decode_genome(&self, genes: &[Gene]) -> Result<ParameterVector> {
        Ok(ParameterVector::new(self.space.shared_names(), self.genome_values(genes)?))
    }

    pub(crate) fn genome_values(&self, genes: &[Gene]) -> Result<Vec<ParamValue>> {
        if genes.len() != self.space.len() {
            return Err(Error::DimensionMismatch {
                expected: self.space.len(),
                got: genes.len(),
            });
        }
        self.space
            .params()
            .iter()
            .zip(genes)
            .map(|(param, gene)| match (param.kind(), gene) {
                (ParameterKind::Continuous { low, high }, Gene::Real(v)) => {
                    Ok(ParamValue::Float(v.clamp(*low, *high)))
                }
                (ParameterKind::Discrete { .. }, Gene::Index(i))
                | (ParameterKind::Categorical { .. }, Gene::Choice(i)) => Ok(param.option_value(*i)),
                _ => Err(Error::ValueMismatch {
                    name: param.name().to_owned(),
                    reason: "gene type does not match the parameter type",
                }),
            })
            .collect()
    }
}
