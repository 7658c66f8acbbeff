#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(unreachable_pub)]
#![deny(clippy::correctness)]
#![deny(clippy::suspicious)]
#![deny(clippy::style)]
#![deny(clippy::complexity)]
#![deny(clippy::perf)]
#![deny(clippy::pedantic)]
#![deny(clippy::std_instead_of_core)]

//! Acquisition function optimization for Bayesian optimization over
//! mixed continuous, discrete and categorical parameter spaces with known
//! feasibility constraints.
//!
//! Given a fitted acquisition function, the [`AcquisitionOptimizer`]
//! searches the space for the points with the highest acquisition value,
//! drops points that violate a known constraint or were already measured,
//! and returns a batch of distinct proposals.
//!
//! # Getting Started
//!
//! ```
//! use acqopt::prelude::*;
//!
//! let space = ParameterSpace::new(vec![
//!     Parameter::continuous("temperature", 20.0, 80.0).unwrap(),
//!     Parameter::discrete("loading", [0.5, 1.0, 2.0]).unwrap(),
//!     Parameter::categorical("solvent", ["water", "ethanol", "toluene"]).unwrap(),
//! ])
//! .unwrap();
//!
//! let optimizer = AcquisitionOptimizer::builder(space)
//!     .backend(BackendKind::Genetic)
//!     .pop_size(40)
//!     .max_generations(20)
//!     .batch_size(3)
//!     .seed(42)
//!     .build()
//!     .unwrap();
//!
//! // Scores relaxed points; higher is better.
//! let acqf = Pointwise(|x: &[f64]| x[0] - (x[1] - 0.5).abs());
//! let no_water = KnownConstraints::new().with(|p: &[ParamValue]| p[2].as_str() != Some("water"));
//! let measured = vec![vec![
//!     ParamValue::Float(80.0),
//!     ParamValue::Float(1.0),
//!     ParamValue::from("ethanol"),
//! ]];
//!
//! let batch = optimizer.optimize(&acqf, &no_water, &measured).unwrap();
//! assert!(batch.len() <= 3);
//! for point in &batch {
//!     assert_ne!(point.get("solvent").and_then(|v| v.as_str()), Some("water"));
//! }
//! ```
//!
//! # Core Concepts
//!
//! | Type | Role |
//! |------|------|
//! | [`ParameterSpace`](space::ParameterSpace) | Ordered, named [`Parameter`](parameter::Parameter)s and their [`ProblemType`](space::ProblemType). |
//! | [`Encoder`](encoding::Encoder) | Lossless mapping between raw values and the relaxed or native encodings. |
//! | [`KnownConstraints`](constraint::KnownConstraints) | Boolean feasibility predicates and their numeric penalty. |
//! | [`AcquisitionFunction`](acquisition::AcquisitionFunction) | The externally fitted score to maximize. |
//! | [`AcquisitionOptimizer`] | Picks a backend, runs the search, selects the batch. |
//!
//! # Backends
//!
//! | [`BackendKind`] | Search | Encoding |
//! |-----------------|--------|----------|
//! | `Gradient` | [`GradientBackend`](search::GradientBackend): multi-start Adam, categorical combinations enumerated | relaxed |
//! | `Genetic` | [`GeneticAlgorithm`](search::GeneticAlgorithm): SBX, polynomial mutation, elitist survival | native |
//! | `GenericPopulation` | any [`PopulationAlgorithm`](search::PopulationAlgorithm), [`DifferentialEvolution`](search::DifferentialEvolution) by default | native |
//!
//! # Feature Flags
//!
//! | Flag | What it enables | Default |
//! |------|----------------|---------|
//! | `serde` | `Serialize`/`Deserialize` on configuration and value types, [`SearchHistory::save`](history::SearchHistory)/`load` | off |
//! | `sobol` | Scrambled Sobol start points for the gradient backend ([`StartInit::Sobol`](search::StartInit)) | off |
//! | `tracing` | Structured log events via [`tracing`](https://docs.rs/tracing) at the start and end of each search | off |

/// Emit a `tracing::info!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_info {
    ($($arg:tt)*) => { tracing::info!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_info {
    ($($arg:tt)*) => {};
}

/// Emit a `tracing::debug!` event when the `tracing` feature is enabled.
/// No-op otherwise.
#[cfg(feature = "tracing")]
macro_rules! trace_debug {
    ($($arg:tt)*) => { tracing::debug!($($arg)*) };
}

#[cfg(not(feature = "tracing"))]
macro_rules! trace_debug {
    ($($arg:tt)*) => {};
}

pub mod acquisition;
pub mod constraint;
pub mod encoding;
mod error;
pub mod history;
mod optimizer;
pub mod param;
pub mod parameter;
mod rng_util;
pub mod search;
pub mod selection;
pub mod space;
pub mod variable;

pub use error::{Error, Result};
pub use optimizer::{
    AcquisitionOptimizer, AcquisitionOptimizerBuilder, BackendKind, OptimizationReport,
    OptimizerConfig,
};

/// Convenient wildcard import for the most common types.
///
/// ```
/// use acqopt::prelude::*;
/// ```
pub mod prelude {
    pub use crate::acquisition::{AcquisitionFunction, Pointwise};
    pub use crate::constraint::{KnownConstraints, PenaltyPolicy};
    pub use crate::encoding::{EncodedPoint, Encoder, Encoding};
    pub use crate::error::{Error, Result};
    pub use crate::history::{GenerationRecord, SearchHistory};
    pub use crate::optimizer::{
        AcquisitionOptimizer, AcquisitionOptimizerBuilder, BackendKind, OptimizationReport,
        OptimizerConfig,
    };
    pub use crate::param::{ParamValue, ParameterVector};
    pub use crate::parameter::{Parameter, ParameterKind, ParameterType};
    pub use crate::search::{
        AlgorithmKind, DifferentialEvolution, DifferentialEvolutionConfig,
        DifferentialEvolutionStrategy, GeneticAlgorithm, GeneticConfig, GradientConfig,
        PopulationAlgorithm, Problem, StartInit, Termination,
    };
    pub use crate::selection::select_batch;
    pub use crate::space::{ParameterSpace, ProblemType};
    pub use crate::variable::{Gene, Variable};
}
