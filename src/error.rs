#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Returned when a continuous parameter's lower bound exceeds its upper bound.
    #[error("invalid bounds for '{name}': low ({low}) must be less than or equal to high ({high})")]
    InvalidBounds {
        /// The parameter name.
        name: String,
        /// The lower bound value.
        low: f64,
        /// The upper bound value.
        high: f64,
    },

    /// Returned when a discrete or categorical parameter has no options.
    #[error("parameter '{0}' must have at least one option")]
    EmptyOptions(String),

    /// Returned when a bound, option, or descriptor is NaN or infinite.
    #[error("parameter '{0}' contains a non-finite value")]
    NonFiniteValue(String),

    /// Returned when two parameters share a name.
    #[error("duplicate parameter name '{0}'")]
    DuplicateParameter(String),

    /// Returned when a parameter space has no parameters.
    #[error("parameter space must contain at least one parameter")]
    EmptySpace,

    /// Returned when categorical descriptors do not match the option list.
    #[error("descriptors for '{name}': {reason}")]
    DescriptorMismatch {
        /// The parameter name.
        name: String,
        /// What is wrong with the descriptors.
        reason: &'static str,
    },

    /// Returned when a parameter type tag is not recognized.
    #[error("unknown parameter type '{0}' (expected continuous, discrete, or categorical)")]
    UnknownParameterType(String),

    /// Returned when a backend kind is not recognized.
    #[error("unknown backend kind '{0}' (expected gradient, genetic, or generic-population)")]
    UnknownBackend(String),

    /// Returned when the requested batch size is zero.
    #[error("batch size must be at least 1")]
    ZeroBatchSize,

    /// Returned when a population backend is configured with `batch_size >= pop_size`.
    #[error("batch size ({batch_size}) must be strictly less than the population size ({pop_size})")]
    BatchSizeExceedsPopulation {
        /// The requested batch size.
        batch_size: usize,
        /// The configured population size.
        pop_size: usize,
    },

    /// Returned when a population algorithm needs more members than configured.
    #[error("population size {got} is too small, need at least {min}")]
    PopulationTooSmall {
        /// The minimum population size for the algorithm.
        min: usize,
        /// The configured population size.
        got: usize,
    },

    /// Returned when a penalty policy does not separate feasible from infeasible.
    #[error("invalid penalty policy: feasible value must be < 0 and infeasible value > 0")]
    InvalidPenalty,

    /// Returned when a numeric option is outside its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Returned when a point has the wrong number of entries.
    #[error("dimension mismatch: expected {expected} values, got {got}")]
    DimensionMismatch {
        /// The expected number of entries.
        expected: usize,
        /// The actual number of entries.
        got: usize,
    },

    /// Returned when a value does not fit the parameter at the same position.
    #[error("value for '{name}' does not fit its parameter: {reason}")]
    ValueMismatch {
        /// The parameter name.
        name: String,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// Returned when the acquisition function returns the wrong number of scores.
    #[error("acquisition function returned {got} scores for {expected} candidates")]
    AcquisitionShape {
        /// The number of candidates passed in.
        expected: usize,
        /// The number of scores returned.
        got: usize,
    },
}

pub type Result<T> = core::result::Result<T, Error>;
