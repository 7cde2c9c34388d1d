//! Error types for hexreco-core.

use thiserror::Error;

/// Result type alias for hexreco operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for hexreco operations.
#[derive(Error, Debug)]
pub enum Error {
    /// A result was requested before the step producing it ran.
    #[error("not ready: {0}")]
    NotReady(&'static str),

    /// An operation was called out of its lifecycle order.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Cell address outside the supported sensor layout.
    #[error("invalid cell address: layer {layer}, sensor ({sensor_u}, {sensor_v}), cell ({cell_u}, {cell_v})")]
    InvalidCellAddress {
        layer: i16,
        sensor_u: i16,
        sensor_v: i16,
        cell_u: i16,
        cell_v: i16,
    },
}

/// Failures of the least-squares polynomial fit.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitError {
    /// Fewer usable points than polynomial coefficients.
    #[error("{usable} usable points, {required} required")]
    InsufficientPoints { usable: usize, required: usize },

    /// The design matrix does not have full column rank.
    #[error("design matrix has rank {rank}, {required} required")]
    RankDeficient { rank: usize, required: usize },

    /// Input contains NaN or infinite values.
    #[error("non-finite input value")]
    NonFiniteInput,

    /// Coordinate and error slices differ in length.
    #[error("length mismatch: {x} abscissae, {y} ordinates, {errors} errors")]
    LengthMismatch { x: usize, y: usize, errors: usize },

    /// The linear solver failed.
    #[error("solver failure: {0}")]
    Solver(String),
}
