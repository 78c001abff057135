//! Errors raised by variate generators when handed invalid parameters.
use thiserror::Error;

/// Result alias for variate generation.
pub type VariateResult<T> = Result<T, VariateError>;

/// Invalid distribution parameters passed to a generator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VariateError {
    /// A scalar parameter is non-finite or outside its domain.
    #[error("Invalid {distribution} parameter {value}: {reason}")]
    InvalidParameter { distribution: &'static str, value: f64, reason: &'static str },

    /// A probability vector does not sum to a positive finite mass.
    #[error("Invalid {distribution} probability vector (total mass {total}): {reason}")]
    InvalidProbabilities { distribution: &'static str, total: f64, reason: &'static str },

    /// A Cholesky factor does not match the requested dimension.
    #[error("Cholesky factor dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
}
