//! Errors for marginal fits, copula correlation fitting and correlation
//! matrix repair.
use thiserror::Error;

use crate::random::VariateError;

/// Result alias for the correlation layer.
pub type CorrelationResult<T> = Result<T, CorrelationError>;

/// Unified error type for correlation estimation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CorrelationError {
    #[error("Empty sample: {what}")]
    EmptySample { what: &'static str },

    #[error("Length mismatch for {what}: expected {expected}, found {found}")]
    LengthMismatch { what: &'static str, expected: usize, found: usize },

    #[error("Invalid matrix: {reason}")]
    InvalidMatrix { reason: &'static str },

    #[error("Invalid option '{name}' = {value}: {reason}")]
    InvalidOption { name: &'static str, value: f64, reason: &'static str },

    #[error(transparent)]
    Variate(#[from] VariateError),
}
