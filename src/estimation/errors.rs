//! Errors for the Gamma-Poisson parameter estimators.
use thiserror::Error;

use crate::{arrivals::errors::ArrivalError, optimization::errors::OptError};

/// Result alias for the estimation layer.
pub type EstimationResult<T> = Result<T, EstimationError>;

/// Unified error type for method-of-moments and maximum-likelihood fits.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EstimationError {
    // ---- Input data ----
    #[error("Too few observations: found {found}, need at least {required}")]
    TooFewObservations { found: usize, required: usize },

    #[error("Count matrix has no periods")]
    NoPeriods,

    #[error("Length mismatch for {what}: expected {expected}, found {found}")]
    LengthMismatch { what: &'static str, expected: usize, found: usize },

    // ---- Configuration ----
    #[error("Invalid option '{name}' = {value}: {reason}")]
    InvalidOption { name: &'static str, value: f64, reason: &'static str },

    #[error("Invalid starting value for '{name}' at index {index}: {value}: {reason}")]
    InvalidStart { name: &'static str, index: usize, value: f64, reason: &'static str },

    // ---- Collaborators ----
    #[error("Optimization failed: {0}")]
    Optimization(#[from] OptError),

    #[error("Model construction failed: {0}")]
    Model(#[from] ArrivalError),
}
