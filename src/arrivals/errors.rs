//! Errors for arrival processes and arrival-rate models.
//!
//! ## Taxonomy
//! - **Configuration** (`InvalidRate`, `InvalidShape`, `LengthMismatch`,
//!   `InvalidCorrelation`, ...): detected eagerly at construction.
//! - **State sequencing** (`IllegalState`): `start` twice, `stop` when
//!   stopped, listener mutation during a broadcast, non-zero wrap-up counts.
//! - **Unsupported operations** (`Unsupported`): rate queries a variant
//!   cannot answer, stationary starts without a locked period.
//! - **Collaborator failures** (`ContactInstantiation`, `Variate`,
//!   `Numerical`, `Fit`).
use thiserror::Error;

use crate::{correlation::CorrelationError, optimization::errors::OptError, random::VariateError};

/// Result alias for the arrivals layer.
pub type ArrivalResult<T> = Result<T, ArrivalError>;

/// Unified error type for arrival processes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArrivalError {
    // ---- Configuration ----
    #[error("Invalid rate at period {period}: {value}: {reason}")]
    InvalidRate { period: usize, value: f64, reason: &'static str },

    #[error("Invalid shape parameter at index {index}: {value}: {reason}")]
    InvalidShape { index: usize, value: f64, reason: &'static str },

    #[error("Invalid parameter '{name}' = {value}: {reason}")]
    InvalidParameter { name: &'static str, value: f64, reason: &'static str },

    #[error("Length mismatch for {what}: expected {expected}, found {found}")]
    LengthMismatch { what: &'static str, expected: usize, found: usize },

    #[error("Invalid period boundaries at index {index}: {reason}")]
    InvalidPeriods { index: usize, reason: &'static str },

    #[error("Invalid correlation matrix: {reason}")]
    InvalidCorrelation { reason: &'static str },

    #[error("Correlation matrix is not positive definite")]
    NotPositiveDefinite,

    // ---- State sequencing ----
    #[error("Illegal state: {reason}")]
    IllegalState { reason: &'static str },

    // ---- Unsupported operations ----
    #[error("Unsupported operation for {model}: {reason}")]
    Unsupported { model: &'static str, reason: &'static str },

    // ---- Guards ----
    #[error("Rate {rate} at time {time} exceeds the thinning bound {bound}")]
    RateExceedsBound { time: f64, rate: f64, bound: f64 },

    // ---- Collaborators ----
    #[error("Contact factory '{factory}' failed: {reason}")]
    ContactInstantiation { factory: String, reason: String },

    #[error(transparent)]
    Variate(#[from] VariateError),

    #[error("Numerical routine failed: {0}")]
    Numerical(#[from] OptError),

    #[error("Parameter fit failed: {0}")]
    Fit(#[from] CorrelationError),
}

impl ArrivalError {
    pub(crate) fn illegal(reason: &'static str) -> Self {
        ArrivalError::IllegalState { reason }
    }

    pub(crate) fn unsupported(model: &'static str, reason: &'static str) -> Self {
        ArrivalError::Unsupported { model, reason }
    }
}
