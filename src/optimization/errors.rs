//! Errors for the optimization layer (L-BFGS log-likelihood maximization,
//! stochastic trust-region ascent, and the `argmin` backend).
//!
//! ## Conventions
//! - Indices are 0-based.
//! - Option validation failures carry the offending value and a static
//!   reason string.
//! - `argmin::core::Error` values are normalized into [`OptError`] through
//!   the `From` impl below, so backend errors never leak past this module.
use argmin::core::{ArgminError, Error};
use thiserror::Error;

use crate::random::VariateError;

/// Result alias for optimization routines.
pub type OptResult<T> = Result<T, OptError>;

/// Unified error type for the optimizers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptError {
    // ---- Gradient ----
    #[error("Gradient optimization not implemented")]
    GradientNotImplemented,

    #[error("Gradient dimension mismatch: expected {expected}, found {found}")]
    GradientDimMismatch { expected: usize, found: usize },

    #[error("Invalid gradient at index {index}: {value}: {reason}")]
    InvalidGradient { index: usize, value: f64, reason: &'static str },

    // ---- L-BFGS options ----
    #[error("Invalid gradient tolerance {tol}: {reason}")]
    InvalidTolGrad { tol: f64, reason: &'static str },

    #[error("Invalid cost function change tolerance {tol}: {reason}")]
    InvalidTolCost { tol: f64, reason: &'static str },

    #[error("Invalid maximum iterations {max_iter}: {reason}")]
    InvalidMaxIter { max_iter: usize, reason: &'static str },

    #[error("No tolerances provided")]
    NoTolerancesProvided,

    #[error("Invalid line searcher '{name}': {reason}")]
    InvalidLineSearch { name: String, reason: &'static str },

    #[error("Invalid L-BFGS memory {mem}: {reason}")]
    InvalidLBFGSMem { mem: usize, reason: &'static str },

    // ---- Trust-region options ----
    #[error("Invalid trust-region option '{name}' = {value}: {reason}")]
    InvalidTrustRegionOption { name: &'static str, value: f64, reason: &'static str },

    // ---- Objective ----
    #[error("Non-finite cost value: {value}")]
    NonFiniteCost { value: f64 },

    #[error("Parameter dimension mismatch: expected {expected}, found {found}")]
    ThetaDimMismatch { expected: usize, found: usize },

    #[error("Invalid parameter at index {index}: {value}: {reason}")]
    InvalidThetaInput { index: usize, value: f64, reason: &'static str },

    #[error("Monte Carlo sampling failed: {text}")]
    Sampling { text: String },

    // ---- Optimizer outcome ----
    #[error("Invalid estimated parameter at index {index}: {value}: {reason}")]
    InvalidThetaHat { index: usize, value: f64, reason: &'static str },

    #[error("Missing estimated parameters (theta hat)")]
    MissingThetaHat,

    // ---- Argmin ----
    #[error("Invalid parameter: {text}")]
    InvalidParameter { text: String },

    #[error("Not implemented: {text}")]
    NotImplemented { text: String },

    #[error("Not initialized: {text}")]
    NotInitialized { text: String },

    #[error("Condition violated: {text}")]
    ConditionViolated { text: String },

    #[error("Checkpoint not found: {text}")]
    CheckPointNotFound { text: String },

    #[error("Potential bug: {text}")]
    PotentialBug { text: String },

    #[error("Impossible error: {text}")]
    ImpossibleError { text: String },

    #[error("Backend error: {text}")]
    BackendError { text: String },

    // ---- Fallback ----
    #[error("Unknown error")]
    UnknownError,
}

impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        match original_err.downcast::<ArgminError>() {
            Ok(opt_err) => match opt_err {
                ArgminError::InvalidParameter { text } => OptError::InvalidParameter { text },
                ArgminError::NotImplemented { text } => OptError::NotImplemented { text },
                ArgminError::NotInitialized { text } => OptError::NotInitialized { text },
                ArgminError::ConditionViolated { text } => OptError::ConditionViolated { text },
                ArgminError::CheckpointNotFound { text } => OptError::CheckPointNotFound { text },
                ArgminError::PotentialBug { text } => OptError::PotentialBug { text },
                ArgminError::ImpossibleError { text } => OptError::ImpossibleError { text },
                _ => OptError::UnknownError,
            },
            Err(err) => match err.downcast::<OptError>() {
                Ok(inner) => inner,
                Err(err) => OptError::BackendError { text: err.to_string() },
            },
        }
    }
}

impl From<VariateError> for OptError {
    fn from(err: VariateError) -> Self {
        OptError::Sampling { text: err.to_string() }
    }
}
