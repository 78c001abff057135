//! optimization — maximizers, numerical helpers and the shared error
//! surface of the estimation layers.
//!
//! Purpose
//! -------
//! Provide the two optimizers the crate fits models with, plus the small
//! numerical toolkit and error type they share:
//!
//! - [`loglik_optimizer`]: deterministic L-BFGS maximization of closed-form
//!   log-likelihoods through `argmin` (Dirichlet-multinomial fits).
//! - [`trust_region`]: stochastic trust-region ascent for Monte-Carlo
//!   objectives with grouped step regulators (Gamma-Poisson likelihood).
//! - [`stochastic_approx`]: Robbins–Monro gain sequences shared by the
//!   trust region and the NORTA correlation search.
//! - [`numerical_stability`]: guarded transforms and special-function
//!   helpers.
//!
//! Conventions
//! -----------
//! - Both optimizers maximize; the L-BFGS path minimizes `c(θ) = −ℓ(θ)`
//!   internally and reports results in log-likelihood space.
//! - Parameters and gradients are `ndarray` vectors ([`loglik_optimizer::Theta`],
//!   [`loglik_optimizer::Grad`]).
//! - Every fallible entry point returns [`errors::OptResult`]; backend
//!   `argmin` errors and variate-generation errors are converted into
//!   [`errors::OptError`].
//! - Progress is reported through `tracing` at `debug`/`trace` level.

pub mod errors;
pub mod loglik_optimizer;
pub mod numerical_stability;
pub mod stochastic_approx;
pub mod trust_region;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::loglik_optimizer::{Grad, LbfgsOptions, LogLikelihood, OptimOutcome, Theta, Tolerances, maximize};
    pub use super::numerical_stability::{log_sum_exp, safe_softplus, safe_softplus_inv};
    pub use super::stochastic_approx::AnnealingGain;
    pub use super::trust_region::{
        StochasticEvaluation, StochasticObjective, TrustRegionOptions, TrustRegionOutcome, maximize_stochastic,
    };
}
