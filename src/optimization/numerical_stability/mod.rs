//! numerical_stability — stable transforms and special-function helpers.
//!
//! Purpose
//! -------
//! Collect the small numerical building blocks shared by the L-BFGS
//! Dirichlet fit, the Monte-Carlo gamma-Poisson likelihood and the
//! negative-binomial marginal fits: guarded softplus/logistic transforms and
//! finite-sum forms of digamma/trigamma differences.
//!
//! Key behaviors
//! -------------
//! - [`transformations`]: `safe_softplus`, `safe_softplus_inv`,
//!   `safe_logistic` for positivity reparameterizations.
//! - [`special`]: `digamma_shift`, `trigamma_shift`, `ln_gamma_shift` for
//!   integer count arguments, plus `trigamma`, `log_sum_exp` and
//!   `ln_factorial`.
//!
//! Conventions
//! -----------
//! - Pure functions, no logging, no global state; safe inside tight
//!   Monte-Carlo loops.
//! - Domain validation lives in the calling layers; out-of-domain inputs
//!   return `NaN` rather than panicking.

pub mod special;
pub mod transformations;

pub use self::special::{
    digamma_shift, ln_factorial, ln_gamma_shift, log_sum_exp, trigamma, trigamma_shift,
};
pub use self::transformations::{POSITIVE_FLOOR, safe_logistic, safe_softplus, safe_softplus_inv};
