//! estimation — parameter estimation for the doubly-stochastic
//! Gamma-Poisson arrival model.
//!
//! Purpose
//! -------
//! Fit base rates `λ_p`, period shapes `R_p` and the daily shape `Q` of
//! `X_p ~ Poisson(λ_p · b · ξ_p)`, `b ~ Gamma(Q, Q)`, `ξ_p ~ Gamma(R_p, R_p)`,
//! from a matrix of historical counts (days × main periods).
//!
//! Key behaviors
//! -------------
//! - [`method_of_moments`]: closed-form estimates, used as the starting
//!   point of the likelihood fits.
//! - [`maximum_likelihood`] / [`maximum_likelihood_spline`]: Monte-Carlo
//!   likelihood maximized by the stochastic trust region, with a common
//!   shape or smoothed per-period shapes.
//! - [`GammaPoissonFit`] converts to the rate and busyness models consumed
//!   by the arrival processes.
//!
//! Invariants & assumptions
//! ------------------------
//! - Days are independent; within a day, periods share the factor `b`.
//! - Shapes at the ceiling (`max_shape`) mean "no busyness" and are held
//!   fixed during likelihood fits.
//!
//! Testing notes
//! -------------
//! - Unit tests check moment recovery on large synthetic samples,
//!   likelihood derivatives against finite differences on fixed draws,
//!   and convergence of the rates when the likelihood is exact.
//! - `tests/estimation_pipeline.rs` covers the end-to-end scenarios.

pub mod data;
pub mod errors;
pub mod fit;
pub mod likelihood;
pub mod mle;
pub mod moments;
pub mod options;

pub use self::data::ArrivalCounts;
pub use self::errors::{EstimationError, EstimationResult};
pub use self::fit::GammaPoissonFit;
pub use self::likelihood::{GammaPoissonLikelihood, ShapeLayout};
pub use self::mle::{fit_gamma_poisson, maximum_likelihood, maximum_likelihood_spline};
pub use self::moments::method_of_moments;
pub use self::options::{DEFAULT_MAX_SHAPE, MleOptions, MmeOptions, SplineOptions};
