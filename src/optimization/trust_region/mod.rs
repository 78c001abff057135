//! trust_region — stochastic trust-region ascent for Monte-Carlo objectives.
//!
//! Purpose
//! -------
//! Maximize an objective whose value, gradient and diagonal Hessian are
//! estimated from random draws. Plain Newton steps are unreliable under
//! such noise and when parameter groups live on very different scales, so
//! the ascent keeps one step regulator per parameter group and judges every
//! proposal on the *same* draws that produced its derivatives.
//!
//! Key behaviors
//! -------------
//! - Per-component Newton-like step `a_k · δ_g · g_i / |h_i|`, where `a_k`
//!   is the Robbins–Monro gain and `δ_g` the regulator of the component's
//!   group.
//! - Quality ratio `ρ = actual / predicted` computed globally and per
//!   group on reused draws ([`StochasticObjective::value_on_last_draws`]).
//! - Regulators grow by `g1` above `c1`, shrink by `g0` below `c0`, and are
//!   bounded to `[min_step, max_step]`.
//! - A step is committed only when the global ratio exceeds `c0`.
//! - Non-positive or non-finite proposed components are rejected in place;
//!   components above their upper bound are clamped to it.
//!
//! Invariants & assumptions
//! ------------------------
//! - Every admissible parameter is strictly positive (shapes and rates).
//! - `evaluate` refreshes the draws; `value_on_last_draws` must not.
//! - Components whose group is `None` never move.
//!
//! Conventions
//! -----------
//! - Maximization throughout; "objective" means log-likelihood (possibly
//!   penalized).
//! - Termination: `max_iter` iterations, or an accepted step whose
//!   objective change is below `tol`, or no admissible step.
//!
//! Testing notes
//! -------------
//! - Unit tests run the ascent on a noisy separable quadratic and check
//!   convergence, frozen components, clamping, and that every accepted step
//!   improves the objective on its own draws.

pub mod objective;
pub mod options;
pub mod solver;

pub use self::objective::{StochasticEvaluation, StochasticObjective};
pub use self::options::TrustRegionOptions;
pub use self::solver::{StopReason, TraceEntry, TrustRegionOutcome, maximize_stochastic};
