//! rates — latent rate-vector models for piecewise-constant Poisson arrivals.
//!
//! Purpose
//! -------
//! A [`RateModel`] draws, once per replication, the base rate `λ̃_p` of
//! every period. The piecewise-constant arrival model multiplies the draw
//! by the replication's busyness, so the active exponential rate in period
//! `p` is `λ̃_p · B · B_p`.
//!
//! Key behaviors
//! -------------
//! - [`FixedRates`]: deterministic rates over all `P + 2` periods,
//!   optionally normalized by period duration.
//! - [`PoissonGammaRates`]: `λ_p · Gamma(α_p, α_p)` independently per main
//!   period.
//! - [`PoissonGammaNortaRates`]: the same gamma marginals made dependent
//!   through a Gaussian copula ([`NortaCopula`]).
//!
//! Invariants & assumptions
//! ------------------------
//! - `draw` returns exactly `period_count()` non-negative, finite values.
//! - Randomized models are parameterized over the `P` main periods only;
//!   the preliminary (index 0) and wrap-up (index `P + 1`) rates are 0.
//! - `α_p = 0` or `λ_p = 0` yields an exact 0 rate; `α_p = +∞` removes the
//!   gamma noise of that period.
//!
//! Testing notes
//! -------------
//! - Unit tests check moment sanity of the draws, the zero conventions and
//!   validation; the correlation of NORTA draws is checked on a two-period
//!   copula.

pub mod fixed;
pub mod norta;
pub mod poisson_gamma;

pub use self::fixed::FixedRates;
pub use self::norta::{NortaCopula, PoissonGammaNortaRates};
pub use self::poisson_gamma::PoissonGammaRates;

use crate::{
    arrivals::errors::{ArrivalError, ArrivalResult},
    random::RandomStream,
};

/// Per-replication base-rate generator.
pub trait RateModel {
    /// Short label used in error messages and logs.
    fn name(&self) -> &'static str;

    /// Number of periods covered, preliminary and wrap-up included.
    fn period_count(&self) -> usize;

    /// Draw the base rates of a new replication.
    fn draw(&mut self, stream: &mut RandomStream) -> ArrivalResult<Vec<f64>>;

    /// `E[λ̃_p]`.
    fn expected_rate(&self, p: usize) -> f64;
}

/// Pad main-period values with zero preliminary and wrap-up entries.
pub(crate) fn embed_main(main: &[f64]) -> Vec<f64> {
    let mut full = Vec::with_capacity(main.len() + 2);
    full.push(0.0);
    full.extend_from_slice(main);
    full.push(0.0);
    full
}

/// Validate `P` main-period means and gamma shapes.
pub(crate) fn verify_means_and_shapes(means: &[f64], shapes: &[f64]) -> ArrivalResult<()> {
    if means.is_empty() {
        return Err(ArrivalError::LengthMismatch { what: "main-period rates", expected: 1, found: 0 });
    }
    if shapes.len() != means.len() {
        return Err(ArrivalError::LengthMismatch {
            what: "gamma shapes",
            expected: means.len(),
            found: shapes.len(),
        });
    }
    for (p, &m) in means.iter().enumerate() {
        verify_rate(p + 1, m)?;
    }
    for (index, &a) in shapes.iter().enumerate() {
        if a.is_nan() || a < 0.0 {
            return Err(ArrivalError::InvalidShape {
                index,
                value: a,
                reason: "Gamma shapes must be non-negative (0 disables the period, +inf removes noise).",
            });
        }
    }
    Ok(())
}

pub(crate) fn verify_rate(period: usize, value: f64) -> ArrivalResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ArrivalError::InvalidRate {
            period,
            value,
            reason: "Rates must be finite and non-negative.",
        });
    }
    Ok(())
}
