//! Configuration of the stochastic trust-region ascent.
use crate::optimization::{
    errors::{OptError, OptResult},
    stochastic_approx::AnnealingGain,
};

/// Trust-region settings.
///
/// Fields:
/// - `max_iter`: iteration budget.
/// - `tol`: an accepted step changing the objective by less than this stops
///   the ascent.
/// - `gain`: Robbins–Monro damping `η · k^(−pwr)`.
/// - `c0`, `c1`: quality thresholds (`0 < c0 < c1`); a step is committed
///   only when `ρ > c0`.
/// - `g0`, `g1`: regulator shrink/grow factors (`0 < g0 < 1 < g1`).
/// - `initial_step`, `min_step`, `max_step`: regulator start value and
///   bounds (`0 < min_step ≤ initial_step ≤ max_step ≤ 1`).
/// - `seed`: seed of the stream used for the Monte-Carlo draws.
///
/// Default: 100 iterations, `tol = 1e-6`, `η = 0.5`, `pwr = 0.6`,
/// `c0 = 0.25`, `c1 = 0.75`, `g0 = 0.5`, `g1 = 2.0`, regulators start at 1
/// within `[1e-4, 1]`, seed 12345.
#[derive(Debug, Clone, PartialEq)]
pub struct TrustRegionOptions {
    pub max_iter: usize,
    pub tol: f64,
    pub gain: AnnealingGain,
    pub c0: f64,
    pub c1: f64,
    pub g0: f64,
    pub g1: f64,
    pub initial_step: f64,
    pub min_step: f64,
    pub max_step: f64,
    pub seed: u64,
}

impl Default for TrustRegionOptions {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tol: 1e-6,
            gain: AnnealingGain::default(),
            c0: 0.25,
            c1: 0.75,
            g0: 0.5,
            g1: 2.0,
            initial_step: 1.0,
            min_step: 1e-4,
            max_step: 1.0,
            seed: 12345,
        }
    }
}

impl TrustRegionOptions {
    /// Check the documented relations between fields.
    ///
    /// # Errors
    /// - [`OptError::InvalidMaxIter`] for a zero budget.
    /// - [`OptError::InvalidTrustRegionOption`] naming the first violated
    ///   field.
    pub fn validate(&self) -> OptResult<()> {
        if self.max_iter == 0 {
            return Err(OptError::InvalidMaxIter {
                max_iter: 0,
                reason: "Maximum iterations must be greater than zero.",
            });
        }
        AnnealingGain::new(self.gain.eta, self.gain.pwr)?;
        check("tol", self.tol, self.tol.is_finite() && self.tol > 0.0, "Must be finite and > 0.")?;
        check("c0", self.c0, self.c0 > 0.0 && self.c0 < self.c1, "Must satisfy 0 < c0 < c1.")?;
        check("c1", self.c1, self.c1.is_finite(), "Must be finite.")?;
        check("g0", self.g0, self.g0 > 0.0 && self.g0 < 1.0, "Must lie in (0, 1).")?;
        check("g1", self.g1, self.g1 > 1.0 && self.g1.is_finite(), "Must be finite and > 1.")?;
        check(
            "min_step",
            self.min_step,
            self.min_step > 0.0 && self.min_step <= self.initial_step,
            "Must satisfy 0 < min_step <= initial_step.",
        )?;
        check(
            "max_step",
            self.max_step,
            self.max_step >= self.initial_step && self.max_step <= 1.0,
            "Must satisfy initial_step <= max_step <= 1.",
        )?;
        Ok(())
    }
}

fn check(name: &'static str, value: f64, ok: bool, reason: &'static str) -> OptResult<()> {
    if ok { Ok(()) } else { Err(OptError::InvalidTrustRegionOption { name, value, reason }) }
}
