//! Negative-binomial marginal fits by bisection on the profile score.
//!
//! For a sample `x₁..xₙ` with mean `x̄`, the maximum-likelihood mean is
//! `x̄` and the shape `r` solves
//!
//! ```text
//! S(r) = Σᵢ [ψ(xᵢ + r) − ψ(r)] + n ln(r / (r + x̄)) = 0.
//! ```
//!
//! `S` is positive near 0 and, as `r → ∞`, behaves like
//! `n (x̄ − s²) / (2r²)` with `s²` the population variance. Over-dispersed
//! samples (`s² > x̄`) therefore have a finite root; under- or
//! equi-dispersed samples have none and get the Poisson sentinel
//! `shape = max_shape` with `degenerate = true`.
use std::collections::BTreeMap;

use tracing::warn;

use crate::{
    correlation::errors::{CorrelationError, CorrelationResult},
    optimization::numerical_stability::digamma_shift,
};

/// Bisection options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NegBinOptions {
    /// Shape reported for samples without over-dispersion.
    pub max_shape: f64,
    /// Relative width `hi/lo − 1` at which bisection stops.
    pub tol: f64,
    pub max_iter: usize,
}

impl Default for NegBinOptions {
    fn default() -> Self {
        Self { max_shape: 1e8, tol: 1e-10, max_iter: 200 }
    }
}

impl NegBinOptions {
    /// # Errors
    /// - [`CorrelationError::InvalidOption`] for non-positive values.
    pub fn new(max_shape: f64, tol: f64, max_iter: usize) -> CorrelationResult<Self> {
        if !(max_shape.is_finite() && max_shape > 0.0) {
            return Err(CorrelationError::InvalidOption {
                name: "max_shape",
                value: max_shape,
                reason: "Must be finite and strictly positive.",
            });
        }
        if !(tol.is_finite() && tol > 0.0) {
            return Err(CorrelationError::InvalidOption {
                name: "tol",
                value: tol,
                reason: "Must be finite and strictly positive.",
            });
        }
        if max_iter == 0 {
            return Err(CorrelationError::InvalidOption {
                name: "max_iter",
                value: 0.0,
                reason: "Must be at least 1.",
            });
        }
        Ok(Self { max_shape, tol, max_iter })
    }
}

/// Fitted negative-binomial marginal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NegBinFit {
    pub mean: f64,
    /// Shape `r`; variance is `mean + mean²/r`.
    pub shape: f64,
    /// Population variance of the sample.
    pub variance: f64,
    /// `true` when the sample shows no over-dispersion and `shape` is the
    /// Poisson sentinel.
    pub degenerate: bool,
}

/// Fit a negative binomial to one sample of counts.
///
/// # Errors
/// - [`CorrelationError::EmptySample`] for an empty slice.
pub fn fit_negative_binomial(sample: &[u64], opts: &NegBinOptions) -> CorrelationResult<NegBinFit> {
    if sample.is_empty() {
        return Err(CorrelationError::EmptySample { what: "negative binomial sample" });
    }
    let n = sample.len() as f64;
    let mean = sample.iter().map(|&x| x as f64).sum::<f64>() / n;
    let variance = sample.iter().map(|&x| (x as f64 - mean).powi(2)).sum::<f64>() / n;
    let sentinel = NegBinFit { mean, shape: opts.max_shape, variance, degenerate: true };
    if variance <= mean {
        if mean > 0.0 {
            warn!(mean, variance, "no over-dispersion; using the Poisson sentinel shape");
        }
        return Ok(sentinel);
    }

    let mut freq: BTreeMap<u64, f64> = BTreeMap::new();
    for &x in sample {
        *freq.entry(x).or_insert(0.0) += 1.0;
    }
    let score = |r: f64| -> f64 {
        freq.iter().map(|(&x, &w)| w * digamma_shift(r, x)).sum::<f64>() + n * (r / (r + mean)).ln()
    };

    let start = mean * mean / (variance - mean);
    let mut hi = start;
    while score(hi) > 0.0 {
        hi *= 2.0;
        if hi > opts.max_shape {
            warn!(mean, variance, "shape exceeds the ceiling; using the Poisson sentinel shape");
            return Ok(sentinel);
        }
    }
    let mut lo = start;
    while score(lo) <= 0.0 && lo > f64::MIN_POSITIVE {
        lo *= 0.5;
    }

    for _ in 0..opts.max_iter {
        if hi / lo - 1.0 <= opts.tol {
            break;
        }
        let mid = (lo * hi).sqrt();
        if score(mid) > 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(NegBinFit { mean, shape: (lo * hi).sqrt(), variance, degenerate: false })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{RandomStream, variates::negative_binomial};
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The Poisson sentinel for equi- and under-dispersed samples.
    // - The root property of the fitted shape.
    // - Recovery of the shape from simulated negative-binomial data.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Constant and zero samples are degenerate.
    fn underdispersed_samples_get_sentinel() {
        let opts = NegBinOptions::default();
        let fit = fit_negative_binomial(&[4, 4, 4, 4], &opts).unwrap();
        assert!(fit.degenerate);
        assert_eq!(fit.shape, opts.max_shape);
        assert_relative_eq!(fit.mean, 4.0);
        assert!(fit_negative_binomial(&[0, 0, 0], &opts).unwrap().degenerate);
        assert!(fit_negative_binomial(&[], &opts).is_err());
    }

    #[test]
    // Purpose
    // -------
    // The fitted shape is a root of the profile score.
    //
    // Given
    // -----
    // - A small over-dispersed sample.
    fn fitted_shape_zeroes_the_score() {
        // Arrange
        let sample = [0, 1, 9, 2, 14, 3, 0, 7];
        let n = sample.len() as f64;

        // Act
        let fit = fit_negative_binomial(&sample, &NegBinOptions::default()).unwrap();
        let score: f64 = sample.iter().map(|&x| digamma_shift(fit.shape, x)).sum::<f64>()
            + n * (fit.shape / (fit.shape + fit.mean)).ln();

        // Assert
        assert!(!fit.degenerate);
        assert!(score.abs() < 1e-6, "score = {score}");
    }

    #[test]
    // Purpose
    // -------
    // The shape of simulated NB(r = 3, μ = 12) data is recovered.
    fn recovers_simulated_shape() {
        let mut s = RandomStream::new(77);
        let sample: Vec<u64> = (0..20_000).map(|_| negative_binomial(&mut s, 3.0, 12.0).unwrap()).collect();
        let fit = fit_negative_binomial(&sample, &NegBinOptions::default()).unwrap();
        assert_relative_eq!(fit.mean, 12.0, max_relative = 0.03);
        assert_relative_eq!(fit.shape, 3.0, max_relative = 0.08);
    }

    #[test]
    // Purpose
    // -------
    // Options are validated.
    fn options_are_validated() {
        assert!(NegBinOptions::new(0.0, 1e-8, 10).is_err());
        assert!(NegBinOptions::new(1e6, -1.0, 10).is_err());
        assert!(NegBinOptions::new(1e6, 1e-8, 0).is_err());
        assert!(NegBinOptions::new(1e6, 1e-8, 10).is_ok());
    }
}
