//! Parametric lag-correlation fits: Markov `ρ_j = b^j` and general linear
//! `ρ_j = a·b^j + c`.
//!
//! Every off-diagonal entry `ρ_pq` is a data point at lag `j = |p − q|`.
//! The fits minimize the sum of squared residuals by grid search over
//! `b ∈ [−1 + δ, 1 − δ]`; for the linear model `(a, c)` are the closed-form
//! least-squares coefficients of the regression of `ρ` on `x = b^j` at each
//! grid point, with `a = 0`, `c = mean(ρ)` when `x` has no variation.
use ndarray::Array2;

use crate::correlation::errors::{CorrelationError, CorrelationResult};

/// Grid options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParametricFitOptions {
    /// Distance `δ` of the grid ends from ±1.
    pub delta: f64,
    pub grid_points: usize,
}

impl Default for ParametricFitOptions {
    fn default() -> Self {
        Self { delta: 1e-3, grid_points: 2001 }
    }
}

impl ParametricFitOptions {
    /// # Errors
    /// - [`CorrelationError::InvalidOption`] unless `0 < δ < 1` and at
    ///   least two grid points are requested.
    pub fn new(delta: f64, grid_points: usize) -> CorrelationResult<Self> {
        let opts = Self { delta, grid_points };
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> CorrelationResult<()> {
        if !(self.delta > 0.0 && self.delta < 1.0) {
            return Err(CorrelationError::InvalidOption {
                name: "delta",
                value: self.delta,
                reason: "Must lie strictly between 0 and 1.",
            });
        }
        if self.grid_points < 2 {
            return Err(CorrelationError::InvalidOption {
                name: "grid_points",
                value: self.grid_points as f64,
                reason: "At least two grid points are required.",
            });
        }
        Ok(())
    }

    fn grid(&self) -> impl Iterator<Item = f64> + '_ {
        let lo = -1.0 + self.delta;
        let step = 2.0 * (1.0 - self.delta) / (self.grid_points - 1) as f64;
        (0..self.grid_points).map(move |k| lo + step * k as f64)
    }
}

/// Which parametric family was fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParametricKind {
    Markov,
    Linear,
}

/// Fitted lag-correlation model `ρ_j = a·b^j + c`
/// (`a = 1`, `c = 0` for Markov).
#[derive(Debug, Clone, PartialEq)]
pub struct ParametricFit {
    pub kind: ParametricKind,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    /// Sum of squared residuals over the off-diagonal entries.
    pub sse: f64,
}

impl ParametricFit {
    /// Model correlation at lag `j` (1 at lag 0).
    pub fn at_lag(&self, j: usize) -> f64 {
        if j == 0 {
            return 1.0;
        }
        self.a * self.b.powi(j as i32) + self.c
    }

    /// Full `n × n` model matrix with unit diagonal.
    pub fn matrix(&self, n: usize) -> Array2<f64> {
        Array2::from_shape_fn((n, n), |(i, j)| self.at_lag(i.abs_diff(j)))
    }
}

/// Fit `ρ_j = b^j`.
pub fn fit_markov(correlation: &Array2<f64>, opts: &ParametricFitOptions) -> CorrelationResult<ParametricFit> {
    opts.validate()?;
    let points = lag_points(correlation)?;
    let mut best = ParametricFit { kind: ParametricKind::Markov, a: 1.0, b: 0.0, c: 0.0, sse: f64::INFINITY };
    for b in opts.grid() {
        let sse: f64 = points.iter().map(|&(j, r)| (r - b.powi(j)).powi(2)).sum();
        if sse < best.sse {
            best.b = b;
            best.sse = sse;
        }
    }
    Ok(best)
}

/// Fit `ρ_j = a·b^j + c`.
pub fn fit_linear(correlation: &Array2<f64>, opts: &ParametricFitOptions) -> CorrelationResult<ParametricFit> {
    opts.validate()?;
    let points = lag_points(correlation)?;
    let n = points.len() as f64;
    let r_mean = points.iter().map(|&(_, r)| r).sum::<f64>() / n;
    let mut best = ParametricFit { kind: ParametricKind::Linear, a: 0.0, b: 0.0, c: r_mean, sse: f64::INFINITY };
    for b in opts.grid() {
        let xs: Vec<f64> = points.iter().map(|&(j, _)| b.powi(j)).collect();
        let x_mean = xs.iter().sum::<f64>() / n;
        let sxx: f64 = xs.iter().map(|x| (x - x_mean).powi(2)).sum();
        let (a, c) = if sxx <= f64::EPSILON * n {
            (0.0, r_mean)
        } else {
            let sxy: f64 = xs.iter().zip(&points).map(|(x, &(_, r))| (x - x_mean) * (r - r_mean)).sum();
            let a = sxy / sxx;
            (a, r_mean - a * x_mean)
        };
        let sse: f64 = xs.iter().zip(&points).map(|(x, &(_, r))| (r - a * x - c).powi(2)).sum();
        if sse < best.sse {
            best = ParametricFit { kind: ParametricKind::Linear, a, b, c, sse };
        }
    }
    Ok(best)
}

fn lag_points(correlation: &Array2<f64>) -> CorrelationResult<Vec<(i32, f64)>> {
    let (n, m) = correlation.dim();
    if n != m {
        return Err(CorrelationError::InvalidMatrix { reason: "Matrix must be square." });
    }
    if n < 2 {
        return Err(CorrelationError::InvalidMatrix { reason: "At least two periods are required." });
    }
    let mut points = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in 0..i {
            let r = correlation[[i, j]];
            if !r.is_finite() {
                return Err(CorrelationError::InvalidMatrix { reason: "Entries must be finite." });
            }
            points.push(((i - j) as i32, r));
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Exact recovery on noiseless model matrices, the no-variation
    // fallback of the linear fit, and input validation.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // A Markov matrix with b = 0.7 is recovered to grid resolution.
    fn markov_fit_recovers_decay() {
        let truth = ParametricFit { kind: ParametricKind::Markov, a: 1.0, b: 0.7, c: 0.0, sse: 0.0 };
        let fit = fit_markov(&truth.matrix(6), &ParametricFitOptions::default()).unwrap();
        assert_relative_eq!(fit.b, 0.7, epsilon = 1e-3);
        assert!(fit.sse < 1e-5);
        assert_eq!(fit.at_lag(0), 1.0);
    }

    #[test]
    // Purpose
    // -------
    // The linear fit recovers (a, b, c) of a noiseless matrix.
    //
    // Given
    // -----
    // - ρ_j = 0.5 · 0.6^j + 0.2 over five periods.
    fn linear_fit_recovers_parameters() {
        let truth = ParametricFit { kind: ParametricKind::Linear, a: 0.5, b: 0.6, c: 0.2, sse: 0.0 };
        let fit = fit_linear(&truth.matrix(5), &ParametricFitOptions::default()).unwrap();
        assert_relative_eq!(fit.b, 0.6, epsilon = 2e-3);
        assert_relative_eq!(fit.a, 0.5, epsilon = 1e-2);
        assert_relative_eq!(fit.c, 0.2, epsilon = 1e-2);
        assert!(fit.sse < 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // With two periods there is a single lag, x never varies, and the
    // linear fit reduces to a = 0, c = ρ.
    fn single_lag_uses_mean_fallback() {
        let m = ndarray::array![[1.0, 0.35], [0.35, 1.0]];
        let fit = fit_linear(&m, &ParametricFitOptions::default()).unwrap();
        assert_eq!(fit.a, 0.0);
        assert_relative_eq!(fit.c, 0.35);
        assert!(fit_markov(&ndarray::array![[1.0]], &ParametricFitOptions::default()).is_err());
        assert!(ParametricFitOptions::new(0.0, 10).is_err());
        assert!(ParametricFitOptions::new(0.1, 1).is_err());
    }
}
