//! Method-of-moments estimator for the doubly-stochastic Gamma-Poisson model.
//!
//! Matches sample moments of the counts to
//!
//! - `E[X_p] = λ_p`
//! - `Cov[X_p, X_q] = λ_p λ_q / Q` for `p ≠ q`
//! - `Var[X_p] = λ_p + λ_p² ((1 + 1/Q)(1 + 1/R_p) − 1)`
//!
//! With two or more periods, `1/Q` is the mean of the normalized
//! off-diagonal covariances. With a single period the day and period
//! factors cannot be separated and all over-dispersion is attributed to
//! the day factor. Inverse shapes that come out non-positive map to the
//! ceiling and are flagged.
use tracing::{debug, warn};

use crate::estimation::{
    data::ArrivalCounts,
    errors::EstimationResult,
    fit::GammaPoissonFit,
    options::MmeOptions,
};

/// Closed-form moment estimates.
///
/// # Errors
/// - Invalid options.
pub fn method_of_moments(counts: &ArrivalCounts, opts: &MmeOptions) -> EstimationResult<GammaPoissonFit> {
    opts.validate()?;
    let n_periods = counts.n_periods();
    let rates = counts.means().to_vec();
    let cov = counts.covariance();
    let floor = 1.0 / opts.max_shape;

    let inv_daily = if n_periods == 1 {
        single_period_dispersion(rates[0], cov[(0, 0)], counts.n_obs(), opts.dispersion_z)
    } else {
        let mut sum = 0.0;
        let mut pairs = 0usize;
        for p in 0..n_periods {
            for q in (p + 1)..n_periods {
                let scale = rates[p] * rates[q];
                if scale > 0.0 {
                    sum += cov[(p, q)] / scale;
                    pairs += 1;
                }
            }
        }
        if pairs == 0 { 0.0 } else { sum / pairs as f64 }
    };
    let daily_unbounded = inv_daily <= floor;
    let inv_daily = if daily_unbounded { 0.0 } else { inv_daily };
    if daily_unbounded {
        warn!(inv_daily, "no measurable day-level over-dispersion; daily shape set to the ceiling");
    }

    let mut inv_shapes: Vec<f64> = (0..n_periods)
        .map(|p| {
            let lambda = rates[p];
            if n_periods == 1 || lambda <= 0.0 {
                return 0.0;
            }
            let ratio = ((cov[(p, p)] - lambda) / (lambda * lambda) + 1.0) / (1.0 + inv_daily);
            (ratio - 1.0).max(0.0)
        })
        .collect();
    if opts.smoothing_window > 1 {
        inv_shapes = centered_average(&inv_shapes, opts.smoothing_window);
    }

    let unbounded_periods: Vec<bool> = inv_shapes.iter().map(|&v| v <= floor).collect();
    let period_shapes = inv_shapes
        .iter()
        .zip(&unbounded_periods)
        .map(|(&v, &unbounded)| if unbounded { opts.max_shape } else { 1.0 / v })
        .collect();
    let daily_shape = if daily_unbounded { opts.max_shape } else { 1.0 / inv_daily };
    debug!(periods = n_periods, daily_shape, "method of moments done");

    Ok(GammaPoissonFit {
        rates,
        period_shapes,
        daily_shape,
        daily_unbounded,
        unbounded_periods,
        log_likelihood: None,
        outcome: None,
    })
}

/// `(Var − λ)/λ²`, or 0 when the excess variance is not significant at
/// `z` standard errors of the sample variance under a Poisson model.
fn single_period_dispersion(lambda: f64, var: f64, n_obs: usize, z: f64) -> f64 {
    if lambda <= 0.0 {
        return 0.0;
    }
    let se = ((lambda + 2.0 * lambda * lambda) / n_obs as f64).sqrt();
    if var - lambda <= z * se {
        return 0.0;
    }
    (var - lambda) / (lambda * lambda)
}

/// Centered moving average; windows are truncated at the edges.
fn centered_average(values: &[f64], window: usize) -> Vec<f64> {
    let half = window / 2;
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(values.len());
            values[lo..hi].iter().sum::<f64>() / (hi - lo) as f64
        })
        .collect()
}
