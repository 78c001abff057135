//! mle — Monte-Carlo maximum likelihood for the Gamma-Poisson model.
//!
//! Purpose
//! -------
//! Refine method-of-moments estimates by maximizing the importance-sampled
//! likelihood of [`GammaPoissonLikelihood`] with the stochastic trust
//! region.
//!
//! Key behaviors
//! -------------
//! - [`maximum_likelihood`]: one shape `R` shared by all periods; started
//!   from the rates, the harmonic mean of the period shapes and `Q` of the
//!   start fit.
//! - [`maximum_likelihood_spline`]: one shape per period, with the
//!   objective `(1 − s)·ℓ − s·Σ (R_{p−1} − 2R_p + R_{p+1})²` pulling
//!   neighboring shapes toward a smooth profile.
//! - [`fit_gamma_poisson`]: method of moments followed by
//!   [`maximum_likelihood`].
//!
//! Conventions
//! -----------
//! - Both routines stop on the trust-region criterion: `max_iter`
//!   iterations, or an accepted step changing the objective by less than
//!   `tol`.
//! - Shapes at the ceiling are held fixed and reported as unbounded in the
//!   returned fit.
use tracing::{debug, warn};

use crate::{
    estimation::{
        data::ArrivalCounts,
        errors::{EstimationError, EstimationResult},
        fit::GammaPoissonFit,
        likelihood::{GammaPoissonLikelihood, ShapeLayout},
        moments::method_of_moments,
        options::{MleOptions, MmeOptions, SplineOptions},
    },
    optimization::{
        errors::OptResult,
        loglik_optimizer::Theta,
        trust_region::{StochasticEvaluation, StochasticObjective, TrustRegionOutcome, maximize_stochastic},
    },
    random::RandomStream,
};

/// Maximum likelihood with a common period shape.
///
/// # Errors
/// - Invalid options.
/// - [`EstimationError::LengthMismatch`] if `start` does not have one rate
///   per column of `counts`.
/// - [`EstimationError::InvalidStart`] for negative or non-finite start
///   values.
/// - Optimization errors.
pub fn maximum_likelihood(counts: &ArrivalCounts, start: &GammaPoissonFit, opts: &MleOptions) -> EstimationResult<GammaPoissonFit> {
    opts.validate()?;
    check_start(counts, start)?;
    let shape = common_shape(start, opts.max_shape);
    let theta0 = build_theta(start, &[shape], opts.max_shape);

    let mut likelihood = GammaPoissonLikelihood::new(counts, ShapeLayout::Common, &theta0, opts.n_samples, opts.max_shape)?;
    let outcome = maximize_stochastic(&mut likelihood, theta0, &opts.trust_region)?;
    Ok(finish(outcome, counts.n_periods(), ShapeLayout::Common, opts.max_shape))
}

/// Maximum likelihood with per-period shapes and a second-difference
/// smoothing penalty.
///
/// # Errors
/// - As [`maximum_likelihood`].
pub fn maximum_likelihood_spline(
    counts: &ArrivalCounts, start: &GammaPoissonFit, opts: &MleOptions, spline: &SplineOptions,
) -> EstimationResult<GammaPoissonFit> {
    opts.validate()?;
    let spline = SplineOptions::new(spline.smoothing)?;
    check_start(counts, start)?;
    let shapes: Vec<f64> = start
        .period_shapes
        .iter()
        .zip(&start.unbounded_periods)
        .map(|(&r, &unbounded)| if unbounded { opts.max_shape } else { r.min(opts.max_shape) })
        .collect();
    let theta0 = build_theta(start, &shapes, opts.max_shape);

    let inner = GammaPoissonLikelihood::new(counts, ShapeLayout::PerPeriod, &theta0, opts.n_samples, opts.max_shape)?;
    let mut objective = SmoothedShapes { inner, n_periods: counts.n_periods(), smoothing: spline.smoothing };
    let outcome = maximize_stochastic(&mut objective, theta0, &opts.trust_region)?;
    Ok(finish(outcome, counts.n_periods(), ShapeLayout::PerPeriod, opts.max_shape))
}

/// Method of moments, then maximum likelihood from its estimates.
///
/// # Errors
/// - Errors of [`method_of_moments`] and [`maximum_likelihood`].
pub fn fit_gamma_poisson(counts: &ArrivalCounts, mme: &MmeOptions, mle: &MleOptions) -> EstimationResult<GammaPoissonFit> {
    let start = method_of_moments(counts, mme)?;
    maximum_likelihood(counts, &start, mle)
}

fn check_start(counts: &ArrivalCounts, start: &GammaPoissonFit) -> EstimationResult<()> {
    let n_periods = counts.n_periods();
    if start.rates.len() != n_periods {
        return Err(EstimationError::LengthMismatch { what: "start rates", expected: n_periods, found: start.rates.len() });
    }
    if start.period_shapes.len() != n_periods || start.unbounded_periods.len() != n_periods {
        return Err(EstimationError::LengthMismatch {
            what: "start shapes",
            expected: n_periods,
            found: start.period_shapes.len(),
        });
    }
    Ok(())
}

/// Harmonic mean of the bounded period shapes; ceiling shapes count as
/// infinite.
fn common_shape(start: &GammaPoissonFit, max_shape: f64) -> f64 {
    let inv_sum: f64 = start
        .period_shapes
        .iter()
        .zip(&start.unbounded_periods)
        .filter(|&(_, &unbounded)| !unbounded)
        .map(|(&r, _)| 1.0 / r)
        .sum();
    let inv_mean = inv_sum / start.period_shapes.len() as f64;
    if inv_mean <= 1.0 / max_shape { max_shape } else { 1.0 / inv_mean }
}

fn build_theta(start: &GammaPoissonFit, shapes: &[f64], max_shape: f64) -> Theta {
    let daily = if start.daily_unbounded { max_shape } else { start.daily_shape.min(max_shape) };
    start.rates.iter().chain(shapes).copied().chain(std::iter::once(daily)).collect()
}

fn finish(outcome: TrustRegionOutcome, n_periods: usize, layout: ShapeLayout, max_shape: f64) -> GammaPoissonFit {
    if !outcome.converged() {
        warn!(iterations = outcome.iterations, "gamma-Poisson likelihood: iteration budget exhausted");
    }
    let theta = &outcome.theta_hat;
    let rates = theta.iter().take(n_periods).copied().collect();
    let shapes: Vec<f64> = match layout {
        ShapeLayout::Common => vec![theta[n_periods]; n_periods],
        ShapeLayout::PerPeriod => theta.iter().skip(n_periods).take(n_periods).copied().collect(),
    };
    let daily_shape = theta[theta.len() - 1];
    let unbounded_periods = shapes.iter().map(|&r| r >= max_shape).collect();
    debug!(
        value = outcome.value,
        iterations = outcome.iterations,
        accepted = outcome.accepted_steps,
        daily_shape,
        "gamma-Poisson likelihood fit done"
    );
    GammaPoissonFit {
        rates,
        period_shapes: shapes,
        daily_shape,
        daily_unbounded: daily_shape >= max_shape,
        unbounded_periods,
        log_likelihood: Some(outcome.value),
        outcome: Some(outcome),
    }
}

/// Per-period-shape likelihood blended with a second-difference penalty.
struct SmoothedShapes<'a> {
    inner: GammaPoissonLikelihood<'a>,
    n_periods: usize,
    smoothing: f64,
}

impl SmoothedShapes<'_> {
    /// Second differences `R_{p−1} − 2R_p + R_{p+1}` for interior `p`.
    fn second_differences(&self, theta: &Theta) -> Vec<f64> {
        let shapes = theta.slice(ndarray::s![self.n_periods..2 * self.n_periods]);
        shapes.windows(3).into_iter().map(|w| w[0] - 2.0 * w[1] + w[2]).collect()
    }

    fn penalty(&self, theta: &Theta) -> f64 {
        self.second_differences(theta).iter().map(|d| d * d).sum()
    }
}

impl StochasticObjective for SmoothedShapes<'_> {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn group_count(&self) -> usize {
        self.inner.group_count()
    }

    fn group_of(&self, index: usize) -> Option<usize> {
        self.inner.group_of(index)
    }

    fn upper_bound(&self, index: usize) -> f64 {
        self.inner.upper_bound(index)
    }

    fn evaluate(&mut self, theta: &Theta, stream: &mut RandomStream) -> OptResult<StochasticEvaluation> {
        let s = self.smoothing;
        let eval = self.inner.evaluate(theta, stream)?;
        let mut grad = eval.grad * (1.0 - s);
        let mut hess = eval.hess_diag * (1.0 - s);
        let base = self.n_periods;
        for (j, d) in self.second_differences(theta).into_iter().enumerate() {
            for (offset, (dg, dh)) in [(2.0, 2.0), (-4.0, 8.0), (2.0, 2.0)].into_iter().enumerate() {
                let k = base + j + offset;
                grad[k] -= s * dg * d;
                hess[k] -= s * dh;
            }
        }
        for k in (0..self.dim()).filter(|&k| self.group_of(k).is_none()) {
            grad[k] = 0.0;
            hess[k] = 0.0;
        }
        Ok(StochasticEvaluation { value: (1.0 - s) * eval.value - s * self.penalty(theta), grad, hess_diag: hess })
    }

    fn value_on_last_draws(&self, theta: &Theta) -> OptResult<f64> {
        let s = self.smoothing;
        Ok((1.0 - s) * self.inner.value_on_last_draws(theta)? - s * self.penalty(theta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::trust_region::TrustRegionOptions;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Convergence of the rates when every shape sits at the ceiling (the
    //   likelihood is then an exact Poisson product).
    // - The smoothing penalty and its derivatives on fixed draws.
    // - Start validation and the MME → MLE pipeline on a small sample.
    // -------------------------------------------------------------------------

    fn rows() -> Vec<Vec<u64>> {
        vec![
            vec![9, 22, 14],
            vec![12, 18, 17],
            vec![8, 25, 11],
            vec![11, 19, 15],
            vec![10, 16, 13],
            vec![13, 20, 18],
            vec![7, 21, 12],
            vec![10, 19, 16],
        ]
    }

    fn poisson_start(rates: Vec<f64>) -> GammaPoissonFit {
        let n = rates.len();
        GammaPoissonFit {
            rates,
            period_shapes: vec![1e4; n],
            daily_shape: 1e4,
            daily_unbounded: true,
            unbounded_periods: vec![true; n],
            log_likelihood: None,
            outcome: None,
        }
    }

    #[test]
    // Purpose
    // -------
    // With all shapes frozen the rates climb to the sample means.
    //
    // Given
    // -----
    // - Start rates 20% below the sample means.
    //
    // Expect
    // ------
    // - Rates within 0.1 of the means; shapes still flagged unbounded.
    fn rates_reach_sample_means_when_shapes_are_frozen() {
        let data = ArrivalCounts::from_rows(&rows()).unwrap();
        let means = data.means();
        let start = poisson_start(means.iter().map(|m| 0.8 * m).collect());
        let fit = maximum_likelihood(&data, &start, &MleOptions::default()).unwrap();

        for p in 0..3 {
            assert!((fit.rates[p] - means[p]).abs() < 0.1, "period {p}: {} vs {}", fit.rates[p], means[p]);
        }
        assert!(fit.daily_unbounded);
        assert!(fit.unbounded_periods.iter().all(|&u| u));
        assert!(fit.log_likelihood.is_some_and(f64::is_finite));
    }

    #[test]
    // Purpose
    // -------
    // With s = 0 the smoothed objective is the likelihood; with s > 0 the
    // penalty gradient matches finite differences on fixed draws.
    fn smoothing_penalty_and_gradient() {
        let data = ArrivalCounts::from_rows(&rows()).unwrap();
        let theta = array![10.0, 20.0, 14.0, 5.0, 9.0, 6.0, 1e4];
        let inner = GammaPoissonLikelihood::new(&data, ShapeLayout::PerPeriod, &theta, 1, 1e4).unwrap();
        let mut plain = SmoothedShapes { inner: inner.clone(), n_periods: 3, smoothing: 0.0 };
        let mut smooth = SmoothedShapes { inner, n_periods: 3, smoothing: 0.4 };
        let mut stream = RandomStream::new(3);
        let e0 = plain.evaluate(&theta, &mut stream).unwrap();
        let e1 = smooth.evaluate(&theta, &mut stream).unwrap();

        // 5 − 18 + 6 = −7.
        assert_relative_eq!(smooth.penalty(&theta), 49.0);
        assert_relative_eq!(e1.value, 0.6 * e0.value - 0.4 * 49.0, epsilon = 1e-9);
        for j in 3..6 {
            let h = 1e-5;
            let mut up = theta.clone();
            let mut down = theta.clone();
            up[j] += h;
            down[j] -= h;
            let fd = (smooth.value_on_last_draws(&up).unwrap() - smooth.value_on_last_draws(&down).unwrap()) / (2.0 * h);
            assert_relative_eq!(e1.grad[j], fd, epsilon = 1e-5, max_relative = 1e-4);
        }
    }

    #[test]
    // Purpose
    // -------
    // A start fit of the wrong width is rejected.
    fn rejects_mismatched_start() {
        let data = ArrivalCounts::from_rows(&rows()).unwrap();
        let start = poisson_start(vec![10.0, 20.0]);
        assert!(matches!(
            maximum_likelihood(&data, &start, &MleOptions::default()),
            Err(EstimationError::LengthMismatch { expected: 3, found: 2, .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // The MME → MLE pipeline and the spline variant run to a finite
    // fit with diagnostics attached.
    fn pipeline_returns_finite_fit() {
        let data = ArrivalCounts::from_rows(&rows()).unwrap();
        let tr = TrustRegionOptions { max_iter: 15, ..TrustRegionOptions::default() };
        let opts = MleOptions { trust_region: tr, n_samples: 40, ..MleOptions::default() };
        let fit = fit_gamma_poisson(&data, &MmeOptions::default(), &opts).unwrap();
        assert_eq!(fit.n_periods(), 3);
        assert!(fit.rates.iter().all(|r| r.is_finite() && *r > 0.0));
        assert!(fit.outcome.as_ref().is_some_and(|o| o.iterations >= 1));
        assert!(fit.period_shapes.windows(2).all(|w| w[0] == w[1]));

        let start = method_of_moments(&data, &MmeOptions::default()).unwrap();
        let spline = maximum_likelihood_spline(&data, &start, &opts, &SplineOptions::default()).unwrap();
        assert!(spline.log_likelihood.is_some_and(f64::is_finite));
        assert!(spline.period_shapes.iter().all(|r| *r > 0.0 && *r <= 1e4));
    }
}
