//! Dirichlet-split counts and their Dirichlet-multinomial fit.
//!
//! Both models share the parameters `(a, α)`: the expected daily total `a`
//! and the concentration vector `α` over main periods. They differ only in
//! how the total is turned into counts:
//!
//! - [`DirichletCounts`]: `count_p = round(q_p · a · B)`.
//! - [`DirichletCompoundCounts`]: `counts ~ Multinomial(round(a · B), q)`.
//!
//! [`fit_dirichlet_multinomial`] estimates `α` by exact
//! Dirichlet-multinomial maximum likelihood on historical counts with the
//! L-BFGS stack, optimizing `θ_p = softplus⁻¹(α_p)`; `a` is the mean daily
//! total.
use ndarray::{Array1, Array2};
use statrs::function::gamma::{digamma, ln_gamma};
use tracing::{debug, warn};

use crate::{
    arrivals::{
        core::busyness::{BusynessModel, BusynessState},
        counts::{CountModel, embed_main_counts},
        errors::{ArrivalError, ArrivalResult},
    },
    optimization::{
        errors::{OptError, OptResult},
        loglik_optimizer::{Grad, LbfgsOptions, LogLikelihood, OptimOutcome, Theta, maximize},
        numerical_stability::{safe_logistic, safe_softplus, safe_softplus_inv},
    },
    random::{
        RandomStream,
        variates::{dirichlet, multinomial},
    },
};

/// Bounds on the moment-based starting precision `Σα`.
const MIN_START_PRECISION: f64 = 1e-2;
const MAX_START_PRECISION: f64 = 1e4;

/// Rounded Dirichlet split of a busyness-scaled total.
#[derive(Debug, Clone, PartialEq)]
pub struct DirichletCounts {
    total: f64,
    alpha: Vec<f64>,
}

impl DirichletCounts {
    /// # Errors
    /// - [`ArrivalError::InvalidParameter`] for an invalid total.
    /// - [`ArrivalError::InvalidShape`] for invalid concentrations or when
    ///   none is positive.
    pub fn new(total: f64, alpha: Vec<f64>) -> ArrivalResult<Self> {
        verify_dirichlet(total, &alpha)?;
        Ok(Self { total, alpha })
    }

    /// Fit `(a, α)` from historical counts (observations × main periods).
    pub fn from_counts(counts: &Array2<u64>, opts: &LbfgsOptions) -> ArrivalResult<Self> {
        let fit = fit_dirichlet_multinomial(counts, opts)?;
        Self::new(fit.total, fit.alpha)
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }
}

impl CountModel for DirichletCounts {
    fn name(&self) -> &'static str {
        "dirichlet counts"
    }

    fn period_count(&self) -> usize {
        self.alpha.len() + 2
    }

    fn draw_counts(&mut self, busyness: &BusynessState, stream: &mut RandomStream) -> ArrivalResult<Vec<u64>> {
        let total = self.total * busyness.day_factor();
        let q = dirichlet(stream, &self.alpha)?;
        let main: Vec<u64> = q.iter().map(|&qp| (qp * total).round() as u64).collect();
        Ok(embed_main_counts(&main))
    }

    fn expected_count(&self, busyness: &BusynessModel, p: usize) -> f64 {
        expected_split(self.total, &self.alpha, busyness, p)
    }
}

/// Multinomial split of a rounded busyness-scaled total.
#[derive(Debug, Clone, PartialEq)]
pub struct DirichletCompoundCounts {
    total: f64,
    alpha: Vec<f64>,
}

impl DirichletCompoundCounts {
    /// # Errors
    /// Same as [`DirichletCounts::new`].
    pub fn new(total: f64, alpha: Vec<f64>) -> ArrivalResult<Self> {
        verify_dirichlet(total, &alpha)?;
        Ok(Self { total, alpha })
    }

    /// Fit `(a, α)` from historical counts (observations × main periods).
    pub fn from_counts(counts: &Array2<u64>, opts: &LbfgsOptions) -> ArrivalResult<Self> {
        let fit = fit_dirichlet_multinomial(counts, opts)?;
        Self::new(fit.total, fit.alpha)
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }
}

impl CountModel for DirichletCompoundCounts {
    fn name(&self) -> &'static str {
        "dirichlet-compound counts"
    }

    fn period_count(&self) -> usize {
        self.alpha.len() + 2
    }

    fn draw_counts(&mut self, busyness: &BusynessState, stream: &mut RandomStream) -> ArrivalResult<Vec<u64>> {
        let n = (self.total * busyness.day_factor()).round() as u64;
        let q = dirichlet(stream, &self.alpha)?;
        let main = multinomial(stream, n, &q)?;
        Ok(embed_main_counts(&main))
    }

    fn expected_count(&self, busyness: &BusynessModel, p: usize) -> f64 {
        expected_split(self.total, &self.alpha, busyness, p)
    }
}

fn expected_split(total: f64, alpha: &[f64], busyness: &BusynessModel, p: usize) -> f64 {
    let sum: f64 = alpha.iter().sum();
    match p.checked_sub(1).and_then(|i| alpha.get(i)) {
        Some(&a) => total * busyness.expected_day() * a / sum,
        None => 0.0,
    }
}

fn verify_dirichlet(total: f64, alpha: &[f64]) -> ArrivalResult<()> {
    if !total.is_finite() || total < 0.0 {
        return Err(ArrivalError::InvalidParameter {
            name: "dirichlet total",
            value: total,
            reason: "Expected total must be finite and non-negative.",
        });
    }
    for (index, &a) in alpha.iter().enumerate() {
        if !a.is_finite() || a < 0.0 {
            return Err(ArrivalError::InvalidShape {
                index,
                value: a,
                reason: "Dirichlet concentrations must be finite and non-negative.",
            });
        }
    }
    if !alpha.iter().any(|&a| a > 0.0) {
        return Err(ArrivalError::InvalidShape {
            index: 0,
            value: 0.0,
            reason: "At least one Dirichlet concentration must be positive.",
        });
    }
    Ok(())
}

/// Dirichlet-multinomial log-likelihood in `θ = softplus⁻¹(α)`.
///
/// `Data` holds the counts of the periods being fitted (observations ×
/// periods); the multinomial coefficient is omitted as it does not depend
/// on `α`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirichletMultinomialLikelihood;

impl LogLikelihood for DirichletMultinomialLikelihood {
    type Data = Array2<u64>;

    fn value(&self, theta: &Theta, data: &Array2<u64>) -> OptResult<f64> {
        let alpha = theta.mapv(safe_softplus);
        let a_sum = alpha.sum();
        let lg_sum = ln_gamma(a_sum);
        let lg_alpha = alpha.mapv(ln_gamma);
        let mut ll = 0.0;
        for row in data.rows() {
            let n: u64 = row.sum();
            ll += lg_sum - ln_gamma(n as f64 + a_sum);
            for (p, &x) in row.iter().enumerate() {
                if x > 0 {
                    ll += ln_gamma(x as f64 + alpha[p]) - lg_alpha[p];
                }
            }
        }
        Ok(ll)
    }

    fn check(&self, theta: &Theta, data: &Array2<u64>) -> OptResult<()> {
        if theta.len() != data.ncols() {
            return Err(OptError::ThetaDimMismatch { expected: data.ncols(), found: theta.len() });
        }
        if let Some((index, &value)) = theta.iter().enumerate().find(|(_, t)| !t.is_finite()) {
            return Err(OptError::InvalidThetaInput { index, value, reason: "Parameters must be finite." });
        }
        Ok(())
    }

    fn grad(&self, theta: &Theta, data: &Array2<u64>) -> OptResult<Grad> {
        let alpha = theta.mapv(safe_softplus);
        let a_sum = alpha.sum();
        let psi_sum = digamma(a_sum);
        let psi_alpha = alpha.mapv(digamma);
        let mut g = Array1::<f64>::zeros(alpha.len());
        for row in data.rows() {
            let n: u64 = row.sum();
            let common = psi_sum - digamma(n as f64 + a_sum);
            for (p, &x) in row.iter().enumerate() {
                g[p] += common;
                if x > 0 {
                    g[p] += digamma(x as f64 + alpha[p]) - psi_alpha[p];
                }
            }
        }
        Ok(g * theta.mapv(safe_logistic))
    }
}

/// Fitted Dirichlet-split parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct DirichletFit {
    /// Mean daily total `a`.
    pub total: f64,
    /// Concentrations per main period; periods never observed get 0.
    pub alpha: Vec<f64>,
    /// Maximized log-likelihood (up to the multinomial coefficient).
    pub log_likelihood: f64,
    /// Solver outcome, absent when no optimization was needed.
    pub outcome: Option<OptimOutcome>,
}

/// Fit `(a, α)` by Dirichlet-multinomial maximum likelihood.
///
/// Periods whose counts are all zero get `α_p = 0` and are left out of the
/// optimization; with a single active period the split is degenerate and
/// `α` is set to 1 there without optimizing.
///
/// # Errors
/// - [`ArrivalError::LengthMismatch`] for an empty matrix.
/// - [`ArrivalError::InvalidShape`] if every count is zero.
/// - [`ArrivalError::Numerical`] for solver failures.
pub fn fit_dirichlet_multinomial(counts: &Array2<u64>, opts: &LbfgsOptions) -> ArrivalResult<DirichletFit> {
    let (n_obs, n_periods) = counts.dim();
    if n_obs == 0 || n_periods == 0 {
        return Err(ArrivalError::LengthMismatch { what: "count observations", expected: 1, found: 0 });
    }
    let column_sums: Vec<u64> = counts.columns().into_iter().map(|c| c.sum()).collect();
    let active: Vec<usize> = (0..n_periods).filter(|&p| column_sums[p] > 0).collect();
    let grand: u64 = column_sums.iter().sum();
    if active.is_empty() {
        return Err(ArrivalError::InvalidShape {
            index: 0,
            value: 0.0,
            reason: "Cannot fit a Dirichlet split to all-zero counts.",
        });
    }
    let total = grand as f64 / n_obs as f64;
    let mut alpha = vec![0.0; n_periods];
    if active.len() == 1 {
        alpha[active[0]] = 1.0;
        return Ok(DirichletFit { total, alpha, log_likelihood: 0.0, outcome: None });
    }

    let data = counts.select(ndarray::Axis(1), &active);
    let q: Vec<f64> = active.iter().map(|&p| column_sums[p] as f64 / grand as f64).collect();
    let precision = start_precision(&data, &q);
    let theta0: Theta = q.iter().map(|&qp| safe_softplus_inv(qp * precision)).collect();
    debug!(periods = active.len(), observations = n_obs, precision, "dirichlet-multinomial fit");

    let outcome = maximize(&DirichletMultinomialLikelihood, theta0, &data, opts)?;
    if !outcome.converged {
        warn!(status = %outcome.status, "dirichlet-multinomial fit did not report convergence");
    }
    for (k, &p) in active.iter().enumerate() {
        alpha[p] = safe_softplus(outcome.theta_hat[k]);
    }
    Ok(DirichletFit { total, alpha, log_likelihood: outcome.value, outcome: Some(outcome) })
}

/// Moment-based starting value of `Σα`.
///
/// Uses `Var(x_p) = n q_p (1 − q_p)(n + A)/(1 + A)` at the mean total `n`.
fn start_precision(data: &Array2<u64>, q: &[f64]) -> f64 {
    let n_obs = data.nrows() as f64;
    let n_bar = data.rows().into_iter().map(|r| r.sum() as f64).sum::<f64>() / n_obs;
    let mut phi_acc = 0.0;
    let mut used = 0usize;
    for (k, column) in data.columns().into_iter().enumerate() {
        let denom = n_bar * q[k] * (1.0 - q[k]);
        if denom <= 0.0 || n_obs < 2.0 {
            continue;
        }
        let mean = column.iter().map(|&x| x as f64).sum::<f64>() / n_obs;
        let var = column.iter().map(|&x| (x as f64 - mean).powi(2)).sum::<f64>() / (n_obs - 1.0);
        phi_acc += var / denom;
        used += 1;
    }
    if used == 0 {
        return 1.0;
    }
    let phi = phi_acc / used as f64;
    if phi <= 1.0 {
        return MAX_START_PRECISION;
    }
    ((n_bar - phi) / (phi - 1.0)).clamp(MIN_START_PRECISION, MAX_START_PRECISION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Mass conservation of the compound split and rounding of the plain
    //   split.
    // - Busyness scaling of the total.
    // - Recovery of α by the Dirichlet-multinomial fit on simulated data.
    //
    // They intentionally DO NOT cover:
    // - L-BFGS internals, tested in `loglik_optimizer`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // The compound split always sums to round(a · B), with zero
    // preliminary and wrap-up counts.
    fn compound_counts_conserve_total() {
        let mut m = DirichletCompoundCounts::new(50.0, vec![1.0, 2.0, 3.0]).unwrap();
        let b = BusynessState::day(1.5).unwrap();
        let mut s = RandomStream::new(9);
        for _ in 0..100 {
            let c = m.draw_counts(&b, &mut s).unwrap();
            assert_eq!(c.len(), 5);
            assert_eq!(c[0], 0);
            assert_eq!(c[4], 0);
            assert_eq!(c.iter().sum::<u64>(), 75);
        }
    }

    #[test]
    // Purpose
    // -------
    // The rounded split stays within rounding error of a · B and the
    // expected count follows E[B] · a · α_p / Σα.
    fn rounded_split_tracks_total() {
        let mut m = DirichletCounts::new(40.0, vec![1.0, 1.0, 2.0, 0.0]).unwrap();
        let b = BusynessState::day(0.5).unwrap();
        let mut s = RandomStream::new(4);
        let c = m.draw_counts(&b, &mut s).unwrap();
        let sum = c.iter().sum::<u64>() as i64;
        assert!((sum - 20).abs() <= 2, "sum = {sum}");
        assert_eq!(c[4], 0);
        let busy = BusynessModel::gamma_with_mean(3.0, 2.0).unwrap();
        assert_relative_eq!(m.expected_count(&busy, 3), 40.0);
        assert_eq!(m.expected_count(&busy, 0), 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Invalid parameters are rejected.
    fn invalid_parameters_are_rejected() {
        assert!(DirichletCounts::new(-1.0, vec![1.0]).is_err());
        assert!(DirichletCounts::new(1.0, vec![0.0, 0.0]).is_err());
        assert!(DirichletCompoundCounts::new(1.0, vec![f64::NAN]).is_err());
    }

    #[test]
    // Purpose
    // -------
    // The Dirichlet-multinomial fit recovers the concentrations of
    // simulated compound counts.
    //
    // Given
    // -----
    // - a = 100, α = (2, 4, 6), 1 500 days, an unused fourth period.
    //
    // Expect
    // ------
    // - α̂ within 25% of α, the unused period at 0, â ≈ 100.
    fn fit_recovers_concentrations() {
        // Arrange
        let mut m = DirichletCompoundCounts::new(100.0, vec![2.0, 4.0, 6.0, 0.0]).unwrap();
        let mut s = RandomStream::new(2024);
        let b = BusynessState::unit();
        let n = 1_500;
        let mut flat = Vec::with_capacity(n * 4);
        for _ in 0..n {
            let c = m.draw_counts(&b, &mut s).unwrap();
            flat.extend_from_slice(&c[1..=4]);
        }
        let counts = Array2::from_shape_vec((n, 4), flat).unwrap();

        // Act
        let fit = fit_dirichlet_multinomial(&counts, &LbfgsOptions::default()).unwrap();

        // Assert
        assert_relative_eq!(fit.total, 100.0);
        assert_relative_eq!(fit.alpha[0], 2.0, max_relative = 0.25);
        assert_relative_eq!(fit.alpha[1], 4.0, max_relative = 0.25);
        assert_relative_eq!(fit.alpha[2], 6.0, max_relative = 0.25);
        assert_eq!(fit.alpha[3], 0.0);
        assert!(fit.outcome.is_some());
    }

    #[test]
    // Purpose
    // -------
    // A single active period needs no optimization.
    fn single_active_period_is_degenerate() {
        let counts = Array2::from_shape_vec((2, 2), vec![0, 5, 0, 7]).unwrap();
        let fit = fit_dirichlet_multinomial(&counts, &LbfgsOptions::default()).unwrap();
        assert_eq!(fit.alpha, vec![0.0, 1.0]);
        assert_relative_eq!(fit.total, 6.0);
        assert!(fit.outcome.is_none());
    }
}
