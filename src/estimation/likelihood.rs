//! likelihood — Monte-Carlo log-likelihood of the Gamma-Poisson model.
//!
//! Purpose
//! -------
//! Evaluate `ℓ(θ) = Σ_i ln E_b[∏_p NB(x_ip; R_p, λ_p b)]` with `b ~
//! Gamma(Q, Q)` by importance sampling, together with its gradient and
//! diagonal Hessian, for the stochastic trust-region ascent.
//!
//! Key behaviors
//! -------------
//! - `evaluate` draws `M` day factors from the proposal `Gamma(Q₀, Q₀)`
//!   at the current `Q₀`; every observation shares these draws.
//! - Derivatives follow Louis' identity with self-normalized posterior
//!   weights `π_im ∝ w_m f_im`: gradient `E_π[s]`, diagonal Hessian
//!   `E_π[∂s] + Var_π[s]`.
//! - `value_on_last_draws` re-weights the stored draws by
//!   `g_Q(b)/g_{Q₀}(b)`, so two parameter values are compared on common
//!   random numbers.
//!
//! Invariants & assumptions
//! ------------------------
//! - Parameter layout `θ = [λ_1..λ_P, R_1..R_K, Q]` with `K = 1` (common
//!   shape) or `K = P` (per-period shapes).
//! - Components whose start value sits at the ceiling are held fixed: a
//!   fixed `Q` makes `b ≡ 1` and the likelihood exact; a fixed `R_p`
//!   replaces the negative binomial by its Poisson limit. A zero rate is
//!   held fixed too.
//! - Groups: 0 = rates, 1 = period shapes, 2 = daily shape.
use statrs::function::gamma::{digamma, ln_gamma};

use crate::{
    estimation::{
        data::ArrivalCounts,
        errors::{EstimationError, EstimationResult},
    },
    optimization::{
        errors::OptResult,
        loglik_optimizer::Theta,
        numerical_stability::{digamma_shift, ln_factorial, ln_gamma_shift, log_sum_exp, trigamma, trigamma_shift},
        trust_region::{StochasticEvaluation, StochasticObjective},
    },
    random::{RandomStream, variates::gamma_unit_mean},
};

pub const RATE_GROUP: usize = 0;
pub const SHAPE_GROUP: usize = 1;
pub const DAILY_GROUP: usize = 2;

/// How period shapes are parameterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeLayout {
    /// One `R` shared by every period.
    Common,
    /// One `R_p` per period.
    PerPeriod,
}

/// Importance-sampled Gamma-Poisson log-likelihood.
#[derive(Debug, Clone)]
pub struct GammaPoissonLikelihood<'a> {
    counts: &'a ArrivalCounts,
    layout: ShapeLayout,
    n_samples: usize,
    max_shape: f64,
    frozen: Vec<bool>,
    ln_fact: Vec<f64>,
    draws: Vec<f64>,
    proposal_shape: f64,
}

impl<'a> GammaPoissonLikelihood<'a> {
    /// Likelihood over `counts`, freezing components of `theta0` as
    /// described in the module docs.
    ///
    /// # Errors
    /// - [`EstimationError::LengthMismatch`] if `theta0` does not follow the
    ///   layout.
    /// - [`EstimationError::InvalidStart`] for negative or non-finite
    ///   components.
    pub fn new(counts: &'a ArrivalCounts, layout: ShapeLayout, theta0: &Theta, n_samples: usize, max_shape: f64) -> EstimationResult<Self> {
        let n_periods = counts.n_periods();
        let n_shapes = shape_count(layout, n_periods);
        let dim = n_periods + n_shapes + 1;
        if theta0.len() != dim {
            return Err(EstimationError::LengthMismatch { what: "parameter vector", expected: dim, found: theta0.len() });
        }
        for (index, &value) in theta0.iter().enumerate() {
            if !value.is_finite() || value < 0.0 || (index >= n_periods && value == 0.0) {
                return Err(EstimationError::InvalidStart {
                    name: component_name(index, n_periods, n_shapes),
                    index,
                    value,
                    reason: "Rates must be finite and non-negative; shapes finite and positive.",
                });
            }
        }
        let frozen = theta0
            .iter()
            .enumerate()
            .map(|(i, &v)| if i < n_periods { v == 0.0 } else { v >= max_shape })
            .collect();
        let ln_fact = counts.counts().iter().map(|&x| ln_factorial(x)).collect();
        Ok(Self {
            counts,
            layout,
            n_samples: n_samples.max(1),
            max_shape,
            frozen,
            ln_fact,
            draws: vec![1.0],
            proposal_shape: f64::INFINITY,
        })
    }

    pub fn layout(&self) -> ShapeLayout {
        self.layout
    }

    /// `true` if component `index` is held fixed.
    pub fn is_frozen(&self, index: usize) -> bool {
        self.frozen.get(index).copied().unwrap_or(true)
    }

    fn n_periods(&self) -> usize {
        self.counts.n_periods()
    }

    fn shape_index(&self, p: usize) -> usize {
        match self.layout {
            ShapeLayout::Common => self.n_periods(),
            ShapeLayout::PerPeriod => self.n_periods() + p,
        }
    }

    fn daily_index(&self) -> usize {
        self.n_periods() + shape_count(self.layout, self.n_periods())
    }

    fn daily_fixed(&self) -> bool {
        self.frozen[self.daily_index()]
    }

    fn poisson_limit(&self, p: usize) -> bool {
        self.frozen[self.shape_index(p)]
    }

    /// `ln w_m` of the stored draws at daily shape `q`.
    fn log_weights(&self, q: f64) -> Vec<f64> {
        if self.daily_fixed() || q == self.proposal_shape {
            return vec![0.0; self.draws.len()];
        }
        self.draws.iter().map(|&b| ln_gamma_density(q, b) - ln_gamma_density(self.proposal_shape, b)).collect()
    }

    /// `b`-independent part of `ln NB(x; R, ·)`: `lnΓ(x+R) − lnΓ(R) − ln x!`.
    fn count_constants(&self, theta: &Theta) -> Vec<f64> {
        let n_periods = self.n_periods();
        self.counts
            .counts()
            .indexed_iter()
            .map(|((i, p), &x)| {
                let ln_fact = self.ln_fact[i * n_periods + p];
                if self.poisson_limit(p) { -ln_fact } else { ln_gamma_shift(theta[self.shape_index(p)], x) - ln_fact }
            })
            .collect()
    }

    /// `Σ_p ln NB(x_ip; R_p, λ_p b)` for one observation and one draw.
    fn joint_log_pmf(&self, theta: &Theta, consts: &[f64], i: usize, b: f64) -> f64 {
        let n_periods = self.n_periods();
        let row = self.counts.counts().row(i);
        let mut total = 0.0;
        for (p, &x) in row.iter().enumerate() {
            let lambda = theta[p];
            if lambda == 0.0 {
                continue;
            }
            let mu = lambda * b;
            let c = consts[i * n_periods + p];
            total += if self.poisson_limit(p) {
                c + x as f64 * mu.ln() - mu
            } else {
                let r = theta[self.shape_index(p)];
                let mut term = c - r * (mu / r).ln_1p();
                if x > 0 {
                    term += x as f64 * (mu / (r + mu)).ln();
                }
                term
            };
        }
        total
    }

    fn value_with_weights(&self, theta: &Theta, log_w: &[f64]) -> f64 {
        let consts = self.count_constants(theta);
        let ln_m = (self.draws.len() as f64).ln();
        let mut terms = vec![0.0; self.draws.len()];
        let mut total = 0.0;
        for i in 0..self.counts.n_obs() {
            for (m, &b) in self.draws.iter().enumerate() {
                terms[m] = log_w[m] + self.joint_log_pmf(theta, &consts, i, b);
            }
            total += log_sum_exp(&terms) - ln_m;
        }
        total
    }

    /// Per-component score and second derivative of `ln f_im + ln g_Q(b)`
    /// for one observation and draw, accumulated into `s` and `d`.
    fn draw_derivatives(&self, theta: &Theta, i: usize, b: f64, daily: &(f64, f64), s: &mut [f64], d: &mut [f64]) {
        s.iter_mut().for_each(|v| *v = 0.0);
        d.iter_mut().for_each(|v| *v = 0.0);
        let row = self.counts.counts().row(i);
        for (p, &x) in row.iter().enumerate() {
            let lambda = theta[p];
            if lambda == 0.0 {
                continue;
            }
            let xf = x as f64;
            let mu = lambda * b;
            if self.poisson_limit(p) {
                s[p] += xf / lambda - b;
                d[p] += -xf / (lambda * lambda);
                continue;
            }
            let k = self.shape_index(p);
            let r = theta[k];
            let denom = r + mu;
            s[p] += xf / lambda - (r + xf) * b / denom;
            d[p] += -xf / (lambda * lambda) + (r + xf) * b * b / (denom * denom);
            s[k] += digamma_shift(r, x) + (r / denom).ln() + (mu - xf) / denom;
            d[k] += trigamma_shift(r, x) + 1.0 / r - 1.0 / denom - (mu - xf) / (denom * denom);
        }
        if !self.daily_fixed() {
            let q_idx = self.daily_index();
            s[q_idx] = daily.0 + b.ln() - b;
            d[q_idx] = daily.1;
        }
    }
}

impl StochasticObjective for GammaPoissonLikelihood<'_> {
    fn dim(&self) -> usize {
        self.frozen.len()
    }

    fn group_count(&self) -> usize {
        3
    }

    fn group_of(&self, index: usize) -> Option<usize> {
        if self.is_frozen(index) {
            return None;
        }
        Some(if index < self.n_periods() {
            RATE_GROUP
        } else if index < self.daily_index() {
            SHAPE_GROUP
        } else {
            DAILY_GROUP
        })
    }

    fn upper_bound(&self, index: usize) -> f64 {
        if index < self.n_periods() { f64::INFINITY } else { self.max_shape }
    }

    fn evaluate(&mut self, theta: &Theta, stream: &mut RandomStream) -> OptResult<StochasticEvaluation> {
        let q = theta[self.daily_index()];
        if self.daily_fixed() {
            self.draws = vec![1.0];
            self.proposal_shape = f64::INFINITY;
        } else {
            self.draws = (0..self.n_samples).map(|_| gamma_unit_mean(stream, q)).collect::<Result<Vec<f64>, _>>()?;
            self.proposal_shape = q;
        }

        let dim = self.dim();
        let consts = self.count_constants(theta);
        // ∂/∂Q ln g_Q(b) = ln Q + 1 − ψ(Q) + ln b − b; the b-free part is shared.
        let daily = if self.daily_fixed() { (0.0, 0.0) } else { (q.ln() + 1.0 - digamma(q), 1.0 / q - trigamma(q)) };
        let ln_m = (self.draws.len() as f64).ln();
        let mut value = 0.0;
        let mut grad = Theta::zeros(dim);
        let mut hess = Theta::zeros(dim);
        let mut log_f = vec![0.0; self.draws.len()];
        let (mut s, mut d) = (vec![0.0; dim], vec![0.0; dim]);
        let (mut e_s, mut e_s2, mut e_d) = (vec![0.0; dim], vec![0.0; dim], vec![0.0; dim]);

        for i in 0..self.counts.n_obs() {
            for (m, &b) in self.draws.iter().enumerate() {
                log_f[m] = self.joint_log_pmf(theta, &consts, i, b);
            }
            let log_norm = log_sum_exp(&log_f);
            value += log_norm - ln_m;

            e_s.iter_mut().chain(e_s2.iter_mut()).chain(e_d.iter_mut()).for_each(|v| *v = 0.0);
            for (m, &b) in self.draws.iter().enumerate() {
                let weight = (log_f[m] - log_norm).exp();
                if weight == 0.0 {
                    continue;
                }
                self.draw_derivatives(theta, i, b, &daily, &mut s, &mut d);
                for j in 0..dim {
                    e_s[j] += weight * s[j];
                    e_s2[j] += weight * s[j] * s[j];
                    e_d[j] += weight * d[j];
                }
            }
            for j in 0..dim {
                grad[j] += e_s[j];
                hess[j] += e_d[j] + e_s2[j] - e_s[j] * e_s[j];
            }
        }
        for j in (0..dim).filter(|&j| self.is_frozen(j)) {
            grad[j] = 0.0;
            hess[j] = 0.0;
        }
        Ok(StochasticEvaluation { value, grad, hess_diag: hess })
    }

    fn value_on_last_draws(&self, theta: &Theta) -> OptResult<f64> {
        let log_w = self.log_weights(theta[self.daily_index()]);
        Ok(self.value_with_weights(theta, &log_w))
    }
}

pub(crate) fn shape_count(layout: ShapeLayout, n_periods: usize) -> usize {
    match layout {
        ShapeLayout::Common => 1,
        ShapeLayout::PerPeriod => n_periods,
    }
}

fn component_name(index: usize, n_periods: usize, n_shapes: usize) -> &'static str {
    if index < n_periods {
        "rate"
    } else if index < n_periods + n_shapes {
        "period shape"
    } else {
        "daily shape"
    }
}

/// `ln` of the unit-mean `Gamma(Q, 1/Q)` density at `b`.
fn ln_gamma_density(q: f64, b: f64) -> f64 {
    q * q.ln() - ln_gamma(q) + (q - 1.0) * b.ln() - q * b
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The exact likelihood when the day factor is held fixed.
    // - Analytic derivatives against finite differences on fixed draws.
    // - Re-weighting: the value on reused draws at the proposal shape
    //   equals the value returned by `evaluate`.
    // - Frozen components.
    // -------------------------------------------------------------------------

    fn small_data() -> ArrivalCounts {
        ArrivalCounts::from_rows(&[vec![3, 9], vec![5, 14], vec![2, 6], vec![8, 15], vec![4, 10]]).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // With Q and R at the ceiling the likelihood is an exact product of
    // Poisson pmfs.
    fn fixed_busyness_gives_exact_poisson_likelihood() {
        let data = ArrivalCounts::from_rows(&[vec![2], vec![0], vec![5]]).unwrap();
        let theta = array![3.0, 1e4, 1e4];
        let mut lik = GammaPoissonLikelihood::new(&data, ShapeLayout::Common, &theta, 50, 1e4).unwrap();
        let eval = lik.evaluate(&theta, &mut RandomStream::new(1)).unwrap();
        let exact: f64 = [2_u64, 0, 5].iter().map(|&x| x as f64 * 3f64.ln() - 3.0 - ln_factorial(x)).sum();
        assert_relative_eq!(eval.value, exact, epsilon = 1e-10);
        // d/dλ Σ (x/λ − 1) = 7/3 − 3.
        assert_relative_eq!(eval.grad[0], 7.0 / 3.0 - 3.0, epsilon = 1e-10);
        assert_eq!(lik.group_of(1), None);
        assert_eq!(lik.group_of(2), None);
    }

    #[test]
    // Purpose
    // -------
    // On fixed draws, gradients of the rate and shape components match
    // central differences of `value_on_last_draws`.
    fn gradient_matches_finite_differences_on_fixed_draws() {
        // Arrange
        let data = small_data();
        let theta = array![4.0, 10.0, 6.0, 8.0];
        let mut lik = GammaPoissonLikelihood::new(&data, ShapeLayout::Common, &theta, 64, 1e4).unwrap();
        let eval = lik.evaluate(&theta, &mut RandomStream::new(9)).unwrap();

        // Act / Assert
        assert_relative_eq!(lik.value_on_last_draws(&theta).unwrap(), eval.value, epsilon = 1e-9);
        for j in 0..3 {
            let h = 1e-5 * theta[j];
            let mut up = theta.clone();
            let mut down = theta.clone();
            up[j] += h;
            down[j] -= h;
            let fd = (lik.value_on_last_draws(&up).unwrap() - lik.value_on_last_draws(&down).unwrap()) / (2.0 * h);
            assert_relative_eq!(eval.grad[j], fd, epsilon = 1e-5, max_relative = 1e-4);
        }
    }

    #[test]
    // Purpose
    // -------
    // The daily-shape gradient matches the central difference of the
    // re-weighted value: at Q₀ the score of the importance weights is the
    // proposal score.
    fn daily_gradient_matches_reweighted_value() {
        let data = small_data();
        let theta = array![4.0, 10.0, 6.0, 8.0];
        let mut lik = GammaPoissonLikelihood::new(&data, ShapeLayout::Common, &theta, 64, 1e4).unwrap();
        let eval = lik.evaluate(&theta, &mut RandomStream::new(10)).unwrap();
        let h = 1e-4;
        let mut up = theta.clone();
        let mut down = theta.clone();
        up[3] += h;
        down[3] -= h;
        let fd = (lik.value_on_last_draws(&up).unwrap() - lik.value_on_last_draws(&down).unwrap()) / (2.0 * h);
        assert_relative_eq!(eval.grad[3], fd, epsilon = 1e-5, max_relative = 1e-3);
        assert!(eval.hess_diag.iter().all(|h| h.is_finite()));
    }

    #[test]
    // Purpose
    // -------
    // Zero rates and ceiling shapes are frozen; bad layouts are rejected.
    fn frozen_components_and_layout_checks() {
        let data = small_data();
        let theta = array![0.0, 10.0, 2.0, 1e4, 3.0];
        let lik = GammaPoissonLikelihood::new(&data, ShapeLayout::PerPeriod, &theta, 8, 1e4).unwrap();
        assert_eq!(lik.group_of(0), None);
        assert_eq!(lik.group_of(1), Some(RATE_GROUP));
        assert_eq!(lik.group_of(2), Some(SHAPE_GROUP));
        assert_eq!(lik.group_of(3), None);
        assert_eq!(lik.group_of(4), Some(DAILY_GROUP));
        assert!(GammaPoissonLikelihood::new(&data, ShapeLayout::Common, &theta, 8, 1e4).is_err());
        let bad = array![1.0, 1.0, 0.0, 2.0];
        assert!(GammaPoissonLikelihood::new(&data, ShapeLayout::Common, &bad, 8, 1e4).is_err());
    }
}
