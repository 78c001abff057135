//! Independent gamma-mixed rates: `λ̃_p = λ_p · Gamma(α_p, α_p)`.
use ndarray::Array2;
use tracing::debug;

use crate::{
    arrivals::{
        errors::ArrivalResult,
        rates::{RateModel, embed_main, verify_means_and_shapes},
    },
    correlation::negbin::{NegBinOptions, fit_negative_binomial},
    random::{RandomStream, variates::gamma_unit_mean},
};

/// Poisson-gamma rate model over `P` main periods.
///
/// With a `Gamma(Q, Q)` day busyness this is the doubly-stochastic model
/// fitted by [`crate::estimation`].
#[derive(Debug, Clone, PartialEq)]
pub struct PoissonGammaRates {
    means: Vec<f64>,
    shapes: Vec<f64>,
}

impl PoissonGammaRates {
    /// Build from main-period means `λ_p` and shapes `α_p`.
    ///
    /// # Errors
    /// - [`crate::arrivals::ArrivalError::LengthMismatch`] for unequal or
    ///   empty vectors.
    /// - [`crate::arrivals::ArrivalError::InvalidRate`] /
    ///   [`crate::arrivals::ArrivalError::InvalidShape`] for invalid entries.
    pub fn new(means: Vec<f64>, shapes: Vec<f64>) -> ArrivalResult<Self> {
        verify_means_and_shapes(&means, &shapes)?;
        Ok(Self { means, shapes })
    }

    /// Fit one negative-binomial marginal per column of `counts`
    /// (observations × main periods).
    ///
    /// Under-dispersed columns get `α_p = +∞` (pure Poisson).
    pub fn from_counts(counts: &Array2<u64>, opts: &NegBinOptions) -> ArrivalResult<Self> {
        let mut means = Vec::with_capacity(counts.ncols());
        let mut shapes = Vec::with_capacity(counts.ncols());
        for (p, column) in counts.columns().into_iter().enumerate() {
            let sample: Vec<u64> = column.iter().copied().collect();
            let fit = fit_negative_binomial(&sample, opts)?;
            debug!(period = p + 1, mean = fit.mean, shape = fit.shape, degenerate = fit.degenerate, "negative binomial marginal");
            means.push(fit.mean);
            shapes.push(if fit.degenerate { f64::INFINITY } else { fit.shape });
        }
        Self::new(means, shapes)
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn shapes(&self) -> &[f64] {
        &self.shapes
    }
}

impl RateModel for PoissonGammaRates {
    fn name(&self) -> &'static str {
        "poisson-gamma rates"
    }

    fn period_count(&self) -> usize {
        self.means.len() + 2
    }

    fn draw(&mut self, stream: &mut RandomStream) -> ArrivalResult<Vec<f64>> {
        let mut main = Vec::with_capacity(self.means.len());
        for (&m, &a) in self.means.iter().zip(&self.shapes) {
            main.push(if m == 0.0 || a == 0.0 { 0.0 } else { m * gamma_unit_mean(stream, a)? });
        }
        Ok(embed_main(&main))
    }

    fn expected_rate(&self, p: usize) -> f64 {
        match p.checked_sub(1).and_then(|i| self.means.get(i).zip(self.shapes.get(i))) {
            Some((&m, &a)) if a > 0.0 => m,
            _ => 0.0,
        }
    }
}
