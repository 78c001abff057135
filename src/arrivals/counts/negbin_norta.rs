//! Correlated negative-binomial counts through a Gaussian copula.
use ndarray::Array2;
use tracing::debug;

use crate::{
    arrivals::{
        core::busyness::{BusynessModel, BusynessState},
        counts::{CountModel, embed_main_counts},
        errors::{ArrivalError, ArrivalResult},
        rates::{NortaCopula, verify_means_and_shapes},
    },
    correlation::{CopulaOptions, estimate_copula},
    random::{RandomStream, negative_binomial_inverse_cdf},
};

/// Options of [`NegativeBinomialNortaCounts::from_counts`].
pub type NegBinNortaOptions = CopulaOptions;

/// Negative-binomial counts `NB(r_p, μ_p · B · B_p)` coupled by a copula.
///
/// A shape of `+∞` gives Poisson marginals; a shape or mean of 0 gives
/// an empty period.
#[derive(Debug, Clone, PartialEq)]
pub struct NegativeBinomialNortaCounts {
    means: Vec<f64>,
    shapes: Vec<f64>,
    copula: NortaCopula,
}

impl NegativeBinomialNortaCounts {
    /// # Errors
    /// - Validation errors of the means and shapes.
    /// - [`ArrivalError::LengthMismatch`] for a copula of the wrong size.
    pub fn new(means: Vec<f64>, shapes: Vec<f64>, copula: NortaCopula) -> ArrivalResult<Self> {
        verify_means_and_shapes(&means, &shapes)?;
        if copula.dimension() != means.len() {
            return Err(ArrivalError::LengthMismatch {
                what: "copula dimension",
                expected: means.len(),
                found: copula.dimension(),
            });
        }
        Ok(Self { means, shapes, copula })
    }

    /// Estimate marginals and copula from historical counts
    /// (observations × main periods): negative-binomial fits, NORTA
    /// correlation, then positive-definiteness repair.
    pub fn from_counts(counts: &Array2<u64>, opts: &NegBinNortaOptions) -> ArrivalResult<Self> {
        let estimate = estimate_copula(counts, opts)?;
        debug!(
            method = ?estimate.correction.method,
            iterations = estimate.correction.iterations,
            "negative binomial NORTA copula estimated"
        );
        let means = estimate.marginals.iter().map(|m| m.mean).collect();
        let shapes = estimate
            .marginals
            .iter()
            .map(|m| if m.degenerate { f64::INFINITY } else { m.shape })
            .collect();
        let copula = NortaCopula::new(estimate.correction.matrix)?;
        Self::new(means, shapes, copula)
    }

    pub fn means(&self) -> &[f64] {
        &self.means
    }

    pub fn shapes(&self) -> &[f64] {
        &self.shapes
    }

    pub fn copula(&self) -> &NortaCopula {
        &self.copula
    }
}

impl CountModel for NegativeBinomialNortaCounts {
    fn name(&self) -> &'static str {
        "negative-binomial NORTA counts"
    }

    fn period_count(&self) -> usize {
        self.means.len() + 2
    }

    fn draw_counts(&mut self, busyness: &BusynessState, stream: &mut RandomStream) -> ArrivalResult<Vec<u64>> {
        let u = self.copula.uniforms(stream)?;
        let main: Vec<u64> = (0..self.means.len())
            .map(|i| {
                let (m, r) = (self.means[i], self.shapes[i]);
                if m == 0.0 || r == 0.0 {
                    0
                } else {
                    negative_binomial_inverse_cdf(u[i], r, m * busyness.effective(i + 1))
                }
            })
            .collect();
        Ok(embed_main_counts(&main))
    }

    fn expected_count(&self, busyness: &BusynessModel, p: usize) -> f64 {
        match p.checked_sub(1).and_then(|i| self.means.get(i).zip(self.shapes.get(i))) {
            Some((&m, &r)) if r > 0.0 => m * busyness.expected_effective(p),
            _ => 0.0,
        }
    }
}
