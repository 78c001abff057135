//! Gaussian copula (NORTA) and the correlated Poisson-gamma rate model.
//!
//! NORTA ("normal to anything") draws a vector `Z ~ N(0, Σ)` through the
//! Cholesky factor of `Σ`, maps each component to a uniform `U_p = Φ(Z_p)`
//! and pushes every uniform through the inverse CDF of the desired
//! marginal. The marginals are exact; the dependence is that of `Σ` on the
//! normal scale.
use nalgebra::{Cholesky, DMatrix};
use ndarray::Array2;

use crate::{
    arrivals::{
        errors::{ArrivalError, ArrivalResult},
        rates::{RateModel, embed_main, verify_means_and_shapes},
    },
    random::{RandomStream, gamma_inverse_cdf, normal_cdf, variates::multivariate_normal},
};

const SYMMETRY_TOL: f64 = 1e-10;

/// Validated Gaussian copula with its Cholesky factor.
#[derive(Debug, Clone, PartialEq)]
pub struct NortaCopula {
    sigma: Array2<f64>,
    chol: DMatrix<f64>,
}

impl NortaCopula {
    /// Build from a correlation matrix `Σ`.
    ///
    /// # Errors
    /// - [`ArrivalError::InvalidCorrelation`] for a non-square, asymmetric
    ///   matrix, a diagonal other than 1 or entries outside `[−1, 1]`.
    /// - [`ArrivalError::NotPositiveDefinite`] if the Cholesky
    ///   factorization fails; repair the matrix with
    ///   [`crate::correlation::posdef::correct_positive_definite`] first.
    pub fn new(sigma: Array2<f64>) -> ArrivalResult<Self> {
        let (n, m) = sigma.dim();
        if n != m || n == 0 {
            return Err(ArrivalError::InvalidCorrelation { reason: "Matrix must be square and non-empty." });
        }
        for i in 0..n {
            if (sigma[[i, i]] - 1.0).abs() > SYMMETRY_TOL {
                return Err(ArrivalError::InvalidCorrelation { reason: "Diagonal entries must equal 1." });
            }
            for j in 0..i {
                let v = sigma[[i, j]];
                if !v.is_finite() || v.abs() > 1.0 {
                    return Err(ArrivalError::InvalidCorrelation {
                        reason: "Off-diagonal entries must lie in [-1, 1].",
                    });
                }
                if (v - sigma[[j, i]]).abs() > SYMMETRY_TOL {
                    return Err(ArrivalError::InvalidCorrelation { reason: "Matrix must be symmetric." });
                }
            }
        }
        let dense = DMatrix::from_fn(n, n, |i, j| sigma[[i, j]]);
        let chol = Cholesky::new(dense).ok_or(ArrivalError::NotPositiveDefinite)?.l();
        Ok(Self { sigma, chol })
    }

    /// Independent copula of dimension `n`.
    pub fn identity(n: usize) -> ArrivalResult<Self> {
        Self::new(Array2::eye(n))
    }

    pub fn dimension(&self) -> usize {
        self.chol.nrows()
    }

    pub fn correlation(&self) -> &Array2<f64> {
        &self.sigma
    }

    /// One vector of dependent uniforms.
    pub fn uniforms(&self, stream: &mut RandomStream) -> ArrivalResult<Vec<f64>> {
        let z = multivariate_normal(stream, &self.chol)?;
        Ok(z.into_iter().map(normal_cdf).collect())
    }
}

/// Poisson-gamma rates whose gamma factors are coupled by a
/// [`NortaCopula`]: `λ̃_p = λ_p · F⁻¹_{Γ(α_p, 1/α_p)}(U_p)`.
#[derive(Debug, Clone, PartialEq)]
pub struct PoissonGammaNortaRates {
    means: Vec<f64>,
    shapes: Vec<f64>,
    copula: NortaCopula,
}

impl PoissonGammaNortaRates {
    /// # Errors
    /// - Validation errors of the means and shapes.
    /// - [`ArrivalError::LengthMismatch`] if the copula dimension differs
    ///   from the number of main periods.
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

    pub fn copula(&self) -> &NortaCopula {
        &self.copula
    }
}

impl RateModel for PoissonGammaNortaRates {
    fn name(&self) -> &'static str {
        "poisson-gamma NORTA rates"
    }

    fn period_count(&self) -> usize {
        self.means.len() + 2
    }

    fn draw(&mut self, stream: &mut RandomStream) -> ArrivalResult<Vec<f64>> {
        let u = self.copula.uniforms(stream)?;
        let main: Vec<f64> = self
            .means
            .iter()
            .zip(&self.shapes)
            .zip(u)
            .map(|((&m, &a), u)| if m == 0.0 || a == 0.0 { 0.0 } else { m * gamma_inverse_cdf(u, a, 1.0 / a) })
            .collect();
        Ok(embed_main(&main))
    }

    fn expected_rate(&self, p: usize) -> f64 {
        match p.checked_sub(1).and_then(|i| self.means.get(i).zip(self.shapes.get(i))) {
            Some((&m, &a)) if a > 0.0 => m,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // Copula validation and the dependence/marginals of NORTA gamma rates.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Malformed or indefinite matrices are rejected with distinct errors.
    fn copula_validation() {
        assert!(NortaCopula::identity(3).is_ok());
        assert!(matches!(
            NortaCopula::new(array![[1.0, 0.2], [0.3, 1.0]]),
            Err(ArrivalError::InvalidCorrelation { .. })
        ));
        assert!(matches!(
            NortaCopula::new(array![[2.0, 0.0], [0.0, 1.0]]),
            Err(ArrivalError::InvalidCorrelation { .. })
        ));
        let indefinite = array![[1.0, 0.9, -0.9], [0.9, 1.0, 0.9], [-0.9, 0.9, 1.0]];
        assert_eq!(NortaCopula::new(indefinite), Err(ArrivalError::NotPositiveDefinite));
    }

    #[test]
    // Purpose
    // -------
    // Strong positive copula correlation produces positively correlated
    // gamma factors with the configured means.
    //
    // Given
    // -----
    // - Two periods, Σ₁₂ = 0.8, λ = [10, 20], α = [3, 3].
    fn norta_rates_are_correlated_with_exact_means() {
        // Arrange
        let copula = NortaCopula::new(array![[1.0, 0.8], [0.8, 1.0]]).unwrap();
        let mut m = PoissonGammaNortaRates::new(vec![10.0, 20.0], vec![3.0, 3.0], copula).unwrap();
        let mut s = RandomStream::new(5);
        let n = 20_000;

        // Act
        let draws: Vec<Vec<f64>> = (0..n).map(|_| m.draw(&mut s).unwrap()).collect();
        let mean = |k: usize| draws.iter().map(|d| d[k]).sum::<f64>() / n as f64;
        let (m1, m2) = (mean(1), mean(2));
        let cov = draws.iter().map(|d| (d[1] - m1) * (d[2] - m2)).sum::<f64>() / n as f64;
        let sd = |k: usize, mk: f64| (draws.iter().map(|d| (d[k] - mk).powi(2)).sum::<f64>() / n as f64).sqrt();
        let corr = cov / (sd(1, m1) * sd(2, m2));

        // Assert
        assert_relative_eq!(m1, 10.0, max_relative = 0.03);
        assert_relative_eq!(m2, 20.0, max_relative = 0.03);
        assert!(corr > 0.6 && corr < 0.9, "corr = {corr}");
        assert_eq!(draws[0][0], 0.0);
        assert_eq!(draws[0][3], 0.0);
    }
}
