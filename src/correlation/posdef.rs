//! Positive-definiteness repair of estimated correlation matrices.
//!
//! Purpose
//! -------
//! Pairwise-fitted copula correlations need not form a positive-definite
//! matrix, which the Cholesky factorization of the copula requires. This
//! module pushes such a matrix back into the set of valid correlation
//! matrices while moving it as little as practical.
//!
//! Key behaviors
//! -------------
//! - **Eigen floor** (repeated up to `max_iter` times): raise every
//!   eigenvalue below `ε` to `ε`, reconstruct `V Λ Vᵀ`, rescale to a unit
//!   diagonal `D^(−1/2) R D^(−1/2)`. Stops as soon as the smallest
//!   eigenvalue reaches `min_eigenvalue`.
//! - **Diagonal loading** (fallback): `(R − λ_min I + ε I) / (1 − λ_min + ε)`.
//! - The method actually used is reported in [`PosDefCorrection::method`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Input is square, finite and (up to rounding) symmetric; it is
//!   symmetrized before decomposition.
//! - Output is symmetric, has a unit diagonal and entries in `[−1, 1]`,
//!   and is positive definite.
//! - A matrix whose smallest eigenvalue already reaches `min_eigenvalue`
//!   is returned unchanged (diagonal reset to exactly 1).
//!
//! Testing notes
//! -------------
//! - Property tests feed random symmetric matrices with unit diagonal
//!   and check the output invariants.
use nalgebra::{DMatrix, SymmetricEigen};
use ndarray::Array2;
use tracing::{debug, warn};

use crate::correlation::errors::{CorrelationError, CorrelationResult};

/// Repair options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PosDefOptions {
    /// Eigenvalue floor `ε`.
    pub epsilon: f64,
    /// Smallest eigenvalue accepted in the result.
    pub min_eigenvalue: f64,
    pub max_iter: usize,
}

impl Default for PosDefOptions {
    fn default() -> Self {
        Self { epsilon: 1e-4, min_eigenvalue: 1e-8, max_iter: 50 }
    }
}

impl PosDefOptions {
    /// # Errors
    /// - [`CorrelationError::InvalidOption`] unless
    ///   `0 < min_eigenvalue ≤ epsilon < 1` and `max_iter ≥ 1`.
    pub fn new(epsilon: f64, min_eigenvalue: f64, max_iter: usize) -> CorrelationResult<Self> {
        let opts = Self { epsilon, min_eigenvalue, max_iter };
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> CorrelationResult<()> {
        if !(self.epsilon > 0.0 && self.epsilon < 1.0) {
            return Err(CorrelationError::InvalidOption {
                name: "epsilon",
                value: self.epsilon,
                reason: "Eigenvalue floor must lie in (0, 1).",
            });
        }
        if !(self.min_eigenvalue > 0.0 && self.min_eigenvalue <= self.epsilon) {
            return Err(CorrelationError::InvalidOption {
                name: "min_eigenvalue",
                value: self.min_eigenvalue,
                reason: "Must be strictly positive and not exceed epsilon.",
            });
        }
        if self.max_iter == 0 {
            return Err(CorrelationError::InvalidOption { name: "max_iter", value: 0.0, reason: "Must be at least 1." });
        }
        Ok(())
    }
}

/// Repair method that produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrectionMethod {
    /// The input was already positive definite.
    Unchanged,
    /// Iterated eigenvalue flooring.
    EigenFloor,
    /// Diagonal loading after the eigen floor ran out of iterations.
    DiagonalLoading,
}

/// Result of [`correct_positive_definite`].
#[derive(Debug, Clone, PartialEq)]
pub struct PosDefCorrection {
    pub matrix: Array2<f64>,
    /// Eigen-floor iterations performed.
    pub iterations: usize,
    pub method: CorrectionMethod,
    /// Smallest eigenvalue of the (symmetrized) input.
    pub input_min_eigenvalue: f64,
    /// Smallest eigenvalue of the output.
    pub min_eigenvalue: f64,
}

/// Repair `matrix` into a positive-definite correlation matrix.
///
/// # Errors
/// - [`CorrelationError::InvalidMatrix`] for empty, non-square or
///   non-finite input.
/// - Invalid options.
pub fn correct_positive_definite(matrix: &Array2<f64>, opts: &PosDefOptions) -> CorrelationResult<PosDefCorrection> {
    opts.validate()?;
    let (n, m) = matrix.dim();
    if n != m || n == 0 {
        return Err(CorrelationError::InvalidMatrix { reason: "Matrix must be square and non-empty." });
    }
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(CorrelationError::InvalidMatrix { reason: "Entries must be finite." });
    }
    let mut r = DMatrix::from_fn(n, n, |i, j| 0.5 * (matrix[[i, j]] + matrix[[j, i]]));
    set_unit_diagonal(&mut r);
    let input_min = min_eigenvalue(&r);
    if input_min >= opts.min_eigenvalue {
        return Ok(finish(r, 0, CorrectionMethod::Unchanged, input_min));
    }

    for k in 1..=opts.max_iter {
        let eig = SymmetricEigen::new(r.clone());
        let floored = eig.eigenvalues.map(|l| l.max(opts.epsilon));
        let rebuilt = &eig.eigenvectors * DMatrix::from_diagonal(&floored) * eig.eigenvectors.transpose();
        r = rescale_to_unit_diagonal(&rebuilt);
        let lmin = min_eigenvalue(&r);
        if lmin >= opts.min_eigenvalue {
            debug!(iterations = k, input_min, lmin, "correlation matrix repaired by eigenvalue flooring");
            return Ok(finish(r, k, CorrectionMethod::EigenFloor, input_min));
        }
    }

    let lmin = min_eigenvalue(&r);
    warn!(input_min, lmin, "eigenvalue flooring did not converge; falling back to diagonal loading");
    let scale = 1.0 - lmin + opts.epsilon;
    let mut loaded = r.map(|v| v / scale);
    for i in 0..n {
        loaded[(i, i)] = 1.0;
    }
    Ok(finish(loaded, opts.max_iter, CorrectionMethod::DiagonalLoading, input_min))
}

fn finish(mut r: DMatrix<f64>, iterations: usize, method: CorrectionMethod, input_min: f64) -> PosDefCorrection {
    let n = r.nrows();
    for i in 0..n {
        for j in 0..i {
            let v = (0.5 * (r[(i, j)] + r[(j, i)])).clamp(-1.0, 1.0);
            r[(i, j)] = v;
            r[(j, i)] = v;
        }
    }
    set_unit_diagonal(&mut r);
    let min = min_eigenvalue(&r);
    PosDefCorrection {
        matrix: Array2::from_shape_fn((n, n), |(i, j)| r[(i, j)]),
        iterations,
        method,
        input_min_eigenvalue: input_min,
        min_eigenvalue: min,
    }
}

fn set_unit_diagonal(r: &mut DMatrix<f64>) {
    for i in 0..r.nrows() {
        r[(i, i)] = 1.0;
    }
}

fn rescale_to_unit_diagonal(r: &DMatrix<f64>) -> DMatrix<f64> {
    let d: Vec<f64> = (0..r.nrows()).map(|i| r[(i, i)].sqrt()).collect();
    DMatrix::from_fn(r.nrows(), r.ncols(), |i, j| r[(i, j)] / (d[i] * d[j]))
}

fn min_eigenvalue(r: &DMatrix<f64>) -> f64 {
    SymmetricEigen::new(r.clone()).eigenvalues.iter().copied().fold(f64::INFINITY, f64::min)
}
