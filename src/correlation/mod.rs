//! correlation — marginal fits, copula correlation and matrix repair.
//!
//! Purpose
//! -------
//! Estimate the dependence between per-period arrival counts for the
//! NORTA-based arrival models, starting from historical counts
//! (observations × main periods).
//!
//! Key behaviors
//! -------------
//! - [`negbin`]: negative-binomial marginal per period by bisection on the
//!   profile score, with a Poisson sentinel for non-over-dispersed data.
//! - [`spearman`]: rank correlations with average ranks for ties.
//! - [`norta_fit`]: normal-scale copula correlations matched to empirical
//!   Spearman correlations by Robbins–Monro root finding.
//! - [`posdef`]: eigenvalue-floor repair with diagonal-loading fallback.
//! - [`parametric`]: Markov and general-linear lag-correlation fits.
//! - [`estimate_copula`]: the marginals → NORTA → repair pipeline in one
//!   call.
//!
//! Conventions
//! -----------
//! - Matrices are `ndarray::Array2<f64>`; decompositions go through
//!   `nalgebra`.
//! - Degenerate situations (constant periods, failed flooring) are handled
//!   locally, flagged in the results and logged with `tracing::warn!`.

pub mod errors;
pub mod negbin;
pub mod norta_fit;
pub mod parametric;
pub mod posdef;
pub mod spearman;

pub use self::errors::{CorrelationError, CorrelationResult};
pub use self::negbin::{NegBinFit, NegBinOptions, fit_negative_binomial};
pub use self::norta_fit::{NortaFit, NortaFitOptions, fit_norta_correlation};
pub use self::parametric::{ParametricFit, ParametricFitOptions, ParametricKind, fit_linear, fit_markov};
pub use self::posdef::{CorrectionMethod, PosDefCorrection, PosDefOptions, correct_positive_definite};
pub use self::spearman::{average_ranks, spearman, spearman_matrix};

use ndarray::Array2;

/// Options of the full copula pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CopulaOptions {
    pub negbin: NegBinOptions,
    pub norta: NortaFitOptions,
    pub posdef: PosDefOptions,
}

/// Output of [`estimate_copula`].
#[derive(Debug, Clone, PartialEq)]
pub struct CopulaEstimate {
    /// One marginal per period.
    pub marginals: Vec<NegBinFit>,
    /// Raw pairwise NORTA fit.
    pub norta: NortaFit,
    /// Repaired correlation matrix, ready for a Cholesky factorization.
    pub correction: PosDefCorrection,
}

/// Fit marginals, the NORTA correlation and repair it.
///
/// # Errors
/// - [`CorrelationError::EmptySample`] for fewer than two observations.
/// - Errors of the individual stages.
pub fn estimate_copula(counts: &Array2<u64>, opts: &CopulaOptions) -> CorrelationResult<CopulaEstimate> {
    let marginals = counts
        .columns()
        .into_iter()
        .map(|c| fit_negative_binomial(&c.to_vec(), &opts.negbin))
        .collect::<CorrelationResult<Vec<_>>>()?;
    let norta = fit_norta_correlation(counts, &marginals, &opts.norta)?;
    let correction = correct_positive_definite(&norta.correlation, &opts.posdef)?;
    Ok(CopulaEstimate { marginals, norta, correction })
}
