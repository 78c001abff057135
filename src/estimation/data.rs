//! Historical arrival-count containers for the Gamma-Poisson estimators.
//!
//! Purpose
//! -------
//! Hold the observations × periods matrix of arrival counts the estimators
//! consume, validate it once at the boundary and expose the sample moments
//! both estimators need.
//!
//! Invariants & assumptions
//! ------------------------
//! - At least two observations (days) and one period.
//! - Columns are main periods only; preliminary and wrap-up periods are
//!   not part of the data.
//! - Sample variances and covariances use the `n − 1` denominator.
use ndarray::{Array1, Array2};

use crate::estimation::errors::{EstimationError, EstimationResult};

/// Validated count matrix `Y[obs][period]`.
///
/// Fields
/// ------
/// - `counts`: `Array2<u64>` with one row per observation and one column per
///   main period.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrivalCounts {
    counts: Array2<u64>,
}

impl ArrivalCounts {
    /// # Errors
    /// - [`EstimationError::TooFewObservations`] for fewer than two rows.
    /// - [`EstimationError::NoPeriods`] for zero columns.
    pub fn new(counts: Array2<u64>) -> EstimationResult<Self> {
        if counts.nrows() < 2 {
            return Err(EstimationError::TooFewObservations { found: counts.nrows(), required: 2 });
        }
        if counts.ncols() == 0 {
            return Err(EstimationError::NoPeriods);
        }
        Ok(Self { counts })
    }

    /// Build from per-observation rows of equal length.
    ///
    /// # Errors
    /// - [`EstimationError::LengthMismatch`] for ragged rows.
    /// - The errors of [`ArrivalCounts::new`].
    pub fn from_rows(rows: &[Vec<u64>]) -> EstimationResult<Self> {
        let width = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != width) {
            return Err(EstimationError::LengthMismatch { what: "count row", expected: width, found: bad.len() });
        }
        let flat: Vec<u64> = rows.iter().flatten().copied().collect();
        let counts = Array2::from_shape_vec((rows.len(), width), flat)
            .map_err(|_| EstimationError::LengthMismatch { what: "count matrix", expected: rows.len() * width, found: 0 })?;
        Self::new(counts)
    }

    pub fn counts(&self) -> &Array2<u64> {
        &self.counts
    }

    pub fn n_obs(&self) -> usize {
        self.counts.nrows()
    }

    pub fn n_periods(&self) -> usize {
        self.counts.ncols()
    }

    /// Per-period sample means.
    pub fn means(&self) -> Array1<f64> {
        let n = self.n_obs() as f64;
        self.counts.columns().into_iter().map(|c| c.iter().map(|&x| x as f64).sum::<f64>() / n).collect()
    }

    /// Sample covariance matrix of the periods.
    pub fn covariance(&self) -> Array2<f64> {
        let means = self.means();
        let centered = Array2::from_shape_fn(self.counts.dim(), |(i, p)| self.counts[(i, p)] as f64 - means[p]);
        centered.t().dot(&centered) / (self.n_obs() as f64 - 1.0)
    }

    /// Daily totals.
    pub fn totals(&self) -> Vec<u64> {
        self.counts.rows().into_iter().map(|r| r.sum()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Construction validates the shape and the moments match hand
    // computations.
    fn validates_and_computes_moments() {
        assert!(matches!(
            ArrivalCounts::new(array![[1_u64, 2]]),
            Err(EstimationError::TooFewObservations { found: 1, .. })
        ));
        assert!(matches!(
            ArrivalCounts::from_rows(&[vec![1, 2], vec![3]]),
            Err(EstimationError::LengthMismatch { .. })
        ));

        let data = ArrivalCounts::from_rows(&[vec![1, 4], vec![3, 8], vec![5, 6]]).unwrap();
        let means = data.means();
        assert_relative_eq!(means[0], 3.0);
        assert_relative_eq!(means[1], 6.0);
        let cov = data.covariance();
        assert_relative_eq!(cov[(0, 0)], 4.0);
        assert_relative_eq!(cov[(1, 1)], 4.0);
        assert_relative_eq!(cov[(0, 1)], 2.0);
        assert_eq!(data.totals(), vec![5, 11, 11]);
    }
}
