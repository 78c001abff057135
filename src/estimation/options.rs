//! Estimator options: configuration for the moment and likelihood fits.
//!
//! Purpose
//! -------
//! Collect the knobs of the method-of-moments and Monte-Carlo maximum
//! likelihood estimators in explicit, validated structs, so that no
//! estimator state lives outside a call.
//!
//! Key behaviors
//! -------------
//! - [`MmeOptions`]: "no busyness" ceiling, dispersion significance level
//!   and optional centered smoothing window for per-period shapes.
//! - [`MleOptions`]: trust-region settings, Monte-Carlo sample count and
//!   the shape ceiling.
//! - [`SplineOptions`]: blend weight of the second-difference shape
//!   penalty.
//!
//! Conventions
//! -----------
//! - A shape at or above `max_shape` is the "no busyness" sentinel: the
//!   corresponding gamma factor is treated as the constant 1.
//! - Constructors validate; `Default` values are always valid.
use crate::{
    estimation::errors::{EstimationError, EstimationResult},
    optimization::trust_region::TrustRegionOptions,
};

/// Default ceiling for shape parameters.
pub const DEFAULT_MAX_SHAPE: f64 = 1e4;

/// Method-of-moments settings.
///
/// Fields:
/// - `max_shape`: sentinel value reported for shapes without measurable
///   over-dispersion.
/// - `dispersion_z`: with a single period, the excess variance must exceed
///   this many standard errors of the sample variance under a Poisson
///   model before it is attributed to the day factor.
/// - `smoothing_window`: odd window of the centered moving average applied
///   to inverse period shapes; `1` disables smoothing.
///
/// Default: `max_shape = 1e4`, `dispersion_z = 3`, no smoothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MmeOptions {
    pub max_shape: f64,
    pub dispersion_z: f64,
    pub smoothing_window: usize,
}

impl Default for MmeOptions {
    fn default() -> Self {
        Self { max_shape: DEFAULT_MAX_SHAPE, dispersion_z: 3.0, smoothing_window: 1 }
    }
}

impl MmeOptions {
    /// # Errors
    /// - [`EstimationError::InvalidOption`] for a non-finite or `≤ 1`
    ///   ceiling, a negative `dispersion_z` or an even window.
    pub fn new(max_shape: f64, dispersion_z: f64, smoothing_window: usize) -> EstimationResult<Self> {
        let opts = Self { max_shape, dispersion_z, smoothing_window };
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> EstimationResult<()> {
        validate_max_shape(self.max_shape)?;
        if !(self.dispersion_z.is_finite() && self.dispersion_z >= 0.0) {
            return Err(EstimationError::InvalidOption {
                name: "dispersion_z",
                value: self.dispersion_z,
                reason: "Must be finite and non-negative.",
            });
        }
        if self.smoothing_window % 2 == 0 {
            return Err(EstimationError::InvalidOption {
                name: "smoothing_window",
                value: self.smoothing_window as f64,
                reason: "Window must be odd (1 disables smoothing).",
            });
        }
        Ok(())
    }
}

/// Monte-Carlo maximum-likelihood settings.
///
/// Default: [`TrustRegionOptions::default`], 200 samples, `max_shape = 1e4`.
#[derive(Debug, Clone, PartialEq)]
pub struct MleOptions {
    pub trust_region: TrustRegionOptions,
    /// Draws of the day factor per full evaluation.
    pub n_samples: usize,
    pub max_shape: f64,
}

impl Default for MleOptions {
    fn default() -> Self {
        Self { trust_region: TrustRegionOptions::default(), n_samples: 200, max_shape: DEFAULT_MAX_SHAPE }
    }
}

impl MleOptions {
    /// # Errors
    /// - [`EstimationError::InvalidOption`] for zero samples or an invalid
    ///   ceiling.
    /// - Trust-region option errors.
    pub fn new(trust_region: TrustRegionOptions, n_samples: usize, max_shape: f64) -> EstimationResult<Self> {
        let opts = Self { trust_region, n_samples, max_shape };
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> EstimationResult<()> {
        self.trust_region.validate()?;
        if self.n_samples == 0 {
            return Err(EstimationError::InvalidOption {
                name: "n_samples",
                value: 0.0,
                reason: "At least one Monte-Carlo sample is required.",
            });
        }
        validate_max_shape(self.max_shape)
    }
}

/// Smoothing-spline settings: the objective is
/// `(1 − s)·ℓ − s·Σ (R_{p−1} − 2R_p + R_{p+1})²`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplineOptions {
    /// `s ∈ [0, 1]`.
    pub smoothing: f64,
}

impl Default for SplineOptions {
    fn default() -> Self {
        Self { smoothing: 0.1 }
    }
}

impl SplineOptions {
    /// # Errors
    /// - [`EstimationError::InvalidOption`] if `smoothing ∉ [0, 1]`.
    pub fn new(smoothing: f64) -> EstimationResult<Self> {
        if !(0.0..=1.0).contains(&smoothing) {
            return Err(EstimationError::InvalidOption {
                name: "smoothing",
                value: smoothing,
                reason: "The blend weight must lie in [0, 1].",
            });
        }
        Ok(Self { smoothing })
    }
}

fn validate_max_shape(max_shape: f64) -> EstimationResult<()> {
    if !(max_shape.is_finite() && max_shape > 1.0) {
        return Err(EstimationError::InvalidOption {
            name: "max_shape",
            value: max_shape,
            reason: "The shape ceiling must be finite and greater than 1.",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Defaults validate and each constructor rejects its documented bad
    // inputs.
    fn defaults_validate_and_bad_inputs_fail() {
        assert!(MmeOptions::default().validate().is_ok());
        assert!(MleOptions::default().validate().is_ok());
        assert!(MmeOptions::new(f64::INFINITY, 3.0, 1).is_err());
        assert!(MmeOptions::new(1e4, -1.0, 1).is_err());
        assert!(MmeOptions::new(1e4, 3.0, 2).is_err());
        assert!(MleOptions::new(TrustRegionOptions::default(), 0, 1e4).is_err());
        assert!(SplineOptions::new(1.5).is_err());
        assert!(SplineOptions::new(0.0).is_ok());
    }
}
