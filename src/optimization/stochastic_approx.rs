//! Robbins–Monro annealing gains.
//!
//! Both the trust-region ascent and the NORTA correlation search damp their
//! updates by `η · k^(−pwr)` at iteration `k ≥ 1`, which averages out the
//! Monte-Carlo noise in their step directions.
use crate::optimization::errors::{OptError, OptResult};

/// Annealed gain sequence `a_k = η · k^(−pwr)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnealingGain {
    pub eta: f64,
    pub pwr: f64,
}

impl AnnealingGain {
    /// Validated gain.
    ///
    /// # Errors
    /// - [`OptError::InvalidTrustRegionOption`] if `eta` is not in `(0, 1]`
    ///   or `pwr` is negative or non-finite.
    pub fn new(eta: f64, pwr: f64) -> OptResult<Self> {
        if !(eta > 0.0 && eta <= 1.0) {
            return Err(OptError::InvalidTrustRegionOption {
                name: "eta",
                value: eta,
                reason: "Noise attenuator must lie in (0, 1].",
            });
        }
        if !pwr.is_finite() || pwr < 0.0 {
            return Err(OptError::InvalidTrustRegionOption {
                name: "pwr",
                value: pwr,
                reason: "Annealing exponent must be finite and non-negative.",
            });
        }
        Ok(Self { eta, pwr })
    }

    /// Gain at iteration `k` (1-based; `k = 0` is treated as 1).
    pub fn at(&self, k: usize) -> f64 {
        self.eta * (k.max(1) as f64).powf(-self.pwr)
    }
}

impl Default for AnnealingGain {
    fn default() -> Self {
        Self { eta: 0.5, pwr: 0.6 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    // Purpose
    // -------
    // The gain starts at η, decays as k^(−pwr) and validates its inputs.
    fn gain_decays_and_validates() {
        let g = AnnealingGain::new(0.5, 0.6).unwrap();
        assert_relative_eq!(g.at(1), 0.5);
        assert_relative_eq!(g.at(0), 0.5);
        assert_relative_eq!(g.at(10), 0.5 * 10f64.powf(-0.6));
        assert!(g.at(100) < g.at(10));
        assert!(AnnealingGain::new(0.0, 0.6).is_err());
        assert!(AnnealingGain::new(1.5, 0.6).is_err());
        assert!(AnnealingGain::new(0.5, -1.0).is_err());
    }
}
