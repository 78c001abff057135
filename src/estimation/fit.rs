//! Fitted Gamma-Poisson parameters and their conversion to arrival models.
use crate::{
    arrivals::{
        core::busyness::BusynessModel,
        errors::ArrivalResult,
        rates::PoissonGammaRates,
    },
    optimization::trust_region::TrustRegionOutcome,
};

/// Parameters of the doubly-stochastic Gamma-Poisson model.
///
/// Counts of period `p` on a day are `Poisson(λ_p · b · ξ_p)` with day
/// factor `b ~ Gamma(Q, Q)` and period factors `ξ_p ~ Gamma(R_p, R_p)`.
/// Shapes at the ceiling are sentinels for "no busyness" and are flagged.
#[derive(Debug, Clone, PartialEq)]
pub struct GammaPoissonFit {
    /// `λ_p` for every main period.
    pub rates: Vec<f64>,
    /// `R_p` for every main period (all equal for a common shape).
    pub period_shapes: Vec<f64>,
    /// `Q`.
    pub daily_shape: f64,
    /// `Q` sits at the ceiling.
    pub daily_unbounded: bool,
    /// `R_p` sits at the ceiling.
    pub unbounded_periods: Vec<bool>,
    /// Monte-Carlo log-likelihood at the estimate (likelihood fits only).
    pub log_likelihood: Option<f64>,
    /// Trust-region diagnostics (likelihood fits only).
    pub outcome: Option<TrustRegionOutcome>,
}

impl GammaPoissonFit {
    pub fn n_periods(&self) -> usize {
        self.rates.len()
    }

    /// `true` if any shape was reported at the ceiling.
    pub fn is_degenerate(&self) -> bool {
        self.daily_unbounded || self.unbounded_periods.iter().any(|&u| u)
    }

    /// Rate model drawing `λ_p · Gamma(R_p, R_p)`; ceiling shapes become
    /// deterministic factors.
    ///
    /// # Errors
    /// - Validation errors of [`PoissonGammaRates::new`].
    pub fn rate_model(&self) -> ArrivalResult<PoissonGammaRates> {
        let shapes = self
            .period_shapes
            .iter()
            .zip(&self.unbounded_periods)
            .map(|(&r, &unbounded)| if unbounded { f64::INFINITY } else { r })
            .collect();
        PoissonGammaRates::new(self.rates.clone(), shapes)
    }

    /// Day busyness `Gamma(Q, Q)`, or the constant 1 at the ceiling.
    ///
    /// # Errors
    /// - Validation errors of the busyness constructors.
    pub fn busyness_model(&self) -> ArrivalResult<BusynessModel> {
        if self.daily_unbounded { BusynessModel::fixed(1.0) } else { BusynessModel::gamma(self.daily_shape) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrivals::rates::RateModel;
    use approx::assert_relative_eq;

    #[test]
    // Purpose
    // -------
    // Ceiling shapes map to deterministic factors in the converted models.
    fn converts_to_arrival_models() {
        let fit = GammaPoissonFit {
            rates: vec![10.0, 20.0],
            period_shapes: vec![1e4, 3.0],
            daily_shape: 1e4,
            daily_unbounded: true,
            unbounded_periods: vec![true, false],
            log_likelihood: None,
            outcome: None,
        };
        assert!(fit.is_degenerate());
        let rates = fit.rate_model().unwrap();
        assert_eq!(rates.shapes()[0], f64::INFINITY);
        assert_relative_eq!(rates.expected_rate(2), 20.0);
        assert_relative_eq!(fit.busyness_model().unwrap().expected_day(), 1.0);
    }
}
