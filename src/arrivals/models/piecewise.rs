//! Piecewise-constant Poisson arrivals driven by a [`RateModel`].
use tracing::trace;

use crate::{
    arrivals::{
        core::{
            busyness::{BusynessModel, BusynessState},
            periods::PeriodOracle,
        },
        errors::{ArrivalError, ArrivalResult},
        models::{ArrivalModel, ModelContext, PeriodTransition, require_locked, verify_period},
        rates::RateModel,
    },
    random::variates::exponential,
};

/// Exponential inter-arrival times at the active rate `λ̃_p · B · B_p`.
///
/// The latent rates `λ̃` are drawn from the rate model at `init`. Until the
/// first `init` they hold the model's expected rates.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseConstantArrivals<R: RateModel> {
    rates: R,
    latent: Vec<f64>,
}

impl<R: RateModel> PiecewiseConstantArrivals<R> {
    pub fn new(rates: R) -> Self {
        let latent = (0..rates.period_count()).map(|p| rates.expected_rate(p)).collect();
        Self { rates, latent }
    }

    pub fn rate_model(&self) -> &R {
        &self.rates
    }

    /// Base rates of the current replication.
    pub fn latent_rates(&self) -> &[f64] {
        &self.latent
    }

    fn active_rate(&self, busyness: &BusynessState, p: usize) -> f64 {
        self.latent.get(p).copied().unwrap_or(0.0) * busyness.effective(p)
    }
}

impl<R: RateModel> ArrivalModel for PiecewiseConstantArrivals<R> {
    fn name(&self) -> &'static str {
        self.rates.name()
    }

    fn init(&mut self, ctx: &mut ModelContext<'_>) -> ArrivalResult<()> {
        let latent = self.rates.draw(ctx.stream)?;
        if latent.len() != ctx.periods.period_count() {
            return Err(ArrivalError::LengthMismatch {
                what: "rate vector vs. periods",
                expected: ctx.periods.period_count(),
                found: latent.len(),
            });
        }
        self.latent = latent;
        Ok(())
    }

    fn next_time(&mut self, ctx: &mut ModelContext<'_>) -> ArrivalResult<f64> {
        let rate = self.active_rate(ctx.busyness, ctx.current_period());
        if rate <= 0.0 {
            return Ok(f64::INFINITY);
        }
        Ok(exponential(ctx.stream, rate)?)
    }

    fn period_changed(&mut self, ctx: &mut ModelContext<'_>, old: usize, new: usize) -> ArrivalResult<PeriodTransition> {
        let old_rate = self.active_rate(ctx.busyness, old);
        let new_rate = self.active_rate(ctx.busyness, new);
        trace!(old, new, old_rate, new_rate, "rate change at period boundary");
        Ok(if new_rate <= 0.0 {
            PeriodTransition::Suspend
        } else if old_rate <= 0.0 {
            PeriodTransition::Resample
        } else if old_rate == new_rate {
            PeriodTransition::Unchanged
        } else {
            PeriodTransition::Rescale(old_rate / new_rate)
        })
    }

    fn start_stationary(&mut self, ctx: &mut ModelContext<'_>) -> ArrivalResult<f64> {
        require_locked(ctx, self.name())?;
        self.next_time(ctx)
    }

    fn arrival_rate(&self, periods: &dyn PeriodOracle, busyness: &BusynessState, p: usize) -> ArrivalResult<f64> {
        verify_period(periods, p)?;
        Ok(self.active_rate(busyness, p))
    }

    fn expected_arrival_rate(&self, periods: &dyn PeriodOracle, busyness: &BusynessModel, p: usize) -> ArrivalResult<f64> {
        verify_period(periods, p)?;
        Ok(self.rates.expected_rate(p) * busyness.expected_effective(p))
    }
}
