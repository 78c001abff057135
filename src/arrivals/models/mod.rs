//! models — inter-arrival strategies plugged into an arrival process.
//!
//! Purpose
//! -------
//! An [`ArrivalModel`] answers one question for the owning
//! [`ArrivalProcess`](crate::arrivals::process::ArrivalProcess): how long
//! until the next arrival? It owns its latent per-replication state (rates
//! or counts drawn at `init`) but never busyness, the clock or the random
//! stream; those arrive through a [`ModelContext`] on every call.
//!
//! Key behaviors
//! -------------
//! - [`PiecewiseConstantArrivals`]: exponential gaps at rate
//!   `λ̃_p · B · B_p`, with memoryless rescaling at period boundaries.
//! - [`CountArrivals`]: per-period counts placed as uniform order
//!   statistics.
//! - [`ThinningArrivals`]: homogeneous candidates thinned by
//!   `λ(t)/λ̄`.
//! - [`InversionArrivals`]: unit-rate increments mapped through `Λ⁻¹`.
//! - [`IntervalRates`]: piecewise rates over arbitrary breakpoints, a
//!   rate function and cumulative rate for the two previous models.
//!
//! Conventions
//! -----------
//! - `next_time` returns a delay relative to `ctx.now`; `+∞` means "no
//!   further arrival until the next `init`" (or the next period change for
//!   models that react to one).
//! - Rate queries that a model cannot answer return
//!   [`ArrivalError::Unsupported`], never a silent 0.

pub mod counts;
pub mod intervals;
pub mod inversion;
pub mod piecewise;
pub mod thinning;

pub use self::counts::CountArrivals;
pub use self::intervals::IntervalRates;
pub use self::inversion::{CumulativeRate, InversionArrivals};
pub use self::piecewise::PiecewiseConstantArrivals;
pub use self::thinning::{RateFunction, ThinningArrivals};

use crate::{
    arrivals::{
        core::{
            busyness::{BusynessModel, BusynessState},
            periods::PeriodOracle,
        },
        errors::{ArrivalError, ArrivalResult},
    },
    random::RandomStream,
};

/// Everything a model may read or consume during one call.
pub struct ModelContext<'a> {
    /// Current simulation time.
    pub now: f64,
    pub periods: &'a dyn PeriodOracle,
    pub busyness: &'a BusynessState,
    pub stream: &'a mut RandomStream,
}

impl ModelContext<'_> {
    /// Period containing `now`.
    pub fn current_period(&self) -> usize {
        self.periods.period_of(self.now)
    }
}

/// What the process must do with its pending event after a period change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PeriodTransition {
    /// Keep the pending event.
    Unchanged,
    /// Multiply the residual delay of the pending event by the factor.
    Rescale(f64),
    /// Cancel any pending event and ask `next_time` again.
    Resample,
    /// Cancel the pending event and wait for a later transition.
    Suspend,
}

/// Inter-arrival strategy.
pub trait ArrivalModel {
    /// Short label used in error messages and logs.
    fn name(&self) -> &'static str;

    /// Draw the latent state of a new replication.
    fn init(&mut self, ctx: &mut ModelContext<'_>) -> ArrivalResult<()>;

    /// Delay until the next arrival, or `+∞`.
    fn next_time(&mut self, ctx: &mut ModelContext<'_>) -> ArrivalResult<f64>;

    /// React to the transition from period `old` to `new` at `ctx.now`.
    fn period_changed(&mut self, _ctx: &mut ModelContext<'_>, _old: usize, _new: usize) -> ArrivalResult<PeriodTransition> {
        Ok(PeriodTransition::Unchanged)
    }

    /// First delay of a stationary start; requires a locked period oracle.
    fn start_stationary(&mut self, _ctx: &mut ModelContext<'_>) -> ArrivalResult<f64> {
        Err(ArrivalError::unsupported(self.name(), "Stationary starts are not supported."))
    }

    /// Realized rate in period `p` for the current replication.
    fn arrival_rate(&self, periods: &dyn PeriodOracle, busyness: &BusynessState, p: usize) -> ArrivalResult<f64>;

    /// Mean rate in period `p` over replications.
    fn expected_arrival_rate(&self, periods: &dyn PeriodOracle, busyness: &BusynessModel, p: usize) -> ArrivalResult<f64>;
}

/// Shared guard for stationary starts.
pub(crate) fn require_locked(ctx: &ModelContext<'_>, model: &'static str) -> ArrivalResult<usize> {
    ctx.periods
        .locked_period()
        .ok_or_else(|| ArrivalError::unsupported(model, "Stationary starts require a period oracle locked to one period."))
}

pub(crate) fn verify_period(periods: &dyn PeriodOracle, p: usize) -> ArrivalResult<()> {
    if p >= periods.period_count() {
        return Err(ArrivalError::InvalidPeriods { index: p, reason: "Period index out of range." });
    }
    Ok(())
}
