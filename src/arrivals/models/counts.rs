//! Count-driven arrivals: per-period counts placed as order statistics.
use tracing::debug;

use crate::{
    arrivals::{
        core::{
            busyness::{BusynessModel, BusynessState},
            periods::PeriodOracle,
        },
        counts::{CountModel, verify_wrapup_empty},
        errors::{ArrivalError, ArrivalResult},
        models::{ArrivalModel, ModelContext, verify_period},
    },
    random::RandomStream,
};

/// Arrivals whose per-period counts are drawn at `init`.
///
/// The `n_p` arrivals of period `p` are the sorted values of `n_p`
/// uniforms on `[start_p, end_p)`. The whole day is generated at `init`;
/// `next_time` walks through it and skips times already in the past.
#[derive(Debug, Clone, PartialEq)]
pub struct CountArrivals<C: CountModel> {
    counts_model: C,
    counts: Vec<u64>,
    times: Vec<f64>,
    cursor: usize,
}

impl<C: CountModel> CountArrivals<C> {
    pub fn new(counts_model: C) -> Self {
        let counts = vec![0; counts_model.period_count()];
        Self { counts_model, counts, times: Vec::new(), cursor: 0 }
    }

    pub fn count_model(&self) -> &C {
        &self.counts_model
    }

    /// Counts of the current replication.
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// Arrival times not yet emitted.
    pub fn remaining_times(&self) -> &[f64] {
        &self.times[self.cursor..]
    }

    /// Replace the drawn counts and regenerate the arrival times.
    ///
    /// # Errors
    /// - [`ArrivalError::LengthMismatch`] if `counts` does not cover every
    ///   period.
    /// - [`ArrivalError::IllegalState`] for a non-zero wrap-up count.
    pub fn force_counts(&mut self, counts: Vec<u64>, periods: &dyn PeriodOracle, stream: &mut RandomStream) -> ArrivalResult<()> {
        if counts.len() != periods.period_count() {
            return Err(ArrivalError::LengthMismatch {
                what: "count vector vs. periods",
                expected: periods.period_count(),
                found: counts.len(),
            });
        }
        verify_wrapup_empty(&counts)?;
        self.times = order_statistics(&counts, periods, stream);
        self.counts = counts;
        self.cursor = 0;
        Ok(())
    }
}

/// Sorted uniform times within each period.
fn order_statistics(counts: &[u64], periods: &dyn PeriodOracle, stream: &mut RandomStream) -> Vec<f64> {
    let total = counts.iter().sum::<u64>() as usize;
    let mut times = Vec::with_capacity(total);
    for (p, &n) in counts.iter().enumerate() {
        let (start, end) = (periods.period_start(p), periods.period_end(p));
        let first = times.len();
        for _ in 0..n {
            times.push(stream.uniform_in(start, end));
        }
        times[first..].sort_by(f64::total_cmp);
    }
    times
}

impl<C: CountModel> ArrivalModel for CountArrivals<C> {
    fn name(&self) -> &'static str {
        self.counts_model.name()
    }

    fn init(&mut self, ctx: &mut ModelContext<'_>) -> ArrivalResult<()> {
        let counts = self.counts_model.draw_counts(ctx.busyness, ctx.stream)?;
        debug!(model = self.name(), total = counts.iter().sum::<u64>(), "counts drawn");
        self.force_counts(counts, ctx.periods, ctx.stream)
    }

    fn next_time(&mut self, ctx: &mut ModelContext<'_>) -> ArrivalResult<f64> {
        while let Some(&t) = self.times.get(self.cursor) {
            self.cursor += 1;
            if t >= ctx.now {
                return Ok(t - ctx.now);
            }
        }
        Ok(f64::INFINITY)
    }

    fn arrival_rate(&self, periods: &dyn PeriodOracle, _busyness: &BusynessState, p: usize) -> ArrivalResult<f64> {
        verify_period(periods, p)?;
        Ok(per_unit_time(self.counts.get(p).map_or(0.0, |&c| c as f64), periods.period_duration(p)))
    }

    fn expected_arrival_rate(&self, periods: &dyn PeriodOracle, busyness: &BusynessModel, p: usize) -> ArrivalResult<f64> {
        verify_period(periods, p)?;
        Ok(per_unit_time(self.counts_model.expected_count(busyness, p), periods.period_duration(p)))
    }
}

fn per_unit_time(count: f64, duration: f64) -> f64 {
    if count == 0.0 || !duration.is_finite() || duration <= 0.0 {
        return 0.0;
    }
    count / duration
}
