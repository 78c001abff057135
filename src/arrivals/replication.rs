//! Single-process replication driver.
//!
//! Runs one arrival process on an [`EventList`] from time 0 to a horizon,
//! pushing period boundaries into the process before any arrival at the
//! same instant. Intended for tests, demos and quick Monte-Carlo checks;
//! a full simulator owns its own event loop and calls
//! [`ArrivalProcess::on_period_change`] and [`ArrivalProcess::fire`]
//! itself.
use tracing::debug;

use crate::arrivals::{
    core::scheduler::{EventList, Scheduler},
    errors::{ArrivalError, ArrivalResult},
    models::ArrivalModel,
    process::ArrivalProcess,
};

/// Outcome of one replication.
#[derive(Debug, Clone, PartialEq)]
pub struct Replication {
    /// Arrivals per period, indexed like the periods.
    pub counts: Vec<u64>,
    /// Arrival times in firing order.
    pub times: Vec<f64>,
    /// Clock value when the replication ended.
    pub end_time: f64,
}

impl Replication {
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Reset `events`, `init` and `start` the process, and run it to `horizon`.
///
/// The process is stopped before returning.
///
/// # Errors
/// - [`ArrivalError::InvalidParameter`] for a negative or NaN horizon.
/// - Any error raised by the process.
pub fn run_replication<M: ArrivalModel>(process: &mut ArrivalProcess<M>, events: &mut EventList, horizon: f64) -> ArrivalResult<Replication> {
    if horizon.is_nan() || horizon < 0.0 {
        return Err(ArrivalError::InvalidParameter {
            name: "replication horizon",
            value: horizon,
            reason: "The horizon must be non-negative (+inf allowed).",
        });
    }
    events.reset();
    process.init(events)?;
    process.start(events)?;

    let period_count = process.periods().period_count();
    let locked = process.periods().is_locked();
    // Boundary k opens period k + 1.
    let boundaries: Vec<(f64, usize)> = (1..period_count)
        .map(|p| (process.periods().period_start(p), p))
        .filter(|&(t, _)| !locked && t > events.now())
        .collect();
    let mut next_boundary = boundaries.iter().peekable();
    let mut counts = vec![0u64; period_count];
    let mut times = Vec::new();

    loop {
        let event_time = events.peek_time().unwrap_or(f64::INFINITY);
        match next_boundary.peek() {
            Some(&&(t, p)) if t <= event_time && t <= horizon => {
                events.advance_to(t);
                process.on_period_change(events, p)?;
                next_boundary.next();
            }
            _ if event_time <= horizon => {
                let Some((t, id)) = events.pop() else { break };
                process.fire(events, id)?;
                let p = process.periods().period_of(t);
                if let Some(c) = counts.get_mut(p) {
                    *c += 1;
                }
                times.push(t);
            }
            _ => break,
        }
    }

    let end_time = if horizon.is_finite() { horizon.max(events.now()) } else { events.now() };
    if process.is_started() {
        process.stop(events)?;
    }
    debug!(process = process.id().0, total = times.len(), end_time, "replication finished");
    Ok(Replication { counts, times, end_time })
}
