//! arrivals — randomized contact-arrival processes.
//!
//! Purpose
//! -------
//! Generate the arrival times of contacts to a queueing system whose rate
//! fluctuates from day to day and period to period. A replication draws a
//! busyness state and the latent rates (or counts) of its model once at
//! `init`, then generates arrivals on an external scheduler until it is
//! stopped or the model suspends.
//!
//! Key behaviors
//! -------------
//! - [`core`]: period oracle, busyness, scheduler interface, contacts and
//!   listeners.
//! - [`rates`] and [`counts`]: latent rate-vector and count-vector models
//!   (fixed, Poisson-Gamma, NORTA, Dirichlet, negative-binomial NORTA).
//! - [`models`]: inter-arrival strategies built on those (piecewise
//!   constant, count-driven order statistics, thinning, inversion).
//! - [`process`]: the [`ArrivalProcess`] state machine.
//! - [`replication`]: a single-process driver on the reference
//!   [`EventList`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Periods are indexed `0..=P+1`: a preliminary period, `P` main
//!   periods and an unbounded wrap-up period.
//! - The active rate in period `p` is the base rate times `B · B_p`.
//! - Count-driven models never generate arrivals in the wrap-up period.
//!
//! Conventions
//! -----------
//! - Configuration errors are raised at construction, state errors at the
//!   offending call, and unsupported rate queries as
//!   [`ArrivalError::Unsupported`].

pub mod core;
pub mod counts;
pub mod errors;
pub mod models;
pub mod process;
pub mod rates;
pub mod replication;

pub use self::core::{
    BusynessModel, BusynessState, CarryOver, Contact, ContactBuilder, ContactFactory, ContactListener, DayBusyness,
    EventId, EventList, ListenerHandle, ListenerRegistry, PeriodOracle, PeriodSchedule, ProcessId, Scheduler,
    SimpleContactFactory,
};
pub use self::counts::CountModel;
pub use self::errors::{ArrivalError, ArrivalResult};
pub use self::models::{ArrivalModel, ModelContext, PeriodTransition};
pub use self::process::{ArrivalProcess, ProcessStatus};
pub use self::rates::RateModel;
pub use self::replication::{Replication, run_replication};
