//! contact_arrivals — randomized contact-arrival processes and busyness
//! estimation.
//!
//! Purpose
//! -------
//! Generate arrivals of service requests ("contacts") to a queueing system
//! whose arrival rate fluctuates randomly from day to day and period to
//! period, and estimate the parameters of that fluctuation from historical
//! arrival counts.
//!
//! Key behaviors
//! -------------
//! - [`arrivals`]: period structure, busyness, rate and count models, the
//!   [`ArrivalProcess`](arrivals::ArrivalProcess) state machine and a
//!   single-process replication driver.
//! - [`estimation`]: method-of-moments and Monte-Carlo maximum-likelihood
//!   fits of the doubly-stochastic Gamma-Poisson model.
//! - [`correlation`]: negative-binomial marginals, NORTA copula
//!   correlations, positive-definiteness repair and parametric lag fits.
//! - [`optimization`]: L-BFGS and stochastic trust-region maximizers with
//!   a shared error surface.
//! - [`random`]: reproducible streams with substreams, variate generators
//!   and inverse CDFs.
//!
//! Invariants & assumptions
//! ------------------------
//! - Simulation is single-threaded; shared random streams are
//!   `Rc<RefCell<_>>` and are drawn from in event order.
//! - Latent rates are drawn once per replication, at `init`, and stay
//!   frozen until the next `init`.
//!
//! Conventions
//! -----------
//! - Periods are indexed `0..=P+1`: preliminary, `P` main periods, wrap-up.
//! - Each area has its own error enum and `…Result<T>` alias; lower-layer
//!   errors convert upward with `From`.
//! - Diagnostics go through `tracing`; the crate installs no subscriber.
//!
//! Testing notes
//! -------------
//! - Unit tests live next to the code; end-to-end scenarios are in
//!   `tests/arrival_pipeline.rs` and `tests/estimation_pipeline.rs`.

pub mod arrivals;
pub mod correlation;
pub mod estimation;
pub mod optimization;
pub mod random;

pub mod prelude {
    pub use crate::arrivals::{
        ArrivalError, ArrivalModel, ArrivalProcess, ArrivalResult, BusynessModel, ContactFactory, ContactListener,
        EventList, PeriodSchedule, Scheduler, run_replication,
    };
    pub use crate::correlation::{CopulaOptions, estimate_copula};
    pub use crate::estimation::{
        ArrivalCounts, GammaPoissonFit, MleOptions, MmeOptions, fit_gamma_poisson, method_of_moments,
    };
    pub use crate::random::{RandomStream, SharedStream};
}
