//! counts — per-period arrival-count models.
//!
//! Purpose
//! -------
//! A [`CountModel`] draws, once per replication, the number of arrivals in
//! every period. The count-driven arrival model then places that many
//! arrivals uniformly (as order statistics) inside each period.
//!
//! Key behaviors
//! -------------
//! - [`FixedCounts`]: deterministic counts.
//! - [`DirichletCounts`]: total `a · B` split by `q ~ Dirichlet(α)` and
//!   rounded per period.
//! - [`DirichletCompoundCounts`]: `Multinomial(round(a · B), q)` with
//!   `q ~ Dirichlet(α)`.
//! - [`NegativeBinomialNortaCounts`]: correlated negative-binomial counts
//!   through a Gaussian copula, means scaled by `B · B_p`.
//!
//! Invariants & assumptions
//! ------------------------
//! - `draw_counts` returns `period_count()` values and the wrap-up count is
//!   always 0; a configuration or forced vector violating this is an
//!   illegal-state error.
//! - Randomized models are parameterized over main periods; the
//!   preliminary count is 0 for them.

pub mod dirichlet;
pub mod fixed;
pub mod negbin_norta;

pub use self::dirichlet::{
    DirichletCompoundCounts, DirichletCounts, DirichletFit, DirichletMultinomialLikelihood, fit_dirichlet_multinomial,
};
pub use self::fixed::FixedCounts;
pub use self::negbin_norta::{NegativeBinomialNortaCounts, NegBinNortaOptions};

use crate::{
    arrivals::{
        core::busyness::{BusynessModel, BusynessState},
        errors::{ArrivalError, ArrivalResult},
    },
    random::RandomStream,
};

/// Per-replication arrival-count generator.
pub trait CountModel {
    /// Short label used in error messages and logs.
    fn name(&self) -> &'static str;

    /// Number of periods covered, preliminary and wrap-up included.
    fn period_count(&self) -> usize;

    /// Draw the counts of a new replication under `busyness`.
    fn draw_counts(&mut self, busyness: &BusynessState, stream: &mut RandomStream) -> ArrivalResult<Vec<u64>>;

    /// Expected count in period `p` under the busyness distribution.
    fn expected_count(&self, busyness: &BusynessModel, p: usize) -> f64;
}

/// Reject count vectors with arrivals in the wrap-up period.
pub(crate) fn verify_wrapup_empty(counts: &[u64]) -> ArrivalResult<()> {
    match counts.last() {
        Some(&c) if c > 0 => Err(ArrivalError::illegal("Count-based arrivals cannot occur in the wrap-up period.")),
        _ => Ok(()),
    }
}

/// Pad main-period counts with zero preliminary and wrap-up entries.
pub(crate) fn embed_main_counts(main: &[u64]) -> Vec<u64> {
    let mut full = Vec::with_capacity(main.len() + 2);
    full.push(0);
    full.extend_from_slice(main);
    full.push(0);
    full
}
