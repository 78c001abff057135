//! loglik_optimizer — deterministic log-likelihood maximization via L-BFGS.
//!
//! Used where the likelihood has a closed form (the Dirichlet-multinomial
//! fit behind the Dirichlet count models). Models implement
//! [`LogLikelihood`]; [`maximize`] wraps them in an argmin problem, builds
//! an L-BFGS solver with the configured line search and returns an
//! [`OptimOutcome`] in log-likelihood space.
//!
//! The Monte-Carlo likelihood of the gamma-Poisson model is *not* fitted
//! here; its noisy derivatives go through
//! [`trust_region`](crate::optimization::trust_region).

pub mod adapter;
pub mod api;
pub mod builders;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

pub use self::api::maximize;
pub use self::traits::{LbfgsOptions, LineSearcher, LogLikelihood, OptimOutcome, Tolerances};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};
