//! loglik_optimizer::types — numeric aliases and solver wiring.
//!
//! Centralizes the `ndarray` containers and `argmin` solver aliases used by
//! the L-BFGS path and by the stochastic trust-region optimizer, so the rest
//! of the crate never spells out argmin generics.
//!
//! - `Theta`/`Grad` are column vectors of the free parameters.
//! - `Cost` is the scalar minimized by argmin (`−ℓ`).
//! - `DEFAULT_LBFGS_MEM` is the L-BFGS history size unless overridden in
//!   [`LbfgsOptions`](super::LbfgsOptions).
use argmin::solver::{
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    quasinewton::LBFGS,
};
use ndarray::Array1;
use std::collections::HashMap;

/// Parameter vector `θ`.
pub type Theta = Array1<f64>;

/// Gradient vector, same shape as [`Theta`].
pub type Grad = Array1<f64>;

/// Scalar objective value.
pub type Cost = f64;

/// Function-evaluation counters reported by argmin (e.g. `"cost_count"`).
pub type FnEvalMap = HashMap<String, u64>;

/// Default history size (`m`) for L-BFGS runs.
pub const DEFAULT_LBFGS_MEM: usize = 7;

/// Hager–Zhang line search on the crate's numeric types.
pub type HagerZhangLS = HagerZhangLineSearch<Theta, Grad, Cost>;

/// More–Thuente line search on the crate's numeric types.
pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

/// L-BFGS with Hager–Zhang line search.
pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Theta, Grad, Cost>;

/// L-BFGS with More–Thuente line search.
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;
