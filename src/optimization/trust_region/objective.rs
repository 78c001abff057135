//! Objective interface consumed by the stochastic trust-region ascent.
use crate::{
    optimization::{
        errors::OptResult,
        loglik_optimizer::{Grad, Theta},
    },
    random::RandomStream,
};

/// Value and first/diagonal-second derivatives from one set of draws.
#[derive(Debug, Clone, PartialEq)]
pub struct StochasticEvaluation {
    pub value: f64,
    pub grad: Grad,
    pub hess_diag: Grad,
}

/// Objective estimated by Monte Carlo.
///
/// Parameters are partitioned into groups, each with its own step
/// regulator. `group_of(i) == None` holds component `i` fixed.
pub trait StochasticObjective {
    /// Number of parameters.
    fn dim(&self) -> usize;

    /// Number of regulator groups.
    fn group_count(&self) -> usize;

    /// Group of component `index`, or `None` if it is held fixed.
    fn group_of(&self, index: usize) -> Option<usize>;

    /// Upper bound of component `index`; proposals above it are clamped.
    fn upper_bound(&self, _index: usize) -> f64 {
        f64::INFINITY
    }

    /// Draw fresh samples at `theta` and estimate value and derivatives.
    fn evaluate(&mut self, theta: &Theta, stream: &mut RandomStream) -> OptResult<StochasticEvaluation>;

    /// Re-evaluate the value at `theta` on the samples of the last
    /// `evaluate` call.
    fn value_on_last_draws(&self, theta: &Theta) -> OptResult<f64>;
}
