//! Runs an `argmin` solver on a log-likelihood problem and returns an
//! [`OptimOutcome`].
use crate::optimization::{
    errors::OptResult,
    loglik_optimizer::{
        Grad, LbfgsOptions, LogLikelihood, OptimOutcome, Theta, adapter::ArgMinAdapter,
    },
};
use argmin::core::{CostFunction, Executor, IterState, Solver, State};
use tracing::debug;

/// Run `solver` from `theta0` on `problem`.
///
/// Applies `opts.tols.max_iter` to the executor and, with the `obs_slog`
/// feature and `opts.verbose`, attaches argmin's terminal slog observer.
/// The starting log-likelihood is logged at `debug` level.
///
/// # Errors
/// - Solver failures are converted into [`OptError`](crate::optimization::errors::OptError).
/// - Invalid final estimates are rejected by [`OptimOutcome::new`].
pub fn run_lbfgs<'a, F, S>(
    theta0: Theta, opts: &LbfgsOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: LogLikelihood,
    S: Solver<ArgMinAdapter<'a, F>, IterState<Theta, Grad, (), (), (), f64>> + Send + 'static,
{
    if opts.verbose {
        let ll0 = -problem.cost(&theta0)?;
        debug!(loglik = ll0, dim = theta0.len(), "l-bfgs start");
    }
    let mut optimizer = Executor::new(problem, solver).configure(|state| state.param(theta0));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let grad = result.take_gradient();
    debug!(iterations, status = ?termination, "l-bfgs finished");
    OptimOutcome::new(
        result.take_best_param(),
        -result.get_best_cost(),
        termination,
        iterations,
        function_counts,
        grad,
    )
}
