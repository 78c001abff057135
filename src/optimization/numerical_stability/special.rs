//! Special-function helpers for count likelihoods.
//!
//! Negative-binomial and gamma-mixture likelihoods repeatedly need
//! `ψ(x + r) − ψ(r)` and its derivative for integer `x`. For integer
//! arguments these are finite sums, which are both faster and more accurate
//! than differencing two digamma evaluations at large `r`:
//!
//! - `ψ(x + r) − ψ(r) = Σ_{k<x} 1/(r + k)`
//! - `ψ₁(x + r) − ψ₁(r) = −Σ_{k<x} 1/(r + k)²`
//!
//! `statrs` provides `digamma` and `ln_gamma`; it has no trigamma, so
//! [`trigamma`] is implemented here by recurrence plus asymptotic series.

/// `ψ(x + r) − ψ(r)` for a non-negative integer `x`.
pub fn digamma_shift(r: f64, x: u64) -> f64 {
    (0..x).map(|k| 1.0 / (r + k as f64)).sum()
}

/// `ψ₁(x + r) − ψ₁(r)` for a non-negative integer `x`.
pub fn trigamma_shift(r: f64, x: u64) -> f64 {
    -(0..x).map(|k| (r + k as f64).powi(-2)).sum::<f64>()
}

/// `ln Γ(x + r) − ln Γ(r)` for a non-negative integer `x`.
pub fn ln_gamma_shift(r: f64, x: u64) -> f64 {
    (0..x).map(|k| (r + k as f64).ln()).sum()
}

/// Trigamma function ψ₁(x) for `x > 0`.
///
/// Shifts the argument above 6 with `ψ₁(x) = ψ₁(x + 1) + 1/x²` and then
/// applies the asymptotic expansion.
pub fn trigamma(x: f64) -> f64 {
    if x.is_nan() || x <= 0.0 {
        return f64::NAN;
    }
    let mut acc = 0.0;
    let mut z = x;
    while z < 6.0 {
        acc += 1.0 / (z * z);
        z += 1.0;
    }
    let inv = 1.0 / z;
    let inv2 = inv * inv;
    let series = inv
        + 0.5 * inv2
        + inv * inv2 * (1.0 / 6.0 - inv2 * (1.0 / 30.0 - inv2 * (1.0 / 42.0 - inv2 / 30.0)));
    acc + series
}

/// Numerically stable `ln Σ exp(xᵢ)`; returns `−∞` for an empty slice or
/// when every term is `−∞`.
pub fn log_sum_exp(xs: &[f64]) -> f64 {
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    max + xs.iter().map(|x| (x - max).exp()).sum::<f64>().ln()
}

/// `ln x!` via `ln Γ(x + 1)`.
pub fn ln_factorial(x: u64) -> f64 {
    statrs::function::gamma::ln_gamma(x as f64 + 1.0)
}
