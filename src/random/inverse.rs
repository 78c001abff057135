//! Inverse-CDF helpers used by the NORTA copula machinery.
//!
//! - [`normal_cdf`]: Φ(z) through `erfc`.
//! - [`gamma_inverse_cdf`]: safeguarded Newton iteration on the regularized
//!   lower incomplete gamma function, seeded by Wilson–Hilferty.
//! - [`negative_binomial_inverse_cdf`]: pmf recurrence on `(r, μ)`.
//!
//! Uniform arguments are clamped to `[U_EPS, 1 − U_EPS]` so that copula
//! tails never map to `±∞`.
use statrs::function::{
    erf::{erfc, erfc_inv},
    gamma::{gamma_lr, ln_gamma},
};

/// Uniform clamp applied before every inversion.
pub const U_EPS: f64 = 1e-12;

/// Shape above which the Wilson–Hilferty approximation is used as the
/// quantile without Newton refinement.
const LARGE_SHAPE: f64 = 1e5;

const NEWTON_MAX_ITER: usize = 100;
const NEWTON_REL_TOL: f64 = 1e-12;

/// Standard normal cumulative distribution function.
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / std::f64::consts::SQRT_2)
}

/// Standard normal quantile.
pub fn normal_inverse_cdf(u: f64) -> f64 {
    let u = clamp_uniform(u);
    -std::f64::consts::SQRT_2 * erfc_inv(2.0 * u)
}

/// Quantile of `Gamma(shape, scale)` at probability `u`.
///
/// Non-positive or non-finite `shape`/`scale` return `NaN`; callers
/// validate parameters at construction time. `shape == +∞` returns the
/// mean `scale·shape` limit, which is only meaningful for unit-mean factors
/// (`scale = 1/shape`), so it returns `1`.
pub fn gamma_inverse_cdf(u: f64, shape: f64, scale: f64) -> f64 {
    if shape == f64::INFINITY {
        return 1.0;
    }
    if !(shape > 0.0 && shape.is_finite() && scale > 0.0 && scale.is_finite()) {
        return f64::NAN;
    }
    let u = clamp_uniform(u);
    let x0 = initial_guess(u, shape);
    if shape >= LARGE_SHAPE {
        return x0 * scale;
    }
    newton_gamma_quantile(u, shape, x0) * scale
}

/// Quantile of the negative binomial with shape `r` and mean `mean`.
///
/// Uses the pmf recurrence
/// `p(k+1) = p(k) · (k + r)/(k + 1) · μ/(r + μ)` from
/// `p(0) = (r/(r + μ))^r`. `r == +∞` falls back to the Poisson recurrence.
pub fn negative_binomial_inverse_cdf(u: f64, r: f64, mean: f64) -> u64 {
    if mean <= 0.0 || !mean.is_finite() {
        return 0;
    }
    let u = clamp_uniform(u);
    let poisson_limit = r == f64::INFINITY || r > 1e12;
    let q = if poisson_limit { 0.0 } else { mean / (r + mean) };
    let mut pmf = if poisson_limit { (-mean).exp() } else { (r * (-q).ln_1p()).exp() };
    // Bounded search: far beyond any quantile below 1 - U_EPS.
    let sd = if poisson_limit { mean.sqrt() } else { (mean + mean * mean / r).sqrt() };
    if pmf == 0.0 {
        // p(0) underflows for very large means; the normal limit is accurate there.
        return (mean + sd * normal_inverse_cdf(u)).round().max(0.0) as u64;
    }
    let limit = (mean + 60.0 * sd + 100.0).ceil() as u64;
    let mut cdf = pmf;
    let mut k = 0_u64;
    while cdf < u && k < limit {
        let kf = k as f64;
        pmf *= if poisson_limit { mean / (kf + 1.0) } else { (kf + r) / (kf + 1.0) * q };
        cdf += pmf;
        k += 1;
    }
    k
}

fn clamp_uniform(u: f64) -> f64 {
    if u.is_nan() { 0.5 } else { u.clamp(U_EPS, 1.0 - U_EPS) }
}

fn initial_guess(u: f64, a: f64) -> f64 {
    let z = normal_inverse_cdf(u);
    let c = 1.0 / (9.0 * a);
    let wh = a * (1.0 - c + z * c.sqrt()).powi(3);
    if wh > 0.0 && a >= 1.0 {
        return wh;
    }
    // Small-x expansion P(a, x) ≈ x^a / Γ(a + 1).
    let small = ((u.ln() + ln_gamma(a + 1.0)) / a).exp();
    if small.is_finite() && small > 0.0 { small } else { a }
}

fn newton_gamma_quantile(u: f64, a: f64, x0: f64) -> f64 {
    let ln_gamma_a = ln_gamma(a);
    let mut lo = 0.0_f64;
    let mut hi = f64::INFINITY;
    let mut x = x0;
    for _ in 0..NEWTON_MAX_ITER {
        let f = gamma_lr(a, x) - u;
        if f < 0.0 {
            lo = x;
        } else {
            hi = x;
        }
        let ln_pdf = (a - 1.0) * x.ln() - x - ln_gamma_a;
        let pdf = ln_pdf.exp();
        let mut next = if pdf > 0.0 && pdf.is_finite() { x - f / pdf } else { f64::NAN };
        if !(next > lo && next < hi) {
            next = if hi.is_finite() { 0.5 * (lo + hi) } else { 2.0 * x.max(lo) + 1e-3 };
        }
        if (next - x).abs() <= NEWTON_REL_TOL * x.max(1e-300) {
            return next;
        }
        x = next;
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Known values of Φ and its inverse.
    // - Gamma quantiles checked by plugging back into the CDF, across small,
    //   moderate and large shapes.
    // - Negative-binomial quantiles versus a brute-force cumulative sum.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Φ(0) = 0.5, Φ(1.96) ≈ 0.975 and Φ⁻¹ inverts Φ.
    fn normal_cdf_known_values() {
        assert_relative_eq!(normal_cdf(0.0), 0.5, epsilon = 1e-14);
        assert_relative_eq!(normal_cdf(1.959_963_984_540_054), 0.975, epsilon = 1e-9);
        for z in [-3.0, -0.7, 0.0, 0.4, 2.5] {
            assert_relative_eq!(normal_inverse_cdf(normal_cdf(z)), z, epsilon = 1e-8);
        }
    }

    #[test]
    // Purpose
    // -------
    // The gamma quantile is a right inverse of the regularized lower
    // incomplete gamma function.
    //
    // Given
    // -----
    // - Shapes from 0.3 to 250 and probabilities across the unit interval.
    //
    // Expect
    // ------
    // - P(a, x(u)) == u within 1e-8.
    fn gamma_quantile_inverts_cdf() {
        for &a in &[0.3, 1.0, 2.5, 17.0, 250.0] {
            for &u in &[0.001, 0.1, 0.5, 0.9, 0.999] {
                let x = gamma_inverse_cdf(u, a, 1.0);
                assert!(x > 0.0, "quantile must be positive for a={a}, u={u}");
                assert_relative_eq!(gamma_lr(a, x), u, epsilon = 1e-8);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Scale enters multiplicatively and invalid parameters yield NaN.
    fn gamma_quantile_scale_and_invalid_inputs() {
        let x1 = gamma_inverse_cdf(0.3, 2.0, 1.0);
        let x3 = gamma_inverse_cdf(0.3, 2.0, 3.0);
        assert_relative_eq!(x3, 3.0 * x1, max_relative = 1e-10);
        assert!(gamma_inverse_cdf(0.3, 0.0, 1.0).is_nan());
        assert_eq!(gamma_inverse_cdf(0.3, f64::INFINITY, 0.0), 1.0);
    }

    #[test]
    // Purpose
    // -------
    // The negative-binomial quantile is the smallest k with F(k) >= u.
    fn negative_binomial_quantile_matches_cumulative_sum() {
        // Arrange
        let (r, mean) = (3.0_f64, 6.0_f64);
        let q = mean / (r + mean);
        let mut pmf = vec![(r * (1.0 - q).ln()).exp()];
        for k in 0..200 {
            let next = pmf[k] * (k as f64 + r) / (k as f64 + 1.0) * q;
            pmf.push(next);
        }

        // Act / Assert
        for &u in &[0.01, 0.2, 0.5, 0.8, 0.99] {
            let k = negative_binomial_inverse_cdf(u, r, mean) as usize;
            let cdf_k: f64 = pmf[..=k].iter().sum();
            assert!(cdf_k >= u - 1e-12);
            if k > 0 {
                let cdf_prev: f64 = pmf[..k].iter().sum();
                assert!(cdf_prev < u);
            }
        }
        assert_eq!(negative_binomial_inverse_cdf(0.7, r, 0.0), 0);
    }
}
