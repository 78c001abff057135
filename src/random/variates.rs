//! Variate generators drawn from a [`RandomStream`].
//!
//! Thin validated wrappers over `rand_distr` plus the few composite
//! generators (`dirichlet`, `multinomial`, `negative_binomial`,
//! `multivariate_normal`) that `rand_distr` does not expose with a
//! runtime-sized interface.
use nalgebra::DMatrix;
use rand_distr::{Beta, Binomial, Distribution, Exp1, Gamma, Poisson, StandardNormal};

use crate::random::{
    errors::{VariateError, VariateResult},
    stream::RandomStream,
};

/// Exponential variate with the given rate.
///
/// # Errors
/// - [`VariateError::InvalidParameter`] if `rate` is non-finite or `<= 0`.
pub fn exponential(stream: &mut RandomStream, rate: f64) -> VariateResult<f64> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(VariateError::InvalidParameter {
            distribution: "exponential",
            value: rate,
            reason: "Rate must be finite and strictly positive.",
        });
    }
    let e: f64 = Exp1.sample(stream);
    Ok(e / rate)
}

/// Standard normal variate.
pub fn standard_normal(stream: &mut RandomStream) -> f64 {
    StandardNormal.sample(stream)
}

/// Gamma variate with `(shape, scale)`.
///
/// # Errors
/// - [`VariateError::InvalidParameter`] if either parameter is non-finite
///   or `<= 0`.
pub fn gamma(stream: &mut RandomStream, shape: f64, scale: f64) -> VariateResult<f64> {
    verify_positive("gamma", shape)?;
    verify_positive("gamma", scale)?;
    let dist = Gamma::new(shape, scale).map_err(|_| VariateError::InvalidParameter {
        distribution: "gamma",
        value: shape,
        reason: "Rejected by the gamma sampler.",
    })?;
    Ok(dist.sample(stream))
}

/// Unit-mean gamma factor `Gamma(shape, 1/shape)`.
///
/// A shape of `+∞` is the degenerate "no variability" case and returns `1`
/// without consuming a draw.
pub fn gamma_unit_mean(stream: &mut RandomStream, shape: f64) -> VariateResult<f64> {
    if shape == f64::INFINITY {
        return Ok(1.0);
    }
    gamma(stream, shape, 1.0 / shape)
}

/// Beta variate with shapes `(a, b)`.
pub fn beta(stream: &mut RandomStream, a: f64, b: f64) -> VariateResult<f64> {
    verify_positive("beta", a)?;
    verify_positive("beta", b)?;
    let dist = Beta::new(a, b).map_err(|_| VariateError::InvalidParameter {
        distribution: "beta",
        value: a,
        reason: "Rejected by the beta sampler.",
    })?;
    Ok(dist.sample(stream))
}

/// Poisson variate; a mean of exactly zero returns `0`.
pub fn poisson(stream: &mut RandomStream, mean: f64) -> VariateResult<u64> {
    if mean == 0.0 {
        return Ok(0);
    }
    verify_positive("poisson", mean)?;
    let dist = Poisson::new(mean).map_err(|_| VariateError::InvalidParameter {
        distribution: "poisson",
        value: mean,
        reason: "Mean exceeds the sampler's supported range.",
    })?;
    let x: f64 = dist.sample(stream);
    Ok(x as u64)
}

/// Binomial variate with `n` trials and success probability `p`.
pub fn binomial(stream: &mut RandomStream, n: u64, p: f64) -> VariateResult<u64> {
    if !(0.0..=1.0).contains(&p) {
        return Err(VariateError::InvalidParameter {
            distribution: "binomial",
            value: p,
            reason: "Success probability must lie in [0, 1].",
        });
    }
    if n == 0 || p == 0.0 {
        return Ok(0);
    }
    if p == 1.0 {
        return Ok(n);
    }
    let dist = Binomial::new(n, p).map_err(|_| VariateError::InvalidParameter {
        distribution: "binomial",
        value: p,
        reason: "Rejected by the binomial sampler.",
    })?;
    Ok(dist.sample(stream))
}

/// Multinomial counts for `n` trials over the (unnormalized) weights `probs`.
///
/// Drawn as a chain of conditional binomials, so the result always sums to
/// `n` exactly.
///
/// # Errors
/// - [`VariateError::InvalidProbabilities`] if any weight is negative or
///   non-finite, or the weights sum to zero while `n > 0`.
pub fn multinomial(stream: &mut RandomStream, n: u64, probs: &[f64]) -> VariateResult<Vec<u64>> {
    let total: f64 = probs.iter().sum();
    if probs.iter().any(|p| !p.is_finite() || *p < 0.0) || !total.is_finite() {
        return Err(VariateError::InvalidProbabilities {
            distribution: "multinomial",
            total,
            reason: "Weights must be finite and non-negative.",
        });
    }
    let mut counts = vec![0_u64; probs.len()];
    if n == 0 {
        return Ok(counts);
    }
    if total <= 0.0 {
        return Err(VariateError::InvalidProbabilities {
            distribution: "multinomial",
            total,
            reason: "Weights must carry positive mass when trials are requested.",
        });
    }
    let mut remaining_n = n;
    let mut remaining_mass = total;
    for (i, &p) in probs.iter().enumerate() {
        if remaining_n == 0 {
            break;
        }
        if i + 1 == probs.len() || remaining_mass <= p {
            counts[i] = remaining_n;
            break;
        }
        let k = binomial(stream, remaining_n, (p / remaining_mass).clamp(0.0, 1.0))?;
        counts[i] = k;
        remaining_n -= k;
        remaining_mass -= p;
    }
    Ok(counts)
}

/// Dirichlet proportions from normalized gamma variates.
///
/// Components with `alpha[p] == 0` receive exactly zero mass.
///
/// # Errors
/// - [`VariateError::InvalidParameter`] for negative or non-finite shapes.
/// - [`VariateError::InvalidProbabilities`] if every shape is zero.
pub fn dirichlet(stream: &mut RandomStream, alpha: &[f64]) -> VariateResult<Vec<f64>> {
    let mut out = Vec::with_capacity(alpha.len());
    for &a in alpha {
        if !a.is_finite() || a < 0.0 {
            return Err(VariateError::InvalidParameter {
                distribution: "dirichlet",
                value: a,
                reason: "Concentration parameters must be finite and non-negative.",
            });
        }
        out.push(if a == 0.0 { 0.0 } else { gamma(stream, a, 1.0)? });
    }
    let total: f64 = out.iter().sum();
    if total <= 0.0 {
        return Err(VariateError::InvalidProbabilities {
            distribution: "dirichlet",
            total,
            reason: "At least one concentration parameter must be positive.",
        });
    }
    out.iter_mut().for_each(|x| *x /= total);
    Ok(out)
}

/// Negative-binomial count with shape `r` and mean `mean`, drawn as a
/// gamma-mixed Poisson.
///
/// `r == +∞` degenerates to a Poisson draw.
pub fn negative_binomial(stream: &mut RandomStream, r: f64, mean: f64) -> VariateResult<u64> {
    if mean == 0.0 {
        return Ok(0);
    }
    verify_positive("negative binomial", mean)?;
    let lambda = mean * gamma_unit_mean(stream, r)?;
    poisson(stream, lambda)
}

/// Correlated standard normals `L·z` for a lower Cholesky factor `L`.
pub fn multivariate_normal(stream: &mut RandomStream, chol: &DMatrix<f64>) -> VariateResult<Vec<f64>> {
    let n = chol.nrows();
    if chol.ncols() != n {
        return Err(VariateError::DimensionMismatch { expected: n, found: chol.ncols() });
    }
    let z: Vec<f64> = (0..n).map(|_| standard_normal(stream)).collect();
    let mut out = vec![0.0; n];
    for i in 0..n {
        out[i] = (0..=i).map(|j| chol[(i, j)] * z[j]).sum();
    }
    Ok(out)
}

fn verify_positive(distribution: &'static str, value: f64) -> VariateResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(VariateError::InvalidParameter {
            distribution,
            value,
            reason: "Parameter must be finite and strictly positive.",
        });
    }
    Ok(())
}
