//! NORTA copula correlation by Robbins–Monro stochastic root finding.
//!
//! Purpose
//! -------
//! Find, for every pair of periods `(i, j)`, the normal-scale correlation
//! `ρ` whose induced count correlation matches the empirical Spearman
//! correlation `ρ̂_s`. The induced correlation has no closed form, so it is
//! estimated by simulation:
//!
//! ```text
//! (Z_i, Z_j) ~ N(0, [[1, ρ], [ρ, 1]])
//! Λ_k = F⁻¹_{Γ(r_k, μ_k/r_k)}(Φ(Z_k))      (gamma mixing rates)
//! X_k ~ Poisson(Λ_k)                      (negative-binomial counts)
//! ρ_s(ρ) = Spearman(X_i, X_j)
//! ```
//!
//! and the root of `ρ_s(ρ) − ρ̂_s` is tracked by
//! `ρ_{k+1} = clamp(ρ_k + a_k (ρ̂_s − ρ_s(ρ_k)))` with the annealing gain
//! `a_k = η k^(−pwr)`. The reported value is the Polyak average of the
//! second half of the iterates.
//!
//! Conventions
//! -----------
//! - The start value is `2 sin(π ρ̂_s / 6)`, the exact inverse of the
//!   Spearman–Pearson relation for Gaussian pairs.
//! - Pairs involving a period whose counts never vary are set to 0.
//! - Each pair is simulated on its own substream of a stream seeded with
//!   `opts.seed`; results are reproducible and independent of pair order.
//! - The gamma quantile map is tabulated once per period on a fine grid in
//!   normal space and linearly interpolated.
use ndarray::Array2;
use tracing::debug;

use crate::{
    correlation::{
        errors::{CorrelationError, CorrelationResult},
        negbin::NegBinFit,
        spearman::{spearman, spearman_matrix},
    },
    optimization::stochastic_approx::AnnealingGain,
    random::{
        RandomStream, gamma_inverse_cdf, normal_cdf,
        variates::{poisson, standard_normal},
    },
};

const TABLE_Z_MAX: f64 = 8.5;
const TABLE_NODES: usize = 2049;

/// Robbins–Monro options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NortaFitOptions {
    pub max_iter: usize,
    /// Simulated pairs per iteration.
    pub n_pairs: usize,
    pub gain: AnnealingGain,
    /// Iterates are clamped to `[−clamp, clamp]`.
    pub clamp: f64,
    pub seed: u64,
}

impl Default for NortaFitOptions {
    fn default() -> Self {
        Self { max_iter: 100, n_pairs: 500, gain: AnnealingGain::default(), clamp: 0.999, seed: 12345 }
    }
}

impl NortaFitOptions {
    /// # Errors
    /// - [`CorrelationError::InvalidOption`] for zero budgets or a clamp
    ///   outside `(0, 1)`.
    pub fn new(
        max_iter: usize, n_pairs: usize, gain: AnnealingGain, clamp: f64, seed: u64,
    ) -> CorrelationResult<Self> {
        let opts = Self { max_iter, n_pairs, gain, clamp, seed };
        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> CorrelationResult<()> {
        if self.max_iter == 0 {
            return Err(CorrelationError::InvalidOption { name: "max_iter", value: 0.0, reason: "Must be at least 1." });
        }
        if self.n_pairs < 2 {
            return Err(CorrelationError::InvalidOption {
                name: "n_pairs",
                value: self.n_pairs as f64,
                reason: "At least two simulated pairs are required.",
            });
        }
        if !(self.clamp > 0.0 && self.clamp < 1.0) {
            return Err(CorrelationError::InvalidOption {
                name: "clamp",
                value: self.clamp,
                reason: "Must lie strictly between 0 and 1.",
            });
        }
        Ok(())
    }
}

/// Fitted copula correlation.
#[derive(Debug, Clone, PartialEq)]
pub struct NortaFit {
    /// Normal-scale correlation matrix (not yet repaired).
    pub correlation: Array2<f64>,
    /// Empirical Spearman matrix the fit targeted.
    pub target: Array2<f64>,
    /// Robbins–Monro iterations per pair.
    pub iterations: usize,
}

/// Fit the NORTA correlation matrix of `counts` (observations × periods)
/// given their negative-binomial marginals.
///
/// # Errors
/// - [`CorrelationError::LengthMismatch`] if `marginals` does not have
///   one entry per column.
/// - [`CorrelationError::EmptySample`] for fewer than two observations.
/// - Invalid options.
pub fn fit_norta_correlation(
    counts: &Array2<u64>, marginals: &[NegBinFit], opts: &NortaFitOptions,
) -> CorrelationResult<NortaFit> {
    opts.validate()?;
    let (n_obs, p) = counts.dim();
    if marginals.len() != p {
        return Err(CorrelationError::LengthMismatch { what: "marginals", expected: p, found: marginals.len() });
    }
    if n_obs < 2 {
        return Err(CorrelationError::EmptySample { what: "count observations (at least two needed)" });
    }
    let target = spearman_matrix(counts);
    let tables: Vec<MixingQuantiles> = marginals.iter().map(MixingQuantiles::new).collect();
    let varies: Vec<bool> = counts.columns().into_iter().map(|c| c.iter().any(|&x| x != c[0])).collect();

    let mut stream = RandomStream::new(opts.seed);
    let mut correlation = Array2::<f64>::eye(p);
    for i in 0..p {
        for j in 0..i {
            stream.reset_next_substream();
            let rho = if varies[i] && varies[j] {
                root_find_pair(target[[i, j]], (&tables[i], &tables[j]), opts, &mut stream)?
            } else {
                0.0
            };
            debug!(i, j, target = target[[i, j]], rho, "NORTA pair fitted");
            correlation[[i, j]] = rho;
            correlation[[j, i]] = rho;
        }
    }
    Ok(NortaFit { correlation, target, iterations: opts.max_iter })
}

fn root_find_pair(
    target: f64, tables: (&MixingQuantiles, &MixingQuantiles), opts: &NortaFitOptions,
    stream: &mut RandomStream,
) -> CorrelationResult<f64> {
    let mut rho = (2.0 * (std::f64::consts::PI * target / 6.0).sin()).clamp(-opts.clamp, opts.clamp);
    let burn_in = opts.max_iter / 2;
    let mut avg = 0.0;
    let mut averaged = 0usize;
    let mut xs = vec![0.0; opts.n_pairs];
    let mut ys = vec![0.0; opts.n_pairs];
    for k in 1..=opts.max_iter {
        let s = (1.0 - rho * rho).sqrt();
        for m in 0..opts.n_pairs {
            let z1 = standard_normal(stream);
            let z2 = rho * z1 + s * standard_normal(stream);
            xs[m] = poisson(stream, tables.0.rate(z1))? as f64;
            ys[m] = poisson(stream, tables.1.rate(z2))? as f64;
        }
        let simulated = spearman(&xs, &ys);
        rho = (rho + opts.gain.at(k) * (target - simulated)).clamp(-opts.clamp, opts.clamp);
        if k > burn_in {
            averaged += 1;
            avg += (rho - avg) / averaged as f64;
        }
    }
    Ok(avg)
}

/// Tabulated map `z ↦ F⁻¹_{Γ(r, μ/r)}(Φ(z))`.
#[derive(Debug, Clone)]
struct MixingQuantiles {
    values: Vec<f64>,
    step: f64,
}

impl MixingQuantiles {
    fn new(fit: &NegBinFit) -> Self {
        let step = 2.0 * TABLE_Z_MAX / (TABLE_NODES - 1) as f64;
        let values = (0..TABLE_NODES)
            .map(|k| {
                let z = -TABLE_Z_MAX + step * k as f64;
                if fit.mean <= 0.0 {
                    0.0
                } else if fit.degenerate || !fit.shape.is_finite() {
                    fit.mean
                } else {
                    gamma_inverse_cdf(normal_cdf(z), fit.shape, fit.mean / fit.shape)
                }
            })
            .collect();
        Self { values, step }
    }

    fn rate(&self, z: f64) -> f64 {
        let pos = ((z + TABLE_Z_MAX) / self.step).clamp(0.0, (TABLE_NODES - 1) as f64);
        let k = (pos.floor() as usize).min(TABLE_NODES - 2);
        let w = pos - k as f64;
        self.values[k] * (1.0 - w) + self.values[k + 1] * w
    }
}
