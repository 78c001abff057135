//! Spearman rank correlation with average ranks for ties.
use ndarray::Array2;

/// 1-based ranks; tied values share the average of their positions.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end (0-based) share rank (start + end + 1) / 2.
        let rank = (start + end + 1) as f64 / 2.0;
        for &i in &order[start..end] {
            ranks[i] = rank;
        }
        start = end;
    }
    ranks
}

/// Spearman correlation of two equally long samples.
///
/// Returns 0 when either sample is constant (no rank variation) or the
/// samples are shorter than two.
pub fn spearman(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    pearson(&average_ranks(&x[..n]), &average_ranks(&y[..n]))
}

/// Pairwise Spearman matrix of the columns of `counts`
/// (observations × periods), with unit diagonal.
pub fn spearman_matrix(counts: &Array2<u64>) -> Array2<f64> {
    let p = counts.ncols();
    let ranks: Vec<Vec<f64>> = counts
        .columns()
        .into_iter()
        .map(|c| average_ranks(&c.iter().map(|&x| x as f64).collect::<Vec<_>>()))
        .collect();
    let mut out = Array2::<f64>::eye(p);
    for i in 0..p {
        for j in 0..i {
            let r = pearson(&ranks[i], &ranks[j]);
            out[[i, j]] = r;
            out[[j, i]] = r;
        }
    }
    out
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return 0.0;
    }
    (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0)
}
