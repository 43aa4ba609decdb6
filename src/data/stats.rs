//! Order statistics shared by the pipeline and the metric engine.
//!
//! One quantile definition is used everywhere: for a sample sorted ascending
//! `v[0..n]` and probability `p`, let `h = (n - 1) * p`. The quantile is
//! `v[floor(h)] + (h - floor(h)) * (v[ceil(h)] - v[floor(h)])`.
//! Percentile rank uses 1-based average ranks, so tied values share a rank.

use serde::Serialize;

/// Ascending copy of `values` using IEEE total ordering.
fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    v
}

/// Linear-interpolation quantile of an already sorted sample.
fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let p = p.clamp(0.0, 1.0);
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Linear-interpolation quantile at probability `p` (clamped to [0, 1]).
/// `None` for an empty sample.
pub fn quantile(values: &[f64], p: f64) -> Option<f64> {
    quantile_sorted(&sorted(values), p)
}

/// Percentile rank in (0, 100] of each present value among the present
/// values. Ties receive the mean of the ranks they span. Missing or NaN
/// inputs stay `None` and do not count towards `n`.
pub fn percentile_ranks(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut present: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.filter(|x| !x.is_nan()).map(|x| (i, x)))
        .collect();
    present.sort_by(|a, b| a.1.total_cmp(&b.1));

    let n = present.len();
    let mut out = vec![None; values.len()];
    let mut start = 0;
    while start < n {
        let mut end = start + 1;
        while end < n && present[end].1 == present[start].1 {
            end += 1;
        }
        // Ranks start+1 ..= end share their mean.
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        for &(idx, _) in &present[start..end] {
            out[idx] = Some(avg_rank / n as f64 * 100.0);
        }
        start = end;
    }
    out
}

/// One vertex of a Lorenz curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LorenzPoint {
    /// Cumulative share of rows.
    pub x: f64,
    /// Cumulative share of amount.
    pub y: f64,
}

/// Lorenz curve over `amounts`: rows sorted ascending, x = i/n, y = running
/// sum / total. Empty input gives an empty curve. The last point is exactly
/// (1, 1) whenever the total is positive.
pub fn lorenz_curve(amounts: &[f64]) -> Vec<LorenzPoint> {
    let v = sorted(amounts);
    let n = v.len();
    let mut cumulative = Vec::with_capacity(n);
    let mut running = 0.0;
    for a in &v {
        running += a;
        cumulative.push(running);
    }
    // Running sum in sorted order so the final ratio is exactly 1.
    let total = running;
    cumulative
        .into_iter()
        .enumerate()
        .map(|(i, cum)| LorenzPoint {
            x: (i + 1) as f64 / n as f64,
            y: if total > 0.0 { cum / total } else { 0.0 },
        })
        .collect()
}

/// Share of `total` held by amounts at or above the `p` quantile.
/// Zero when the total is not positive.
pub fn top_share(amounts: &[f64], p: f64) -> f64 {
    let total: f64 = amounts.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    let Some(threshold) = quantile(amounts, p) else {
        return 0.0;
    };
    let top: f64 = amounts.iter().filter(|&&a| a >= threshold).sum();
    (top / total).clamp(0.0, 1.0)
}
