//! Exact line searches along simplex edges `e_to - e_from`.
//!
//! Restricted to an edge, MARE is convex and piecewise linear in the step, so
//! its minimizer is a weighted median of the per-row breakpoints.

use crate::objective::Mare;

const MAX_SWEEPS: usize = 50;
/// Relative residuals at or below this count as sitting on their kink.
const ZERO_RESIDUAL: f64 = 1e-8;
const DESCENT_TOL: f64 = 1e-10;

/// Result of trying to settle a first-order iterate.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Settle {
    Improved(Vec<f64>, f64),
    Stationary,
    Stalled,
}

/// Polishes `weights` with edge line searches; reports whether that helped
/// and, if not, whether the point passes the edge stationarity check.
pub(crate) fn settle(mare: &Mare<'_>, weights: &[f64], value: f64) -> Settle {
    let (polished, polished_value) = polish(mare, weights, MAX_SWEEPS);
    if polished_value < value {
        return Settle::Improved(polished, polished_value);
    }
    if is_edge_stationary(mare, weights) {
        Settle::Stationary
    } else {
        Settle::Stalled
    }
}

/// Step `t` minimizing the objective at `w + t·(e_to - e_from)`, `t ∈ [-w_to, w_from]`.
fn edge_step(mare: &Mare<'_>, residuals: &[f64], weights: &[f64], from: usize, to: usize) -> Option<f64> {
    let mut breakpoints = Vec::with_capacity(residuals.len());
    let mut total = 0.0;
    for (idx, r) in residuals.iter().enumerate() {
        let row = mare.x().row(idx);
        let slope = row[to] - row[from];
        if slope == 0.0 {
            continue;
        }
        let weight = mare.row_scale(idx) * slope.abs();
        breakpoints.push((-r / slope, weight));
        total += weight;
    }
    if breakpoints.is_empty() {
        return None;
    }
    breakpoints.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut acc = 0.0;
    let mut t = breakpoints[breakpoints.len() - 1].0;
    for (point, weight) in &breakpoints {
        acc += weight;
        if acc >= 0.5 * total {
            t = *point;
            break;
        }
    }
    if !t.is_finite() {
        return None;
    }
    Some(t.clamp(-weights[to].max(0.0), weights[from].max(0.0)))
}

/// Sweeps every pair of coordinates with exact edge line searches until a
/// sweep no longer lowers the objective.
pub(crate) fn polish(mare: &Mare<'_>, weights: &[f64], max_sweeps: usize) -> (Vec<f64>, f64) {
    let k = weights.len();
    let mut w = weights.to_vec();
    let mut value = mare.value(&w);

    for _ in 0..max_sweeps {
        let mut improved = false;
        for from in 0..k {
            for to in from + 1..k {
                if w[from] <= 0.0 && w[to] <= 0.0 {
                    continue;
                }
                let residuals = mare.residuals(&w);
                let Some(t) = edge_step(mare, &residuals, &w, from, to) else {
                    continue;
                };
                if t == 0.0 {
                    continue;
                }
                let mut trial = w.clone();
                trial[from] = (trial[from] - t).max(0.0);
                trial[to] = (trial[to] + t).max(0.0);
                let trial_value = mare.value(&trial);
                if trial_value.is_finite() && trial_value < value * (1.0 - 1e-12) {
                    w = trial;
                    value = trial_value;
                    improved = true;
                }
            }
        }
        if !improved || value == 0.0 {
            break;
        }
    }
    (w, value)
}

/// True when no edge direction `e_to - e_from` with `w_from > 0` has a
/// negative one-sided derivative.
pub(crate) fn is_edge_stationary(mare: &Mare<'_>, weights: &[f64]) -> bool {
    let residuals = mare.residuals(weights);
    let k = weights.len();
    for from in (0..k).filter(|i| weights[*i] > 0.0) {
        for to in (0..k).filter(|j| *j != from) {
            let mut derivative = 0.0;
            let mut scale = 0.0;
            for (idx, r) in residuals.iter().enumerate() {
                let row = mare.x().row(idx);
                let slope = (row[to] - row[from]) * mare.row_scale(idx);
                let rel = r * mare.row_scale(idx);
                derivative += if rel.abs() <= ZERO_RESIDUAL {
                    slope.abs()
                } else {
                    rel.signum() * slope
                };
                scale += slope.abs();
            }
            if derivative < -DESCENT_TOL * scale {
                return false;
            }
        }
    }
    true
}
