pub fn uniform_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

/// Euclidean projection onto `{ w : w_i >= 0, sum(w) = 1 }` (sort-and-threshold).
pub fn project_onto_simplex(v: &[f64]) -> Vec<f64> {
    if v.is_empty() {
        return Vec::new();
    }
    let mut sorted = v.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));

    let mut cumulative = 0.0;
    let mut tau = 0.0;
    for (idx, u) in sorted.iter().enumerate() {
        cumulative += u;
        let candidate = (cumulative - 1.0) / (idx + 1) as f64;
        if u - candidate > 0.0 {
            tau = candidate;
        }
    }
    v.iter().map(|x| (x - tau).max(0.0)).collect()
}

/// Divides every component by the sum so the result sums to one.
///
/// Negative noise is clipped first; a vector with no positive mass has no
/// meaningful rescaling and yields `None`.
pub fn rescale_to_unit_sum(weights: &[f64]) -> Option<Vec<f64>> {
    let clipped = weights.iter().map(|w| w.max(0.0)).collect::<Vec<_>>();
    let sum: f64 = clipped.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return None;
    }
    Some(clipped.into_iter().map(|w| w / sum).collect())
}
