use super::{SimplexProblem, SolverError, SolverOutcome, SolverStrategy, max_abs_diff};

/// Relative diagonal shift retried when the KKT system of a free set is singular.
const RIDGE: f64 = 1e-9;

/// Iteratively reweighted least squares for the L1-type MARE objective.
///
/// Each outer iteration replaces `|r_i| / |y_i|` by the quadratic majorant
/// `r_i^2 / (|y_i| * max(|r_i^prev|, floor))` and minimizes it exactly over the
/// simplex with a primal active-set QP method, warm-started from the previous
/// active set.
#[derive(Debug, Clone)]
pub struct ActiveSetIrls {
    pub ftol: f64,
    pub xtol: f64,
    pub residual_floor: f64,
}

impl Default for ActiveSetIrls {
    fn default() -> Self {
        Self {
            ftol: 1e-12,
            xtol: 1e-10,
            residual_floor: 1e-9,
        }
    }
}

impl SolverStrategy for ActiveSetIrls {
    fn name(&self) -> &'static str {
        "active-set-irls"
    }

    fn solve(&self, problem: &SimplexProblem<'_>) -> Result<SolverOutcome, SolverError> {
        problem.validate()?;
        let mare = problem.objective;
        let k = problem.n_features();

        let mut weights = problem.initial.to_vec();
        let mut value = mare.value(&weights);
        if !value.is_finite() {
            return Err(SolverError::NonFiniteObjective { iteration: 0 });
        }
        let mut best = (weights.clone(), value);
        let mut row_weights = vec![0.0; mare.n_rows()];

        for iteration in 1..=problem.max_iters {
            let residuals = mare.residuals(&weights);
            let mut max_row_weight = 0.0_f64;
            for (idx, r) in residuals.iter().enumerate() {
                let d = mare.row_scale(idx) / r.abs().max(self.residual_floor);
                row_weights[idx] = d;
                max_row_weight = max_row_weight.max(d);
            }
            if !max_row_weight.is_finite() || max_row_weight <= 0.0 {
                return Err(SolverError::NonFiniteObjective { iteration });
            }
            // Only the ratios matter; keep the normal equations well scaled.
            for d in &mut row_weights {
                *d /= max_row_weight;
            }

            let (h, g) = mare.weighted_normal_equations(&row_weights);
            let next = simplex_qp(&h, &g, &weights, qp_iteration_cap(k))?;
            let next_value = mare.value(&next);
            if !next_value.is_finite() {
                return Err(SolverError::NonFiniteObjective { iteration });
            }

            let step = max_abs_diff(&next, &weights);
            let change = (value - next_value).abs();
            weights = next;
            value = next_value;
            if value < best.1 {
                best = (weights.clone(), value);
            }

            if step <= self.xtol || change <= self.ftol * (1.0 + value) {
                return Ok(SolverOutcome {
                    converged: true,
                    weights: best.0,
                    value: best.1,
                    iterations: iteration,
                });
            }
        }

        Ok(SolverOutcome {
            converged: false,
            weights: best.0,
            value: best.1,
            iterations: problem.max_iters,
        })
    }
}

fn qp_iteration_cap(k: usize) -> usize {
    50 * (k + 1)
}

/// Minimizes `½ wᵀHw − gᵀw` subject to `w >= 0`, `sum(w) = 1`.
///
/// `start` must be feasible; its zero components seed the working set.
pub(crate) fn simplex_qp(
    h: &[f64],
    g: &[f64],
    start: &[f64],
    max_iters: usize,
) -> Result<Vec<f64>, SolverError> {
    let k = g.len();
    let mut w = start.to_vec();
    let mut active = w.iter().map(|v| *v <= 0.0).collect::<Vec<_>>();
    let mult_tol = 1e-12 * (1.0 + g.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())));

    for _ in 0..max_iters {
        let free = (0..k).filter(|i| !active[*i]).collect::<Vec<_>>();
        if free.is_empty() {
            return Err(SolverError::InfeasibleStart);
        }
        let (target, nu) = equality_qp(h, g, &free)?;

        let mut direction = vec![0.0; k];
        for (pos, &i) in free.iter().enumerate() {
            direction[i] = target[pos] - w[i];
        }
        let step_norm = direction.iter().fold(0.0_f64, |acc, d| acc.max(d.abs()));

        if step_norm <= 1e-14 {
            // Stationary on the current face: check the bound multipliers.
            let mut leaving: Option<(usize, f64)> = None;
            for i in (0..k).filter(|i| active[*i]) {
                let grad_i = (0..k).map(|j| h[i * k + j] * w[j]).sum::<f64>() - g[i];
                let mu = grad_i - nu;
                if mu < -mult_tol && leaving.map(|(_, m)| mu < m).unwrap_or(true) {
                    leaving = Some((i, mu));
                }
            }
            match leaving {
                Some((i, _)) => active[i] = false,
                None => return Ok(w),
            }
            continue;
        }

        let mut alpha = 1.0;
        let mut blocking = None;
        for &i in &free {
            if direction[i] < 0.0 {
                let ratio = -w[i] / direction[i];
                if ratio < alpha {
                    alpha = ratio;
                    blocking = Some(i);
                }
            }
        }
        for &i in &free {
            w[i] += alpha * direction[i];
        }
        if let Some(i) = blocking {
            w[i] = 0.0;
            active[i] = true;
        }
    }

    Err(SolverError::ActiveSetCycling {
        iterations: max_iters,
    })
}

/// Solves the KKT system of the QP restricted to `free` with `sum(w_free) = 1`:
///
/// ```text
/// [ H_ff  -1 ] [ w_f ]   [ g_f ]
/// [ 1ᵀ     0 ] [ nu  ] = [ 1   ]
/// ```
fn equality_qp(h: &[f64], g: &[f64], free: &[usize]) -> Result<(Vec<f64>, f64), SolverError> {
    match kkt_solve(h, g, free, 0.0) {
        Err(SolverError::SingularMatrix { .. }) => {
            // Rank-deficient H_ff: fewer rows than features, or collinear columns.
            let k = g.len();
            let trace: f64 = free.iter().map(|&i| h[i * k + i]).sum();
            let ridge = if trace > 0.0 {
                RIDGE * trace / free.len() as f64
            } else {
                RIDGE
            };
            kkt_solve(h, g, free, ridge)
        }
        solved => solved,
    }
}

fn kkt_solve(
    h: &[f64],
    g: &[f64],
    free: &[usize],
    ridge: f64,
) -> Result<(Vec<f64>, f64), SolverError> {
    let k = g.len();
    let m = free.len();
    let n = m + 1;
    let mut a = vec![0.0; n * n];
    let mut b = vec![0.0; n];
    for (p, &i) in free.iter().enumerate() {
        for (q, &j) in free.iter().enumerate() {
            a[p * n + q] = h[i * k + j];
        }
        a[p * n + p] += ridge;
        a[p * n + m] = -1.0;
        a[m * n + p] = 1.0;
        b[p] = g[i];
    }
    b[m] = 1.0;

    let mut x = solve_linear(&mut a, &mut b, n)?;
    let nu = x.pop().unwrap_or(0.0);
    Ok((x, nu))
}

/// Gaussian elimination with partial pivoting on a row-major `n×n` system.
pub(crate) fn solve_linear(a: &mut [f64], b: &mut [f64], n: usize) -> Result<Vec<f64>, SolverError> {
    let scale = a.iter().fold(0.0_f64, |acc, v| acc.max(v.abs())).max(1.0);
    let tol = 1e-13 * scale;

    for col in 0..n {
        let mut pivot_row = col;
        for row in col + 1..n {
            if a[row * n + col].abs() > a[pivot_row * n + col].abs() {
                pivot_row = row;
            }
        }
        let pivot = a[pivot_row * n + col];
        if pivot.abs() <= tol || !pivot.is_finite() {
            return Err(SolverError::SingularMatrix { column: col, pivot });
        }
        if pivot_row != col {
            for j in 0..n {
                a.swap(col * n + j, pivot_row * n + j);
            }
            b.swap(col, pivot_row);
        }
        for row in col + 1..n {
            let factor = a[row * n + col] / pivot;
            if factor == 0.0 {
                continue;
            }
            for j in col..n {
                a[row * n + j] -= factor * a[col * n + j];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for j in row + 1..n {
            acc -= a[row * n + j] * x[j];
        }
        x[row] = acc / a[row * n + row];
    }
    Ok(x)
}
