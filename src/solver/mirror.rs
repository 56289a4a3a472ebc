use super::pairwise::{Settle, settle};
use super::{SimplexProblem, SolverError, SolverOutcome, SolverStrategy, max_abs_diff};

/// Entropic mirror descent: multiplicative updates `w_i ← w_i·exp(−η·g_i)`
/// renormalized to unit sum. Step adaptation and stopping follow
/// [`super::ProjectedSubgradient`]; a polish may put coordinates on the
/// boundary, where they stay.
#[derive(Debug, Clone)]
pub struct ExponentiatedGradient {
    pub initial_step: f64,
    pub min_step: f64,
    pub max_step: f64,
    pub grow: f64,
    pub shrink: f64,
    pub xtol: f64,
}

impl Default for ExponentiatedGradient {
    fn default() -> Self {
        Self {
            initial_step: 0.5,
            min_step: 1e-10,
            max_step: 8.0,
            grow: 1.1,
            shrink: 0.5,
            xtol: 1e-12,
        }
    }
}

impl SolverStrategy for ExponentiatedGradient {
    fn name(&self) -> &'static str {
        "exponentiated-gradient"
    }

    fn solve(&self, problem: &SimplexProblem<'_>) -> Result<SolverOutcome, SolverError> {
        problem.validate()?;
        if problem.initial.iter().any(|w| *w <= 0.0) {
            // Multiplicative updates can never leave a zero coordinate.
            return Err(SolverError::InfeasibleStart);
        }
        let mare = problem.objective;

        let mut weights = problem.initial.to_vec();
        let mut value = mare.value(&weights);
        if !value.is_finite() {
            return Err(SolverError::NonFiniteObjective { iteration: 0 });
        }
        let mut step = self.initial_step;

        for iteration in 1..=problem.max_iters {
            let grad = mare.subgradient(&weights);
            let scale = grad.iter().fold(0.0_f64, |acc, g| acc.max(g.abs()));
            if scale == 0.0 {
                return Ok(done(true, weights, value, iteration));
            }
            if !scale.is_finite() {
                return Err(SolverError::NonFiniteObjective { iteration });
            }

            let Some(trial) = multiplicative_step(&weights, &grad, step / scale) else {
                return Err(SolverError::NonFiniteObjective { iteration });
            };
            let trial_value = mare.value(&trial);
            if !trial_value.is_finite() {
                return Err(SolverError::NonFiniteObjective { iteration });
            }

            if trial_value <= value {
                let moved = max_abs_diff(&trial, &weights);
                weights = trial;
                value = trial_value;
                step = (step * self.grow).min(self.max_step);
                if moved > self.xtol {
                    continue;
                }
            } else {
                step *= self.shrink;
                if step >= self.min_step {
                    continue;
                }
            }

            match settle(mare, &weights, value) {
                Settle::Improved(polished, polished_value) => {
                    weights = polished;
                    value = polished_value;
                    step = self.initial_step;
                }
                Settle::Stationary => return Ok(done(true, weights, value, iteration)),
                Settle::Stalled => return Ok(done(false, weights, value, iteration)),
            }
        }

        Ok(done(false, weights, value, problem.max_iters))
    }
}

fn multiplicative_step(weights: &[f64], grad: &[f64], eta: f64) -> Option<Vec<f64>> {
    // Shift exponents by their max so the largest factor is exactly 1.
    let exponents = grad.iter().map(|g| -eta * g).collect::<Vec<_>>();
    let shift = exponents.iter().fold(f64::NEG_INFINITY, |acc, e| acc.max(*e));
    let mut out = weights
        .iter()
        .zip(&exponents)
        .map(|(w, e)| w * (e - shift).exp())
        .collect::<Vec<_>>();
    let sum: f64 = out.iter().sum();
    if !sum.is_finite() || sum <= 0.0 {
        return None;
    }
    for w in &mut out {
        *w /= sum;
    }
    Some(out)
}

fn done(converged: bool, weights: Vec<f64>, value: f64, iterations: usize) -> SolverOutcome {
    SolverOutcome {
        converged,
        weights,
        value,
        iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::DesignMatrix;
    use crate::objective::Mare;
    use crate::solver::uniform_weights;

    #[test]
    fn multiplicative_step_stays_on_the_simplex() {
        let w = multiplicative_step(&[0.2, 0.3, 0.5], &[1.0, -2.0, 0.5], 3.0).expect("finite");
        assert!((w.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(w.iter().all(|v| *v > 0.0));
        assert!(w[1] > 0.3);
    }

    #[test]
    fn reduces_the_objective_from_uniform() {
        let rows = vec![
            vec![62.0, 70.0],
            vec![75.0, 58.0],
            vec![81.0, 77.0],
            vec![66.0, 90.0],
        ];
        let y = rows
            .iter()
            .map(|r| 0.8 * r[0] + 0.2 * r[1])
            .collect::<Vec<_>>();
        let x = DesignMatrix::from_rows(&rows).expect("rectangular");
        let mare = Mare::new(&x, &y);
        let initial = uniform_weights(2);
        let out = ExponentiatedGradient::default()
            .solve(&SimplexProblem {
                objective: &mare,
                initial: &initial,
                max_iters: 1000,
            })
            .expect("no numerical failure");
        assert!(out.value < mare.value(&initial));
        assert!((out.weights[0] - 0.8).abs() < 0.05);
    }

    #[test]
    fn rejects_starts_on_the_boundary() {
        let x = DesignMatrix::from_rows(&[vec![1.0, 2.0]]).expect("rectangular");
        let y = vec![1.5];
        let mare = Mare::new(&x, &y);
        let initial = [1.0, 0.0];
        let err = ExponentiatedGradient::default()
            .solve(&SimplexProblem {
                objective: &mare,
                initial: &initial,
                max_iters: 10,
            })
            .expect_err("boundary start");
        assert_eq!(err, SolverError::InfeasibleStart);
    }

    #[test]
    fn fewer_rows_than_features_never_claims_a_stuck_point() {
        let rows = vec![
            vec![70.0, 82.0, 65.0, 77.0, 60.0],
            vec![88.0, 54.0, 71.0, 90.0, 45.0],
            vec![62.0, 91.0, 80.0, 58.0, 73.0],
        ];
        let truth = [0.1, 0.4, 0.2, 0.3, 0.0];
        let y = rows
            .iter()
            .map(|r| r.iter().zip(truth).map(|(x, w)| x * w).sum())
            .collect::<Vec<f64>>();
        let x = DesignMatrix::from_rows(&rows).expect("rectangular");
        let mare = Mare::new(&x, &y);
        let initial = uniform_weights(5);
        let out = ExponentiatedGradient::default()
            .solve(&SimplexProblem {
                objective: &mare,
                initial: &initial,
                max_iters: 1000,
            })
            .expect("no numerical failure");
        assert!(out.value < mare.value(&initial));
        assert!(!out.converged || out.value < 1e-6, "{out:?}");
    }
}
