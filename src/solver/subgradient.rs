use super::pairwise::{Settle, settle};
use super::simplex::project_onto_simplex;
use super::{SimplexProblem, SolverError, SolverOutcome, SolverStrategy, max_abs_diff};

/// Normalized subgradient descent with Euclidean projection back onto the
/// simplex. The step grows after an accepted move and halves after a rejected
/// one. Once the step collapses below `min_step`, or an accepted move no
/// longer changes the weights, edge line searches polish the point; the run
/// restarts from any improvement and otherwise reports convergence only if
/// no simplex edge is a descent direction.
#[derive(Debug, Clone)]
pub struct ProjectedSubgradient {
    pub initial_step: f64,
    pub min_step: f64,
    pub max_step: f64,
    pub grow: f64,
    pub shrink: f64,
    pub xtol: f64,
}

impl Default for ProjectedSubgradient {
    fn default() -> Self {
        Self {
            initial_step: 0.05,
            min_step: 1e-10,
            max_step: 0.5,
            grow: 1.05,
            shrink: 0.5,
            xtol: 1e-12,
        }
    }
}

impl SolverStrategy for ProjectedSubgradient {
    fn name(&self) -> &'static str {
        "projected-subgradient"
    }

    fn solve(&self, problem: &SimplexProblem<'_>) -> Result<SolverOutcome, SolverError> {
        problem.validate()?;
        let mare = problem.objective;

        let mut weights = problem.initial.to_vec();
        let mut value = mare.value(&weights);
        if !value.is_finite() {
            return Err(SolverError::NonFiniteObjective { iteration: 0 });
        }
        let mut step = self.initial_step;

        for iteration in 1..=problem.max_iters {
            let grad = mare.subgradient(&weights);
            let norm = grad.iter().map(|g| g * g).sum::<f64>().sqrt();
            if norm == 0.0 {
                return Ok(outcome(true, weights, value, iteration));
            }
            if !norm.is_finite() {
                return Err(SolverError::NonFiniteObjective { iteration });
            }

            let trial = project_onto_simplex(
                &weights
                    .iter()
                    .zip(&grad)
                    .map(|(w, g)| w - step * g / norm)
                    .collect::<Vec<_>>(),
            );
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
                Settle::Stationary => return Ok(outcome(true, weights, value, iteration)),
                Settle::Stalled => return Ok(outcome(false, weights, value, iteration)),
            }
        }

        Ok(outcome(false, weights, value, problem.max_iters))
    }
}

fn outcome(converged: bool, weights: Vec<f64>, value: f64, iterations: usize) -> SolverOutcome {
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
    fn descends_towards_the_dominant_feature() {
        let rows = vec![
            vec![60.0, 30.0, 45.0],
            vec![72.0, 81.0, 20.0],
            vec![88.0, 40.0, 65.0],
            vec![51.0, 77.0, 90.0],
        ];
        let y = rows.iter().map(|r| r[0]).collect::<Vec<_>>();
        let x = DesignMatrix::from_rows(&rows).expect("rectangular");
        let mare = Mare::new(&x, &y);
        let initial = uniform_weights(3);
        let start = mare.value(&initial);
        let out = ProjectedSubgradient::default()
            .solve(&SimplexProblem {
                objective: &mare,
                initial: &initial,
                max_iters: 1000,
            })
            .expect("no numerical failure");
        assert!(out.value < start);
        assert!(out.weights[0] > out.weights[1]);
        assert!(out.weights[0] > out.weights[2]);
        assert!(out.weights.iter().all(|w| *w >= 0.0));
        assert!((out.weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn an_exhausted_budget_is_reported_as_not_converged() {
        let rows = vec![vec![10.0, 90.0], vec![80.0, 20.0], vec![50.0, 55.0]];
        let y = vec![30.0, 60.0, 52.0];
        let x = DesignMatrix::from_rows(&rows).expect("rectangular");
        let mare = Mare::new(&x, &y);
        let initial = uniform_weights(2);
        let out = ProjectedSubgradient::default()
            .solve(&SimplexProblem {
                objective: &mare,
                initial: &initial,
                max_iters: 1,
            })
            .expect("no numerical failure");
        assert!(!out.converged);
        assert_eq!(out.iterations, 1);
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
        let out = ProjectedSubgradient::default()
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
