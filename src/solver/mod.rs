//! Constrained minimization of the MARE objective over the probability simplex
//! `{ w : w_i >= 0, sum(w) = 1 }`.
//!
//! A [`SolverDriver`] runs an ordered list of [`SolverStrategy`] implementations
//! from the same uniform starting point, keeps the best converged candidate and
//! falls back to the uniform vector when none converges.

mod active_set;
mod mirror;
mod pairwise;
mod simplex;
mod subgradient;

use thiserror::Error;
use tracing::{debug, warn};

use crate::objective::Mare;

pub use active_set::ActiveSetIrls;
pub use mirror::ExponentiatedGradient;
pub use simplex::{project_onto_simplex, rescale_to_unit_sum, uniform_weights};
pub use subgradient::ProjectedSubgradient;

pub const DEFAULT_MAX_ITERS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("singular linear system (pivot {pivot:.3e} in column {column})")]
    SingularMatrix { column: usize, pivot: f64 },

    #[error("initial guess has {got} components, objective has {expected} features")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("initial guess is not a point of the simplex")]
    InfeasibleStart,

    #[error("objective evaluated to a non-finite value at iteration {iteration}")]
    NonFiniteObjective { iteration: usize },

    #[error("active-set iteration did not terminate after {iterations} steps")]
    ActiveSetCycling { iterations: usize },
}

/// One constrained minimization run. Bounds (`w_i >= 0`) and the equality
/// (`sum(w) = 1`) are implied by the type.
#[derive(Debug, Clone, Copy)]
pub struct SimplexProblem<'a> {
    pub objective: &'a Mare<'a>,
    pub initial: &'a [f64],
    pub max_iters: usize,
}

impl SimplexProblem<'_> {
    pub fn n_features(&self) -> usize {
        self.objective.n_features()
    }

    /// Shared precondition check for strategies.
    pub fn validate(&self) -> Result<(), SolverError> {
        let expected = self.n_features();
        if self.initial.len() != expected {
            return Err(SolverError::DimensionMismatch {
                expected,
                got: self.initial.len(),
            });
        }
        let sum: f64 = self.initial.iter().sum();
        if expected == 0
            || self.initial.iter().any(|w| !w.is_finite() || *w < 0.0)
            || (sum - 1.0).abs() > 1e-9
        {
            return Err(SolverError::InfeasibleStart);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverOutcome {
    pub converged: bool,
    pub weights: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
}

pub trait SolverStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn solve(&self, problem: &SimplexProblem<'_>) -> Result<SolverOutcome, SolverError>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum DriverSource {
    Solver { method: &'static str },
    UniformFallback,
}

/// Best converged candidate, or the uniform vector when nothing converged.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverOutcome {
    pub weights: Vec<f64>,
    pub value: f64,
    pub source: DriverSource,
}

pub struct SolverDriver {
    strategies: Vec<Box<dyn SolverStrategy>>,
    max_iters: usize,
}

impl Default for SolverDriver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERS)
    }
}

impl SolverDriver {
    /// The standard strategy order: active-set IRLS, projected subgradient,
    /// exponentiated gradient.
    pub fn new(max_iters: usize) -> Self {
        let strategies: Vec<Box<dyn SolverStrategy>> = vec![
            Box::new(ActiveSetIrls::default()),
            Box::new(ProjectedSubgradient::default()),
            Box::new(ExponentiatedGradient::default()),
        ];
        Self::with_strategies(strategies, max_iters)
    }

    pub fn with_strategies(strategies: Vec<Box<dyn SolverStrategy>>, max_iters: usize) -> Self {
        Self {
            strategies,
            max_iters: max_iters.max(1),
        }
    }

    pub fn max_iters(&self) -> usize {
        self.max_iters
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    pub fn solve(&self, objective: &Mare<'_>) -> DriverOutcome {
        let initial = uniform_weights(objective.n_features());
        let problem = SimplexProblem {
            objective,
            initial: &initial,
            max_iters: self.max_iters,
        };

        let mut best: Option<(&'static str, SolverOutcome)> = None;
        for strategy in &self.strategies {
            let method = strategy.name();
            let outcome = match strategy.solve(&problem) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(method, error = %err, "optimization method failed");
                    continue;
                }
            };
            debug!(
                method,
                converged = outcome.converged,
                value = outcome.value,
                iterations = outcome.iterations,
                "optimization method finished"
            );
            if !outcome.converged || !is_usable(&outcome) {
                continue;
            }
            let improves = best
                .as_ref()
                .map(|(_, current)| outcome.value < current.value)
                .unwrap_or(true);
            if improves {
                best = Some((method, outcome));
            }
        }

        match best {
            Some((method, outcome)) => DriverOutcome {
                weights: outcome.weights,
                value: outcome.value,
                source: DriverSource::Solver { method },
            },
            None => {
                warn!("all optimization methods failed, using uniform weights");
                let value = objective.value(&initial);
                DriverOutcome {
                    weights: initial,
                    value,
                    source: DriverSource::UniformFallback,
                }
            }
        }
    }
}

fn is_usable(outcome: &SolverOutcome) -> bool {
    outcome.value.is_finite() && outcome.weights.iter().all(|w| w.is_finite())
}

fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::DesignMatrix;

    struct Fixed {
        name: &'static str,
        result: Result<SolverOutcome, SolverError>,
    }

    impl SolverStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn solve(&self, _problem: &SimplexProblem<'_>) -> Result<SolverOutcome, SolverError> {
            self.result.clone()
        }
    }

    fn fixed(
        name: &'static str,
        converged: bool,
        weights: [f64; 2],
        value: f64,
    ) -> Box<dyn SolverStrategy> {
        Box::new(Fixed {
            name,
            result: Ok(SolverOutcome {
                converged,
                weights: weights.to_vec(),
                value,
                iterations: 1,
            }),
        })
    }

    fn failing(name: &'static str, err: SolverError) -> Box<dyn SolverStrategy> {
        Box::new(Fixed {
            name,
            result: Err(err),
        })
    }

    fn data() -> (DesignMatrix, Vec<f64>) {
        let x = DesignMatrix::from_rows(&[vec![60.0, 80.0], vec![70.0, 50.0], vec![90.0, 40.0]])
            .expect("rectangular");
        (x, vec![66.0, 64.0, 75.0])
    }

    #[test]
    fn lowest_converged_value_wins_and_ties_keep_the_first() {
        let (x, y) = data();
        let mare = Mare::new(&x, &y);
        let driver = SolverDriver::with_strategies(
            vec![
                fixed("a", true, [0.6, 0.4], 0.2),
                fixed("b", false, [0.9, 0.1], 0.0),
                fixed("c", true, [0.7, 0.3], 0.1),
                fixed("d", true, [0.8, 0.2], 0.1),
            ],
            10,
        );
        let out = driver.solve(&mare);
        assert_eq!(out.source, DriverSource::Solver { method: "c" });
        assert_eq!(out.weights, vec![0.7, 0.3]);
        assert_eq!(out.value, 0.1);
    }

    #[test]
    fn failures_are_skipped_and_exhaustion_falls_back_to_uniform() {
        let (x, y) = data();
        let mare = Mare::new(&x, &y);
        let driver = SolverDriver::with_strategies(
            vec![
                failing(
                    "broken",
                    SolverError::SingularMatrix {
                        column: 0,
                        pivot: 0.0,
                    },
                ),
                fixed("stalled", false, [1.0, 0.0], 0.01),
            ],
            10,
        );
        let out = driver.solve(&mare);
        assert_eq!(out.source, DriverSource::UniformFallback);
        assert_eq!(out.weights, vec![0.5, 0.5]);
        assert!((out.value - mare.value(&[0.5, 0.5])).abs() < 1e-15);
    }

    #[test]
    fn a_failing_first_method_does_not_block_later_ones() {
        let (x, y) = data();
        let mare = Mare::new(&x, &y);
        let driver = SolverDriver::with_strategies(
            vec![
                failing("broken", SolverError::InfeasibleStart),
                fixed("ok", true, [0.3, 0.7], 0.05),
            ],
            10,
        );
        let out = driver.solve(&mare);
        assert_eq!(out.source, DriverSource::Solver { method: "ok" });
    }

    #[test]
    fn non_finite_candidates_are_rejected() {
        let (x, y) = data();
        let mare = Mare::new(&x, &y);
        let driver = SolverDriver::with_strategies(
            vec![fixed("nan", true, [f64::NAN, 1.0], f64::NAN)],
            10,
        );
        assert_eq!(driver.solve(&mare).source, DriverSource::UniformFallback);
    }

    #[test]
    fn default_driver_tries_three_methods_in_order() {
        let driver = SolverDriver::default();
        assert_eq!(
            driver.strategy_names(),
            vec!["active-set-irls", "projected-subgradient", "exponentiated-gradient"]
        );
        assert_eq!(driver.max_iters(), DEFAULT_MAX_ITERS);
    }

    #[test]
    fn validate_rejects_bad_starts() {
        let (x, y) = data();
        let mare = Mare::new(&x, &y);
        let short = [1.0];
        let problem = SimplexProblem {
            objective: &mare,
            initial: &short,
            max_iters: 5,
        };
        assert_eq!(
            problem.validate(),
            Err(SolverError::DimensionMismatch {
                expected: 2,
                got: 1
            })
        );
        let off = [0.7, 0.7];
        let problem = SimplexProblem {
            objective: &mare,
            initial: &off,
            max_iters: 5,
        };
        assert_eq!(problem.validate(), Err(SolverError::InfeasibleStart));
    }
}
