use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::cohort::{self, Cohort};
use crate::objective::{Mare, dot};
use crate::player::PlayerRecord;
use crate::solver::{DriverSource, SolverDriver, rescale_to_unit_sum, uniform_weights};
use crate::stats::{Position, StatName, Target};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FitError {
    #[error("no players found for position {position}")]
    EmptyCohort { position: Position },

    #[error("no feature statistics configured for position {position}")]
    NoFeatures { position: Position },

    #[error(
        "cohort for {position} has a {rows}x{cols} matrix for {features} features and {targets} targets"
    )]
    MalformedCohort {
        position: Position,
        rows: usize,
        cols: usize,
        features: usize,
        targets: usize,
    },
}

/// How the reported weights were obtained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FitOutcome {
    Solved { method: String },
    /// Every target in the cohort was zero; no solver ran.
    DegenerateTargets,
    /// No optimization method converged.
    UniformFallback,
}

impl FitOutcome {
    pub fn label(&self) -> &str {
        match self {
            FitOutcome::Solved { method } => method,
            FitOutcome::DegenerateTargets => "degenerate-targets",
            FitOutcome::UniformFallback => "uniform-fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub position: Position,
    pub feature_names: Vec<StatName>,
    pub target: Target,
    pub weights: Vec<f64>,
    pub mean_error: f64,
    pub outcome: FitOutcome,
    /// Rows that entered the objective (zero targets excluded).
    pub samples: usize,
    pub dropped_zero_targets: usize,
}

impl FitResult {
    pub fn weight_of(&self, stat: StatName) -> Option<f64> {
        self.feature_names
            .iter()
            .position(|s| *s == stat)
            .and_then(|idx| self.weights.get(idx).copied())
    }

    pub fn named_weights(&self) -> impl Iterator<Item = (StatName, f64)> + '_ {
        self.feature_names
            .iter()
            .copied()
            .zip(self.weights.iter().copied())
    }

    pub fn predict(&self, record: &PlayerRecord) -> f64 {
        self.named_weights()
            .map(|(stat, w)| w * record.stats.get(stat))
            .sum()
    }
}

/// Fits one position with the default solver configuration.
pub fn fit_weights(
    records: &[PlayerRecord],
    position: Position,
    feature_names: &[StatName],
    target: Target,
) -> Result<FitResult, FitError> {
    WeightFitter::default().fit(records, position, feature_names, target)
}

#[derive(Default)]
pub struct WeightFitter {
    driver: SolverDriver,
}

impl WeightFitter {
    pub fn new(driver: SolverDriver) -> Self {
        Self { driver }
    }

    pub fn with_max_iters(max_iters: usize) -> Self {
        Self::new(SolverDriver::new(max_iters))
    }

    pub fn driver(&self) -> &SolverDriver {
        &self.driver
    }

    pub fn fit(
        &self,
        records: &[PlayerRecord],
        position: Position,
        feature_names: &[StatName],
        target: Target,
    ) -> Result<FitResult, FitError> {
        let mut cohort = cohort::project(records, position, feature_names, target)?;
        info!(
            position = %position,
            players = cohort.len(),
            features = feature_names.len(),
            "fitting weights"
        );
        let dropped = cohort.drop_zero_targets();
        self.fit_cohort(cohort, dropped)
    }

    /// Solves an already projected and filtered cohort.
    pub fn fit_cohort(
        &self,
        cohort: Cohort,
        dropped_zero_targets: usize,
    ) -> Result<FitResult, FitError> {
        let k = cohort.features.len();
        if k == 0 {
            return Err(FitError::NoFeatures {
                position: cohort.position,
            });
        }
        if cohort.x.cols() != k || cohort.x.rows() != cohort.y.len() {
            return Err(FitError::MalformedCohort {
                position: cohort.position,
                rows: cohort.x.rows(),
                cols: cohort.x.cols(),
                features: k,
                targets: cohort.y.len(),
            });
        }
        if cohort.is_empty() {
            info!(position = %cohort.position, "all targets are zero, using uniform weights");
            return Ok(FitResult {
                position: cohort.position,
                feature_names: cohort.features,
                target: cohort.target,
                weights: uniform_weights(k),
                mean_error: 0.0,
                outcome: FitOutcome::DegenerateTargets,
                samples: 0,
                dropped_zero_targets,
            });
        }

        let mare = Mare::new(&cohort.x, &cohort.y);
        let solved = self.driver.solve(&mare);
        let (weights, outcome) = match solved.source {
            DriverSource::Solver { method } => match rescale_to_unit_sum(&solved.weights) {
                Some(weights) => (
                    weights,
                    FitOutcome::Solved {
                        method: method.to_string(),
                    },
                ),
                None => {
                    warn!(method, "solver returned no positive mass, using uniform weights");
                    (uniform_weights(k), FitOutcome::UniformFallback)
                }
            },
            DriverSource::UniformFallback => (uniform_weights(k), FitOutcome::UniformFallback),
        };
        let mean_error = mare.value(&weights);

        info!(
            position = %cohort.position,
            method = outcome.label(),
            mean_error,
            "fit completed"
        );

        Ok(FitResult {
            position: cohort.position,
            samples: cohort.len(),
            feature_names: cohort.features,
            target: cohort.target,
            weights,
            mean_error,
            outcome,
            dropped_zero_targets,
        })
    }
}

/// Predicted target for a raw feature row in fit order.
pub fn predict_row(result: &FitResult, row: &[f64]) -> f64 {
    dot(&result.weights, row)
}
