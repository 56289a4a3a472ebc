pub mod batch;
pub mod cohort;
pub mod config;
pub mod ea_ratings;
pub mod fit;
pub mod objective;
pub mod player;
pub mod report;
pub mod solver;
pub mod stats;
pub mod synthetic;

pub use batch::{Optimization, PositionFit, default_features, fit_all_positions};
pub use fit::{FitError, FitOutcome, FitResult, WeightFitter, fit_weights};
pub use player::{PlayerRecord, PlayerSet, StatLine};
pub use stats::{ALL_POSITIONS, Position, StatName, Target};
