use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::fit::{FitError, FitResult, WeightFitter};
use crate::player::PlayerRecord;
use crate::stats::{ALL_POSITIONS, Position, StatName, Target};

pub const GOALKEEPER_FEATURES: [StatName; 5] = [
    StatName::GkDiving,
    StatName::GkHandling,
    StatName::GkKicking,
    StatName::GkPositioning,
    StatName::GkReflexes,
];

pub const OUTFIELD_FEATURES: [StatName; 6] = [
    StatName::Pac,
    StatName::Sho,
    StatName::Pas,
    StatName::Dri,
    StatName::Def,
    StatName::Phy,
];

pub fn default_features(position: Position) -> &'static [StatName] {
    if position.is_goalkeeper() {
        &GOALKEEPER_FEATURES
    } else {
        &OUTFIELD_FEATURES
    }
}

#[derive(Debug)]
pub struct PositionFit {
    pub position: Position,
    pub result: Result<FitResult, FitError>,
}

/// Fits every position independently; output keeps `ALL_POSITIONS` order.
pub fn fit_all_positions(
    fitter: &WeightFitter,
    records: &[PlayerRecord],
    target: Target,
) -> Vec<PositionFit> {
    ALL_POSITIONS
        .par_iter()
        .map(|&position| PositionFit {
            position,
            result: fitter.fit(records, position, default_features(position), target),
        })
        .collect()
}

/// Weights keyed by statistic, serialized as a JSON object in feature order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedWeights(pub Vec<(String, f64)>);

impl Serialize for OrderedWeights {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, weight) in &self.0 {
            map.serialize_entry(name, weight)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OrderedWeights {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct WeightsVisitor;

        impl<'de> Visitor<'de> for WeightsVisitor {
            type Value = OrderedWeights;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of statistic name to weight")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, weight)) = access.next_entry::<String, f64>()? {
                    out.push((name, weight));
                }
                Ok(OrderedWeights(out))
            }
        }

        deserializer.deserialize_map(WeightsVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Optimization {
    pub name: String,
    pub position_short_label: Position,
    pub varying_stats_names: Vec<StatName>,
    pub target_stat_name: Target,
    pub optimized_weights: OrderedWeights,
    pub mean_error: f64,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub samples: usize,
}

impl From<&FitResult> for Optimization {
    fn from(result: &FitResult) -> Self {
        Self {
            name: format!("{} - {}", result.position, result.target.label()),
            position_short_label: result.position,
            varying_stats_names: result.feature_names.clone(),
            target_stat_name: result.target,
            optimized_weights: OrderedWeights(
                result
                    .named_weights()
                    .map(|(stat, w)| (stat.key().to_string(), w))
                    .collect(),
            ),
            mean_error: result.mean_error,
            method: result.outcome.label().to_string(),
            samples: result.samples,
        }
    }
}

/// Successful fits as artifacts; structural failures are logged and skipped.
pub fn collect_optimizations(fits: &[PositionFit]) -> Vec<Optimization> {
    let mut out = Vec::with_capacity(fits.len());
    for fit in fits {
        match &fit.result {
            Ok(result) => out.push(Optimization::from(result)),
            Err(err) => warn!(position = %fit.position, error = %err, "skipping position"),
        }
    }
    out
}

pub fn write_optimizations(path: &Path, optimizations: &[Optimization]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let raw = serde_json::to_string_pretty(optimizations).context("serialize optimizations")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, raw).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}
