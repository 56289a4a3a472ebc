use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::stats::{Position, StatName, Target};

#[derive(Debug, Error)]
pub enum PlayerDataError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse players json: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Attribute values of one card, indexed by `StatName`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatLine([f64; StatName::COUNT]);

impl Default for StatLine {
    fn default() -> Self {
        Self([0.0; StatName::COUNT])
    }
}

impl StatLine {
    pub fn get(&self, stat: StatName) -> f64 {
        self.0[stat.index()]
    }

    pub fn set(&mut self, stat: StatName, value: f64) {
        self.0[stat.index()] = value;
    }

    pub fn with(mut self, stat: StatName, value: f64) -> Self {
        self.set(stat, value);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerRecord {
    pub name: Option<String>,
    pub position: Position,
    pub overall_rating: f64,
    pub stats: StatLine,
}

impl PlayerRecord {
    pub fn new(position: Position, overall_rating: f64, stats: StatLine) -> Self {
        Self {
            name: None,
            position,
            overall_rating,
            stats,
        }
    }

    pub fn target_value(&self, target: Target) -> f64 {
        match target {
            Target::Overall => self.overall_rating,
            Target::Stat(stat) => self.stats.get(stat),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlayerSet {
    pub players: Vec<PlayerRecord>,
    pub skipped_unknown_position: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct RawStat {
    #[serde(default)]
    value: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPosition {
    #[serde(default)]
    short_label: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPlayer {
    #[serde(default)]
    overall_rating: Option<f64>,
    #[serde(default)]
    stats: HashMap<String, RawStat>,
    position: Option<RawPosition>,
    #[serde(default)]
    common_name: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    items: Vec<RawPlayer>,
}

impl RawPlayer {
    fn display_name(&self) -> Option<String> {
        if let Some(common) = self.common_name.as_deref()
            && !common.trim().is_empty()
        {
            return Some(common.trim().to_string());
        }
        let parts = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    fn into_record(self) -> Option<PlayerRecord> {
        let position = self
            .position
            .as_ref()
            .and_then(|p| Position::from_short_label(&p.short_label))?;
        let name = self.display_name();
        let mut stats = StatLine::default();
        for (key, stat) in &self.stats {
            let Some(stat_name) = StatName::from_key(key) else {
                continue;
            };
            if key != stat_name.key() && self.stats.contains_key(stat_name.key()) {
                continue;
            }
            stats.set(stat_name, stat.value.unwrap_or(0.0));
        }
        Some(PlayerRecord {
            name,
            position,
            overall_rating: self.overall_rating.unwrap_or(0.0),
            stats,
        })
    }
}

fn records_from_raw(raw: Vec<RawPlayer>) -> PlayerSet {
    let mut out = PlayerSet::default();
    for player in raw {
        match player.into_record() {
            Some(record) => out.players.push(record),
            None => out.skipped_unknown_position += 1,
        }
    }
    out
}

/// Parses an EA ratings snapshot (`{"count": n, "items": [...]}`).
pub fn parse_snapshot_json(raw: &str) -> Result<PlayerSet, PlayerDataError> {
    let snapshot: RawSnapshot = serde_json::from_str(raw)?;
    Ok(records_from_raw(snapshot.items))
}

/// Parses player items as returned in one API page.
pub fn parse_items(items: &[serde_json::Value]) -> Result<PlayerSet, PlayerDataError> {
    let raw = items
        .iter()
        .map(|item| serde_json::from_value::<RawPlayer>(item.clone()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records_from_raw(raw))
}

pub fn load_snapshot(path: &Path) -> Result<PlayerSet, PlayerDataError> {
    let raw = fs::read_to_string(path).map_err(|source| PlayerDataError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_snapshot_json(&raw)
}
