use crate::fit::FitError;
use crate::player::PlayerRecord;
use crate::stats::{Position, StatName, Target};

/// Row-major feature matrix; column `j` holds the `j`-th requested statistic.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DesignMatrix {
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let cols = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != cols) {
            return None;
        }
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Some(Self {
            rows: rows.len(),
            cols,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, idx: usize) -> &[f64] {
        let start = idx * self.cols;
        &self.data[start..start + self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact rejects a zero chunk size.
        self.data.chunks_exact(self.cols.max(1))
    }

    pub fn dot_row(&self, idx: usize, weights: &[f64]) -> f64 {
        self.row(idx).iter().zip(weights).map(|(x, w)| x * w).sum()
    }

    fn retain_rows(&mut self, keep: &[bool]) {
        let cols = self.cols;
        let mut data = Vec::with_capacity(self.data.len());
        for (idx, row) in self.data.chunks_exact(cols.max(1)).enumerate() {
            if keep[idx] {
                data.extend_from_slice(row);
            }
        }
        self.rows = keep.iter().filter(|k| **k).count();
        self.data = data;
    }
}

/// Feature matrix and target vector for one position.
#[derive(Debug, Clone, PartialEq)]
pub struct Cohort {
    pub position: Position,
    pub features: Vec<StatName>,
    pub target: Target,
    pub x: DesignMatrix,
    pub y: Vec<f64>,
}

impl Cohort {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Removes rows whose target is exactly zero and returns how many were dropped.
    pub fn drop_zero_targets(&mut self) -> usize {
        let keep = self.y.iter().map(|v| *v != 0.0).collect::<Vec<_>>();
        let dropped = keep.iter().filter(|k| !**k).count();
        if dropped == 0 {
            return 0;
        }
        self.x.retain_rows(&keep);
        self.y = self
            .y
            .iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(v, _)| *v)
            .collect();
        dropped
    }
}

pub fn cohort_members(
    records: &[PlayerRecord],
    position: Position,
) -> impl Iterator<Item = &PlayerRecord> {
    records.iter().filter(move |r| r.position == position)
}

pub fn project(
    records: &[PlayerRecord],
    position: Position,
    features: &[StatName],
    target: Target,
) -> Result<Cohort, FitError> {
    if features.is_empty() {
        return Err(FitError::NoFeatures { position });
    }

    let cols = features.len();
    let mut data = Vec::new();
    let mut y = Vec::new();
    for record in cohort_members(records, position) {
        data.extend(features.iter().map(|stat| record.stats.get(*stat)));
        y.push(record.target_value(target));
    }
    if y.is_empty() {
        return Err(FitError::EmptyCohort { position });
    }

    Ok(Cohort {
        position,
        features: features.to_vec(),
        target,
        x: DesignMatrix {
            rows: y.len(),
            cols,
            data,
        },
        y,
    })
}
