use crate::cohort::cohort_members;
use crate::fit::FitResult;
use crate::player::PlayerRecord;

pub const DEFAULT_SAMPLE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct SamplePrediction {
    pub index: usize,
    pub name: Option<String>,
    pub actual: f64,
    pub predicted: f64,
    /// `None` when the actual value is zero.
    pub relative_error: Option<f64>,
}

/// Predictions for the first `limit` members of the fitted cohort, in input order.
pub fn sample_predictions(
    records: &[PlayerRecord],
    result: &FitResult,
    limit: usize,
) -> Vec<SamplePrediction> {
    cohort_members(records, result.position)
        .take(limit)
        .enumerate()
        .map(|(index, record)| {
            let actual = record.target_value(result.target);
            let predicted = result.predict(record);
            let relative_error = if actual != 0.0 {
                Some(((predicted - actual) / actual).abs())
            } else {
                None
            };
            SamplePrediction {
                index,
                name: record.name.clone(),
                actual,
                predicted,
                relative_error,
            }
        })
        .collect()
}

pub fn format_weights(result: &FitResult) -> String {
    result
        .named_weights()
        .map(|(stat, w)| format!("{stat}={w:.4}"))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_sample(sample: &SamplePrediction) -> String {
    let who = sample
        .name
        .clone()
        .unwrap_or_else(|| format!("Player {}", sample.index + 1));
    match sample.relative_error {
        Some(err) => format!(
            "  {who}: Actual={:.1}, Predicted={:.1}, Error={:.2}%",
            sample.actual,
            sample.predicted,
            err * 100.0
        ),
        None => format!(
            "  {who}: Actual={:.1}, Predicted={:.1}",
            sample.actual, sample.predicted
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::FitOutcome;
    use crate::player::StatLine;
    use crate::stats::{Position, StatName, Target};

    #[test]
    fn samples_follow_cohort_order_and_skip_zero_errors() {
        let mk = |overall: f64, sho: f64| {
            PlayerRecord::new(
                Position::St,
                overall,
                StatLine::default().with(StatName::Sho, sho),
            )
        };
        let records = vec![
            mk(80.0, 80.0),
            PlayerRecord::new(Position::Gk, 70.0, StatLine::default()),
            mk(0.0, 50.0),
            mk(60.0, 66.0),
        ];
        let result = FitResult {
            position: Position::St,
            feature_names: vec![StatName::Sho],
            target: Target::Overall,
            weights: vec![1.0],
            mean_error: 0.0,
            outcome: FitOutcome::Solved {
                method: "test".into(),
            },
            samples: 2,
            dropped_zero_targets: 1,
        };
        let samples = sample_predictions(&records, &result, 2);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].relative_error, Some(0.0));
        assert_eq!(samples[1].relative_error, None);
        assert_eq!(samples[1].predicted, 50.0);
        assert_eq!(
            format_sample(&samples[0]),
            "  Player 1: Actual=80.0, Predicted=80.0, Error=0.00%"
        );
        assert_eq!(format_weights(&result), "sho=1.0000");
    }
}
