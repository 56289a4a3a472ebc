use std::fs;
use std::path::PathBuf;

use fc_rating_weights::batch::default_features;
use fc_rating_weights::fit::fit_weights;
use fc_rating_weights::player::{load_snapshot, parse_snapshot_json};
use fc_rating_weights::report::sample_predictions;
use fc_rating_weights::stats::{Position, StatName, Target};

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    path
}

#[test]
fn loads_the_ea_snapshot_fixture() {
    let set = load_snapshot(&fixture_path("ea_fc_players_sample.json")).expect("fixture should parse");
    assert_eq!(set.players.len(), 7);
    assert_eq!(set.skipped_unknown_position, 1);

    let haaland = &set.players[0];
    assert_eq!(haaland.name.as_deref(), Some("Erling Haaland"));
    assert_eq!(haaland.position, Position::St);
    assert_eq!(haaland.stats.get(StatName::Aggression), 84.0);
    assert_eq!(haaland.stats.get(StatName::GkDiving), 0.0);

    let rodri = set
        .players
        .iter()
        .find(|p| p.position == Position::Cdm)
        .expect("cdm");
    assert_eq!(rodri.name.as_deref(), Some("Rodri"));

    let van_dijk = set
        .players
        .iter()
        .find(|p| p.position == Position::Cb)
        .expect("cb");
    assert_eq!(van_dijk.stats.get(StatName::Aggression), 81.0);
}

#[test]
fn goalkeeper_fit_skips_the_unrated_keeper() {
    let raw = fs::read_to_string(fixture_path("ea_fc_players_sample.json")).expect("fixture");
    let set = parse_snapshot_json(&raw).expect("fixture should parse");
    let result = fit_weights(
        &set.players,
        Position::Gk,
        default_features(Position::Gk),
        Target::Overall,
    )
    .expect("two keepers");
    assert_eq!(result.dropped_zero_targets, 1);
    assert_eq!(result.samples, 1);
    assert!((result.weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    assert!(result.mean_error < 1e-4);

    let samples = sample_predictions(&set.players, &result, 10);
    assert_eq!(samples.len(), 2);
    assert_eq!(samples[0].actual, 89.0);
    assert!(samples[0].relative_error.is_some());
    assert_eq!(samples[1].actual, 0.0);
    assert_eq!(samples[1].relative_error, None);
}
