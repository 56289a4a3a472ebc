use fc_rating_weights::batch::{
    Optimization, collect_optimizations, default_features, fit_all_positions, write_optimizations,
};
use fc_rating_weights::fit::{FitError, FitOutcome, WeightFitter};
use fc_rating_weights::stats::{ALL_POSITIONS, Position, Target};
use fc_rating_weights::synthetic::{generate, true_weights};

#[test]
fn fits_every_position_in_canonical_order() {
    let players = generate(360, 21);
    let fits = fit_all_positions(&WeightFitter::default(), &players, Target::Overall);
    assert_eq!(
        fits.iter().map(|f| f.position).collect::<Vec<_>>(),
        ALL_POSITIONS.to_vec()
    );
    for fit in &fits {
        let result = fit.result.as_ref().expect("every position has players");
        assert_eq!(result.feature_names, default_features(fit.position));
        assert!(matches!(result.outcome, FitOutcome::Solved { .. }));
        assert!(result.mean_error < 1e-3, "{} {}", fit.position, result.mean_error);
        for (got, want) in result.weights.iter().zip(true_weights(fit.position)) {
            assert!((got - want).abs() < 1e-2, "{}: {:?}", fit.position, result.weights);
        }
    }
}

#[test]
fn missing_positions_are_skipped_in_the_artifact() {
    let players = generate(360, 4)
        .into_iter()
        .filter(|p| p.position != Position::Lm)
        .collect::<Vec<_>>();
    let fits = fit_all_positions(&WeightFitter::default(), &players, Target::Overall);
    let lm = fits
        .iter()
        .find(|f| f.position == Position::Lm)
        .expect("lm slot");
    assert_eq!(
        lm.result.as_ref().expect_err("no left midfielders"),
        &FitError::EmptyCohort {
            position: Position::Lm
        }
    );

    let optimizations = collect_optimizations(&fits);
    assert_eq!(optimizations.len(), ALL_POSITIONS.len() - 1);
    assert!(optimizations.iter().all(|o| o.position_short_label != Position::Lm));
}

#[test]
fn writes_optimizations_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("out").join("optimizations.json");
    let players = generate(120, 8);
    let fits = fit_all_positions(&WeightFitter::default(), &players, Target::Overall);
    let optimizations = collect_optimizations(&fits);
    write_optimizations(&path, &optimizations).expect("write");

    let raw = std::fs::read_to_string(&path).expect("read back");
    let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
    let first = &value[0];
    assert_eq!(first["name"], "GK - Overall Rating");
    assert_eq!(first["position_short_label"], "GK");
    assert_eq!(first["target_stat_name"], "overallRating");
    assert_eq!(first["varying_stats_names"][0], "gkDiving");
    assert!(first["optimized_weights"]["gkReflexes"].is_number());

    let back: Vec<Optimization> = serde_json::from_str(&raw).expect("typed");
    assert_eq!(back.len(), optimizations.len());
    for (read, written) in back.iter().zip(&optimizations) {
        assert_eq!(read.name, written.name);
        assert_eq!(read.varying_stats_names, written.varying_stats_names);
        for ((name_r, w_r), (name_w, w_w)) in read
            .optimized_weights
            .0
            .iter()
            .zip(&written.optimized_weights.0)
        {
            assert_eq!(name_r, name_w);
            assert!((w_r - w_w).abs() < 1e-12);
        }
    }
}
