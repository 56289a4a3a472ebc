use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use fc_rating_weights::batch::{default_features, fit_all_positions};
use fc_rating_weights::cohort::project;
use fc_rating_weights::fit::WeightFitter;
use fc_rating_weights::objective::Mare;
use fc_rating_weights::solver::{
    ActiveSetIrls, DEFAULT_MAX_ITERS, ExponentiatedGradient, ProjectedSubgradient,
    SimplexProblem, SolverStrategy, uniform_weights,
};
use fc_rating_weights::stats::{Position, Target};
use fc_rating_weights::synthetic::generate_with_noise;

fn bench_single_position_fit(c: &mut Criterion) {
    let players = generate_with_noise(2_400, 5, 0.02);
    let fitter = WeightFitter::default();
    c.bench_function("fit_single_position_st", |b| {
        b.iter(|| {
            let result = fitter
                .fit(
                    black_box(&players),
                    Position::St,
                    default_features(Position::St),
                    Target::Overall,
                )
                .unwrap();
            black_box(result.mean_error);
        })
    });
}

fn bench_all_positions(c: &mut Criterion) {
    let players = generate_with_noise(6_000, 9, 0.02);
    let fitter = WeightFitter::default();
    c.bench_function("fit_all_positions", |b| {
        b.iter(|| {
            let fits = fit_all_positions(&fitter, black_box(&players), Target::Overall);
            black_box(fits.len());
        })
    });
}

fn bench_strategies(c: &mut Criterion) {
    let players = generate_with_noise(2_400, 13, 0.02);
    let cohort = project(
        &players,
        Position::Cm,
        default_features(Position::Cm),
        Target::Overall,
    )
    .unwrap();
    let mare = Mare::new(&cohort.x, &cohort.y);
    let initial = uniform_weights(cohort.features.len());
    let strategies: Vec<Box<dyn SolverStrategy>> = vec![
        Box::new(ActiveSetIrls::default()),
        Box::new(ProjectedSubgradient::default()),
        Box::new(ExponentiatedGradient::default()),
    ];
    for strategy in &strategies {
        c.bench_function(&format!("strategy_{}", strategy.name()), |b| {
            b.iter(|| {
                let out = strategy
                    .solve(&SimplexProblem {
                        objective: &mare,
                        initial: black_box(&initial),
                        max_iters: DEFAULT_MAX_ITERS,
                    })
                    .unwrap();
                black_box(out.value);
            })
        });
    }
}

criterion_group!(
    perf,
    bench_single_position_fit,
    bench_all_positions,
    bench_strategies
);
criterion_main!(perf);
