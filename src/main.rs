use std::env;

use anyhow::{Result, bail};
use tracing::{info, warn};

use fc_rating_weights::batch::{collect_optimizations, fit_all_positions, write_optimizations};
use fc_rating_weights::config::{self, RunConfig};
use fc_rating_weights::ea_ratings::{self, FetchConfig};
use fc_rating_weights::fit::WeightFitter;
use fc_rating_weights::report::{format_sample, format_weights, sample_predictions};
use fc_rating_weights::synthetic;

fn main() -> Result<()> {
    config::load_dotenv();
    config::init_tracing();

    let args = env::args().skip(1).collect::<Vec<_>>();
    let cfg = RunConfig::from_env()?.apply_args(&args)?;

    let players = match cfg.synthetic {
        Some(count) => {
            info!(count, seed = cfg.seed, "generating synthetic players");
            synthetic::generate(count, cfg.seed)
        }
        None => {
            let fetch_cfg = FetchConfig {
                snapshot_path: cfg.players_path.clone(),
                ..FetchConfig::from_env()
            };
            ea_ratings::load_or_fetch(&fetch_cfg, cfg.fetch)?.players
        }
    };
    if players.is_empty() {
        bail!("no players available");
    }
    info!(players = players.len(), target = %cfg.target, "fitting all positions");

    let fitter = WeightFitter::with_max_iters(cfg.max_iters);
    let fits = fit_all_positions(&fitter, &players, cfg.target);

    for fit in &fits {
        let result = match &fit.result {
            Ok(result) => result,
            Err(err) => {
                println!("{}: {err}", fit.position);
                continue;
            }
        };
        println!(
            "{} - {}: mean error {:.4}% over {} players [{}]",
            result.position,
            result.target.label(),
            result.mean_error * 100.0,
            result.samples,
            result.outcome.label()
        );
        println!("  weights: {}", format_weights(result));
        for sample in sample_predictions(&players, result, cfg.sample_predictions) {
            println!("{}", format_sample(&sample));
        }
    }

    let optimizations = collect_optimizations(&fits);
    if optimizations.is_empty() {
        warn!("no position could be fitted");
    }
    write_optimizations(&cfg.out_path, &optimizations)?;
    info!(
        path = %cfg.out_path.display(),
        positions = optimizations.len(),
        "optimizations written"
    );
    Ok(())
}
