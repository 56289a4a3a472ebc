use std::env;
use std::path::PathBuf;

use anyhow::{Result, anyhow};

use fc_rating_weights::config::{self, arg_value};
use fc_rating_weights::ea_ratings::{self, FetchConfig, StopReason};

fn parse_usize_arg(args: &[String], flag: &str) -> Result<Option<usize>> {
    arg_value(args, flag)
        .map(|raw| {
            raw.trim()
                .parse::<usize>()
                .map_err(|_| anyhow!("invalid value for {flag}: {raw}"))
        })
        .transpose()
}

fn main() -> Result<()> {
    config::load_dotenv();
    config::init_tracing();

    let args = env::args().skip(1).collect::<Vec<_>>();
    let mut cfg = FetchConfig::from_env();
    if let Some(path) = arg_value(&args, "--out") {
        cfg.snapshot_path = PathBuf::from(path);
    }
    if let Some(limit) = parse_usize_arg(&args, "--limit")? {
        cfg.page_limit = limit.max(1);
    }
    if let Some(pages) = parse_usize_arg(&args, "--max-pages")? {
        cfg.max_pages = Some(pages).filter(|n| *n > 0);
    }
    if let Some(locale) = arg_value(&args, "--locale") {
        cfg.locale = Some(locale);
    }

    let summary = ea_ratings::fetch_all_players(&cfg)?;
    println!(
        "fetched {} players in {} pages into {}",
        summary.players,
        summary.pages,
        cfg.snapshot_path.display()
    );
    if summary.stopped == StopReason::Failure {
        println!(
            "stopped early on a failed request, see {}",
            cfg.error_log_path.display()
        );
    }
    Ok(())
}
