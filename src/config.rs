use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

use crate::report::DEFAULT_SAMPLE_SIZE;
use crate::solver::DEFAULT_MAX_ITERS;
use crate::stats::Target;

pub const DEFAULT_PLAYERS_PATH: &str = "ea_fc_players.json";
pub const DEFAULT_OPTIMIZATIONS_PATH: &str = "optimizations.json";
pub const DEFAULT_SYNTHETIC_SEED: u64 = 7;

/// Loads `.env.local` first so it wins over `.env`.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

/// Fmt subscriber filtered by `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

pub fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok()
}

/// Trimmed non-empty value for `key`.
pub fn lookup_string(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key)
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

pub fn lookup_parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup_string(lookup, key).and_then(|val| val.parse::<T>().ok())
}

/// Value of `--flag value` or `--flag=value`.
pub fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if let Some(val) = arg.strip_prefix(&prefix) {
            return Some(val.to_string());
        }
        if arg == flag
            && let Some(next) = iter.next()
        {
            return Some(next.clone());
        }
    }
    None
}

pub fn has_flag(args: &[String], flag: &str) -> bool {
    let prefix = format!("{flag}=");
    args.iter().any(|arg| arg == flag || arg.starts_with(&prefix))
}

fn parse_arg<T: FromStr>(args: &[String], flag: &str) -> Result<Option<T>> {
    match arg_value(args, flag) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| anyhow!("invalid value for {flag}: {raw}")),
        None => Ok(None),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub players_path: PathBuf,
    pub out_path: PathBuf,
    pub target: Target,
    pub sample_predictions: usize,
    pub max_iters: usize,
    /// Refetch even when a snapshot exists.
    pub fetch: bool,
    /// Synthetic population size; replaces the snapshot entirely.
    pub synthetic: Option<usize>,
    pub seed: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            players_path: PathBuf::from(DEFAULT_PLAYERS_PATH),
            out_path: PathBuf::from(DEFAULT_OPTIMIZATIONS_PATH),
            target: Target::Overall,
            sample_predictions: DEFAULT_SAMPLE_SIZE,
            max_iters: DEFAULT_MAX_ITERS,
            fetch: false,
            synthetic: None,
            seed: DEFAULT_SYNTHETIC_SEED,
        }
    }
}

impl RunConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(path) = lookup_string(&lookup, "PLAYERS_JSON_PATH") {
            cfg.players_path = PathBuf::from(path);
        }
        if let Some(path) = lookup_string(&lookup, "OPTIMIZATIONS_JSON_PATH") {
            cfg.out_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup_string(&lookup, "FIT_TARGET") {
            cfg.target = raw
                .parse::<Target>()
                .map_err(|err| anyhow!("FIT_TARGET: {err}"))?;
        }
        if let Some(n) = lookup_parse::<usize>(&lookup, "FIT_SAMPLE_PREDICTIONS") {
            cfg.sample_predictions = n;
        }
        if let Some(n) = lookup_parse::<usize>(&lookup, "FIT_MAX_ITERS") {
            cfg.max_iters = n.max(1);
        }
        Ok(cfg)
    }

    pub fn apply_args(mut self, args: &[String]) -> Result<Self> {
        if let Some(path) = arg_value(args, "--players") {
            self.players_path = PathBuf::from(path);
        }
        if let Some(path) = arg_value(args, "--out") {
            self.out_path = PathBuf::from(path);
        }
        if let Some(raw) = arg_value(args, "--target") {
            self.target = raw
                .parse::<Target>()
                .map_err(|err| anyhow!("--target: {err}"))?;
        }
        if let Some(n) = parse_arg::<usize>(args, "--samples")? {
            self.sample_predictions = n;
        }
        if let Some(n) = parse_arg::<usize>(args, "--max-iters")? {
            self.max_iters = n.max(1);
        }
        if has_flag(args, "--fetch") {
            self.fetch = true;
        }
        if let Some(n) = parse_arg::<usize>(args, "--synthetic")? {
            self.synthetic = Some(n);
        }
        if let Some(seed) = parse_arg::<u64>(args, "--seed")? {
            self.seed = seed;
        }
        Ok(self)
    }
}
