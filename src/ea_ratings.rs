use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, ORIGIN, REFERER};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::{DEFAULT_PLAYERS_PATH, env_lookup, lookup_parse, lookup_string};
use crate::player::{PlayerSet, load_snapshot};

pub const DEFAULT_API_BASE: &str = "https://drop-api.ea.com/rating/ea-sports-fc";
pub const DEFAULT_ERROR_LOG_PATH: &str = "ea_fc_players_errors.txt";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36";
const RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

static CLIENT: OnceCell<Client> = OnceCell::new();

#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    pub api_base: String,
    pub page_limit: usize,
    pub gender: u32,
    pub locale: Option<String>,
    pub max_pages: Option<usize>,
    pub snapshot_path: PathBuf,
    pub error_log_path: PathBuf,
    pub request_timeout: Duration,
    pub page_delay: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            page_limit: 100,
            gender: 0,
            locale: None,
            max_pages: None,
            snapshot_path: PathBuf::from(DEFAULT_PLAYERS_PATH),
            error_log_path: PathBuf::from(DEFAULT_ERROR_LOG_PATH),
            request_timeout: Duration::from_secs(20),
            page_delay: Duration::from_millis(150),
            max_retries: 5,
            backoff_base: Duration::from_millis(500),
        }
    }
}

impl FetchConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(base) = lookup_string(&lookup, "EA_API_BASE") {
            cfg.api_base = base;
        }
        if let Some(limit) = lookup_parse::<usize>(&lookup, "EA_PAGE_LIMIT") {
            cfg.page_limit = limit.max(1);
        }
        if let Some(gender) = lookup_parse::<u32>(&lookup, "EA_GENDER") {
            cfg.gender = gender;
        }
        cfg.locale = lookup_string(&lookup, "EA_LOCALE");
        cfg.max_pages = lookup_parse::<usize>(&lookup, "EA_MAX_PAGES").filter(|n| *n > 0);
        if let Some(path) = lookup_string(&lookup, "PLAYERS_JSON_PATH") {
            cfg.snapshot_path = PathBuf::from(path);
        }
        if let Some(path) = lookup_string(&lookup, "EA_ERROR_LOG_PATH") {
            cfg.error_log_path = PathBuf::from(path);
        }
        if let Some(secs) = lookup_parse::<u64>(&lookup, "EA_REQUEST_TIMEOUT_SECS") {
            cfg.request_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(ms) = lookup_parse::<u64>(&lookup, "EA_PAGE_DELAY_MS") {
            cfg.page_delay = Duration::from_millis(ms);
        }
        cfg
    }

    pub fn query(&self, offset: usize) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("limit", self.page_limit.to_string()),
            ("offset", offset.to_string()),
            ("gender", self.gender.to_string()),
        ];
        if let Some(locale) = &self.locale {
            query.push(("locale", locale.clone()));
        }
        query
    }

    /// Delay before retry number `retry` (1-based), doubling each time.
    pub fn backoff(&self, retry: u32) -> Duration {
        self.backoff_base
            .saturating_mul(1_u32 << retry.saturating_sub(1).min(16))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EmptyPage,
    PageCap,
    Failure,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchSummary {
    pub pages: usize,
    pub players: usize,
    pub stopped: StopReason,
}

#[derive(Serialize)]
struct Snapshot<'a> {
    count: usize,
    items: &'a [Value],
}

fn http_client(cfg: &FetchConfig) -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ORIGIN, HeaderValue::from_static("https://www.ea.com"));
        headers.insert(REFERER, HeaderValue::from_static("https://www.ea.com/"));
        Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(cfg.request_timeout)
            .build()
            .context("failed to build http client")
    })
}

fn is_retryable(status: StatusCode) -> bool {
    RETRY_STATUSES.contains(&status.as_u16())
}

/// Extracts the `items` list of one page; a missing or null list is an empty page.
pub fn page_items(payload: Value) -> Result<Vec<Value>> {
    match payload {
        Value::Object(mut map) => match map.remove("items") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(anyhow!(
                "unexpected payload schema: `items` is {}",
                json_kind(&other)
            )),
        },
        other => Err(anyhow!(
            "unexpected payload schema: expected an object, got {}",
            json_kind(&other)
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// GETs one page, retrying transport errors and throttling/server statuses.
pub fn fetch_page(cfg: &FetchConfig, offset: usize) -> Result<Vec<Value>> {
    let client = http_client(cfg)?;
    let query = cfg.query(offset);
    let mut retry = 0;
    loop {
        let sent = client.get(&cfg.api_base).query(&query).send();
        let failure = match sent {
            Ok(res) if res.status().is_success() => {
                let payload = res
                    .json::<Value>()
                    .with_context(|| format!("decode page at offset {offset}"))?;
                return page_items(payload);
            }
            Ok(res) if is_retryable(res.status()) => anyhow!("status {}", res.status()),
            Ok(res) => {
                return Err(anyhow!("status {} at offset {offset}", res.status()));
            }
            Err(err) => anyhow::Error::new(err).context(format!("request offset {offset}")),
        };
        if retry >= cfg.max_retries {
            return Err(failure.context(format!("giving up after {retry} retries")));
        }
        retry += 1;
        let wait = cfg.backoff(retry);
        warn!(offset, retry, wait_ms = wait.as_millis() as u64, error = %failure, "retrying page");
        thread::sleep(wait);
    }
}

pub fn save_snapshot(path: &Path, items: &[Value]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let raw = serde_json::to_string_pretty(&Snapshot {
        count: items.len(),
        items,
    })
    .context("serialize snapshot")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, raw).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}

pub fn append_error_log(path: &Path, message: &str, err: &anyhow::Error) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))?;
    let stamp = chrono::Utc::now().to_rfc3339();
    write!(
        file,
        "[{stamp}] {}\n{err:?}\n{}\n",
        message.trim_end(),
        "-".repeat(80)
    )
    .with_context(|| format!("append {}", path.display()))?;
    Ok(())
}

fn report_failure(cfg: &FetchConfig, message: &str, err: &anyhow::Error) {
    error!(error = %err, "{message}");
    if let Err(log_err) = append_error_log(&cfg.error_log_path, message, err) {
        error!(error = %log_err, "failed writing error log");
    }
}

/// Pages through `fetch` by offset until an empty page, a failure or the page
/// cap. The snapshot is rewritten after every page. Only a snapshot write
/// failure is returned as an error; page failures end the run.
pub fn collect_pages(
    cfg: &FetchConfig,
    mut fetch: impl FnMut(usize) -> Result<Vec<Value>>,
) -> Result<FetchSummary> {
    let mut items: Vec<Value> = Vec::new();
    let mut pages = 0;
    let mut offset = 0;

    let stopped = loop {
        let page = match fetch(offset) {
            Ok(page) => page,
            Err(err) => {
                let message = format!(
                    "[EA FC Ratings] Request failed at offset={offset}, limit={}.",
                    cfg.page_limit
                );
                report_failure(cfg, &message, &err);
                break StopReason::Failure;
            }
        };
        if page.is_empty() {
            break StopReason::EmptyPage;
        }

        offset += page.len();
        items.extend(page);
        pages += 1;
        save_snapshot(&cfg.snapshot_path, &items)?;
        info!(pages, players = items.len(), "page saved");

        if let Some(cap) = cfg.max_pages
            && pages >= cap
        {
            break StopReason::PageCap;
        }
        if !cfg.page_delay.is_zero() {
            thread::sleep(cfg.page_delay);
        }
    };

    // Every collected page is already on disk; an existing snapshot survives a run with none.
    if pages == 0 {
        if cfg.snapshot_path.exists() {
            warn!(
                path = %cfg.snapshot_path.display(),
                "no pages fetched, keeping the existing snapshot"
            );
        } else {
            save_snapshot(&cfg.snapshot_path, &items)?;
        }
    }
    Ok(FetchSummary {
        pages,
        players: items.len(),
        stopped,
    })
}

pub fn fetch_all_players(cfg: &FetchConfig) -> Result<FetchSummary> {
    info!(api = %cfg.api_base, limit = cfg.page_limit, "fetching EA FC ratings");
    collect_pages(cfg, |offset| fetch_page(cfg, offset))
}

/// Reads the snapshot when present (unless `force_fetch`), otherwise fetches it first.
pub fn load_or_fetch(cfg: &FetchConfig, force_fetch: bool) -> Result<PlayerSet> {
    if force_fetch || !cfg.snapshot_path.exists() {
        let summary = fetch_all_players(cfg)?;
        info!(
            pages = summary.pages,
            players = summary.players,
            stopped = ?summary.stopped,
            "fetch finished"
        );
    }
    let set = load_snapshot(&cfg.snapshot_path)
        .with_context(|| format!("load {}", cfg.snapshot_path.display()))?;
    if set.skipped_unknown_position > 0 {
        warn!(
            skipped = set.skipped_unknown_position,
            "players with unknown positions were skipped"
        );
    }
    Ok(set)
}
