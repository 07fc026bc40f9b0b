use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
const DEFAULT_API_BASE: &str = "https://www.sofascore.com/api/v1";
const DEFAULT_LIVE_SITE: &str = "https://www.sofascore.com/";

#[derive(Debug, Clone)]
pub struct Config {
    /// Root for everything the process writes.
    pub data_dir: PathBuf,
    /// Consensus prediction store (source id -> records).
    pub store_file: PathBuf,
    /// Single well-known destination for the live events list.
    pub live_file: PathBuf,
    /// Per-entity `{id}_detail.json` / `{id}_stats.json` files.
    pub stats_dir: PathBuf,
    /// Work-queue request file written by the external producer.
    pub request_file: PathBuf,
    pub webdriver_url: String,
    /// Live-data API the capture loop injects fetches against.
    pub api_base: String,
    /// Page the capture session parks on to observe traffic.
    pub live_site_url: String,
    pub poll_interval: Duration,
    pub live_refresh: Duration,
    /// Gap between queued on-demand fetches, to avoid bursts.
    pub fetch_gap: Duration,
    /// Cooldown between source adapter runs.
    pub source_cooldown: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let data_dir = PathBuf::from(env_str("TIPFEED_DATA_DIR", DEFAULT_DATA_DIR));
        let store_file = env_path("TIPFEED_STORE_FILE")
            .unwrap_or_else(|| data_dir.join("consensus.json"));
        let live_file = env_path("TIPFEED_LIVE_FILE")
            .unwrap_or_else(|| data_dir.join("live.json"));
        let stats_dir = env_path("TIPFEED_STATS_DIR").unwrap_or_else(|| data_dir.join("stats"));
        let request_file = env_path("TIPFEED_REQUEST_FILE")
            .unwrap_or_else(|| data_dir.join("stats_request.json"));

        Self {
            data_dir,
            store_file,
            live_file,
            stats_dir,
            request_file,
            webdriver_url: env_str("WEBDRIVER_URL", DEFAULT_WEBDRIVER_URL),
            api_base: env_str("LIVE_API_BASE", DEFAULT_API_BASE),
            live_site_url: env_str("LIVE_SITE_URL", DEFAULT_LIVE_SITE),
            poll_interval: Duration::from_secs(env_secs("CAPTURE_POLL_SECS", 10).max(1)),
            live_refresh: Duration::from_secs(env_secs("LIVE_REFRESH_SECS", 60).max(10)),
            fetch_gap: Duration::from_millis(env_u64("FETCH_GAP_MS", 500)),
            source_cooldown: Duration::from_secs(env_secs("SOURCE_COOLDOWN_SECS", 5)),
        }
    }
}

fn env_str(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw.trim().to_string(),
        _ => default.to_string(),
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

fn env_secs(key: &str, default: u64) -> u64 {
    env_u64(key, default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse::<u64>().ok())
        .unwrap_or(default)
}
