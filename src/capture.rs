//! Live-capture side: watches a browser session's network log, classifies
//! responses from the live-data API by URL shape, and persists classified
//! payloads to per-entity files. Also services the file-based work queue an
//! external producer uses to request on-demand fetches.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::browser::{Browser, NetworkEvent};
use crate::config::Config;

const API_MARKER: &str = "api/v1";
const LIVE_LIST_PATH: &str = "sport/football/events/live";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureKind {
    LiveList,
    Detail { id: u64 },
    Stats { id: u64 },
}

impl CaptureKind {
    pub fn label(&self) -> &'static str {
        match self {
            CaptureKind::LiveList => "LIVE_LIST",
            CaptureKind::Detail { .. } => "DETAIL",
            CaptureKind::Stats { .. } => "STATS",
        }
    }

    pub fn destination(&self, cfg: &Config) -> PathBuf {
        match self {
            CaptureKind::LiveList => cfg.live_file.clone(),
            CaptureKind::Detail { id } => cfg.stats_dir.join(format!("{id}_detail.json")),
            CaptureKind::Stats { id } => cfg.stats_dir.join(format!("{id}_stats.json")),
        }
    }
}

/// Classify a response URL. Pure function of URL shape; anything that does
/// not look like a live-data API call is ignored, and event URLs whose
/// trailing segment is not a numeric entity id are discarded as mis-parses.
pub fn classify(url: &str) -> Option<CaptureKind> {
    if !url.contains(API_MARKER) {
        return None;
    }
    if url.contains(LIVE_LIST_PATH) {
        return Some(CaptureKind::LiveList);
    }
    if url.contains("/statistics") {
        let id = entity_id(url, 1)?;
        return Some(CaptureKind::Stats { id });
    }
    if url.contains("/event/") {
        let id = entity_id(url, 0)?;
        return Some(CaptureKind::Detail { id });
    }
    None
}

/// Numeric id `offset` segments from the end of the URL path.
fn entity_id(url: &str, offset: usize) -> Option<u64> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segments: Vec<&str> = path
        .trim_end_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let idx = segments.len().checked_sub(offset + 1)?;
    segments[idx].parse::<u64>().ok()
}

/// Drain the performance log and persist every classified response. One bad
/// event never aborts the drain; only failure to read the log itself
/// escalates.
pub fn process_events(browser: &mut dyn Browser, cfg: &Config) -> Result<usize> {
    let events = browser
        .performance_events()
        .context("reading performance log")?;

    let mut captured = 0;
    for event in events {
        if capture_event(browser, cfg, &event) {
            captured += 1;
        }
    }
    Ok(captured)
}

fn capture_event(browser: &mut dyn Browser, cfg: &Config, event: &NetworkEvent) -> bool {
    let Some(kind) = classify(&event.url) else {
        return false;
    };

    // The body is not inline in the log entry; fetch it out-of-band. By the
    // time we ask, the browser may already have evicted it, in which case the
    // same data will arrive again on the next natural fetch.
    let body = match browser.response_body(&event.request_id) {
        Ok(body) => body,
        Err(err) => {
            debug!(url = %event.url, "response body unavailable: {err:#}");
            return false;
        }
    };
    if body.trim().is_empty() {
        return false;
    }
    let Ok(payload) = serde_json::from_str::<Value>(&body) else {
        debug!(url = %event.url, "unparseable response body, skipping");
        return false;
    };

    let destination = kind.destination(cfg);
    // An API error payload is persisted as-is: its top-level `error` member
    // is the marker that tells consumers "no data" apart from stale data.
    if payload.get("error").is_some() {
        warn!(kind = kind.label(), url = %event.url, "API error payload, writing marker");
    }
    if let Err(err) = write_capture(&destination, &body) {
        warn!(path = %destination.display(), "failed writing capture: {err:#}");
        return false;
    }
    info!(kind = kind.label(), path = %destination.display(), "captured");
    true
}

fn write_capture(destination: &Path, body: &str) -> Result<()> {
    if let Some(dir) = destination.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("create capture dir {}", dir.display()))?;
        }
    }
    fs::write(destination, body)
        .with_context(|| format!("write {}", destination.display()))?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct StatsRequest {
    #[serde(default)]
    ids: Vec<Value>,
}

/// Consume the work-queue request file if present: parse the entity ids,
/// delete the file (at-most-once), then inject one detail and one statistics
/// fetch per id. The producer regenerates the file on a short cycle, so a
/// lost request is recovered naturally.
pub fn consume_request_queue(browser: &mut dyn Browser, cfg: &Config) -> Result<usize> {
    if !cfg.request_file.exists() {
        return Ok(0);
    }

    let raw = fs::read_to_string(&cfg.request_file)
        .with_context(|| format!("read {}", cfg.request_file.display()))?;
    fs::remove_file(&cfg.request_file)
        .with_context(|| format!("remove {}", cfg.request_file.display()))?;

    let request: StatsRequest = match serde_json::from_str(&raw) {
        Ok(request) => request,
        Err(err) => {
            warn!("unparseable work request, dropped: {err}");
            return Ok(0);
        }
    };

    let mut issued = 0;
    for raw_id in &request.ids {
        let Some(id) = request_id_string(raw_id) else {
            warn!(?raw_id, "ignoring malformed entity id in work request");
            continue;
        };
        info!(id = %id, "on-demand fetch from work queue");
        let detail = format!("fetch('{base}/event/{id}');", base = cfg.api_base);
        let stats = format!("fetch('{base}/event/{id}/statistics');", base = cfg.api_base);
        if let Err(err) = browser.execute_script(&detail) {
            warn!(id = %id, "work-queue fetch injection failed: {err:#}");
            continue;
        }
        browser.wait_fixed(cfg.fetch_gap);
        if let Err(err) = browser.execute_script(&stats) {
            warn!(id = %id, "work-queue fetch injection failed: {err:#}");
            continue;
        }
        issued += 2;
    }
    Ok(issued)
}

fn request_id_string(raw: &Value) -> Option<String> {
    let id = match raw {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(id)
}

/// Inject a live-list fetch so captures keep flowing even when the page
/// itself stops polling.
pub fn trigger_live_refresh(browser: &mut dyn Browser, cfg: &Config) -> Result<()> {
    let script = format!("fetch('{}/{}');", cfg.api_base, LIVE_LIST_PATH);
    browser.execute_script(&script).map(|_| ())
}

/// The continuous capture loop. Never returns in normal operation; an `Err`
/// here is an unexpected fault the caller logs and dies on. Restart is an
/// operational concern, not ours.
pub fn run_loop(browser: &mut dyn Browser, cfg: &Config) -> Result<()> {
    fs::create_dir_all(&cfg.stats_dir)
        .with_context(|| format!("create stats dir {}", cfg.stats_dir.display()))?;

    let mut last_live_refresh: Option<Instant> = None;
    loop {
        process_events(browser, cfg)?;

        let due = last_live_refresh
            .map(|t| t.elapsed() >= cfg.live_refresh)
            .unwrap_or(true);
        if due {
            debug!("periodic live-list refresh");
            trigger_live_refresh(browser, cfg)?;
            last_live_refresh = Some(Instant::now());
        }

        if let Err(err) = consume_request_queue(browser, cfg) {
            warn!("work-queue processing error: {err:#}");
        }

        browser.wait_fixed(cfg.poll_interval);
    }
}
