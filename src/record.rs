use std::collections::BTreeMap;

use chrono::Local;
use serde::{Deserialize, Serialize};

pub const MARKET_1X2: &str = "1X2";
pub const MARKET_OU25: &str = "OU25";
pub const MARKET_BTTS: &str = "BTTS";

/// Sentinel for a tip that could not be resolved to a canonical code.
pub const PRED_UNKNOWN: &str = "N/A";

pub const UNKNOWN_LEAGUE: &str = "Unknown";

/// One market's outcome for a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketPrediction {
    pub pred: String,
    #[serde(default = "zero_prob")]
    pub prob: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip_count: Option<String>,
}

impl MarketPrediction {
    pub fn new(pred: impl Into<String>) -> Self {
        Self {
            pred: pred.into(),
            prob: zero_prob(),
            tip_count: None,
        }
    }

    pub fn with_prob(pred: impl Into<String>, prob: Option<String>) -> Self {
        Self {
            pred: pred.into(),
            prob: prob.unwrap_or_else(zero_prob),
            tip_count: None,
        }
    }
}

/// One predicted fixture from one source.
///
/// The legacy single `prediction`/`probability` fields written by earlier
/// versions of the store are accepted on deserialize and folded into
/// `markets` by [`MatchRecord::migrate_legacy`]; they are never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub home: String,
    pub away: String,
    #[serde(default = "unknown_league")]
    pub league: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub markets: BTreeMap<String, MarketPrediction>,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, rename = "prediction", skip_serializing)]
    pub legacy_prediction: Option<String>,
    #[serde(default, rename = "probability", skip_serializing)]
    pub legacy_probability: Option<String>,
}

impl MatchRecord {
    pub fn new(home: impl Into<String>, away: impl Into<String>) -> Self {
        Self {
            home: home.into(),
            away: away.into(),
            league: unknown_league(),
            date: capture_date(),
            time: String::new(),
            markets: BTreeMap::new(),
            timestamp: capture_timestamp(),
            url: None,
            legacy_prediction: None,
            legacy_probability: None,
        }
    }

    /// A record is valid iff both team names are non-empty and at least one
    /// market resolved to a real outcome code.
    pub fn is_valid(&self) -> bool {
        !self.home.trim().is_empty()
            && !self.away.trim().is_empty()
            && self.markets.values().any(|m| m.pred != PRED_UNKNOWN)
    }

    /// Fold the legacy flat prediction fields into the nested markets shape.
    /// The old value is carried over field-by-field, not reinterpreted.
    pub fn migrate_legacy(&mut self) {
        if let Some(pred) = self.legacy_prediction.take() {
            let prob = self.legacy_probability.take();
            self.markets
                .entry(MARKET_1X2.to_string())
                .or_insert_with(|| MarketPrediction::with_prob(pred, prob));
        }
        self.legacy_probability = None;
    }
}

pub fn capture_date() -> String {
    Local::now().format("%d.%m").to_string()
}

pub fn capture_timestamp() -> String {
    Local::now().to_rfc3339()
}

fn unknown_league() -> String {
    UNKNOWN_LEAGUE.to_string()
}

fn zero_prob() -> String {
    "0".to_string()
}
