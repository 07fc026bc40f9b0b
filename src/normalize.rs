//! Maps site-native tip representations onto the canonical market keys and
//! outcome codes. Everything here is pure; adapters collect [`RawTip`]
//! signals and hand them over in one batch.

use std::collections::BTreeMap;

use crate::record::{MarketPrediction, MARKET_1X2, MARKET_BTTS, MARKET_OU25};

/// A prediction signal as it appears on a source page, before normalization.
#[derive(Debug, Clone)]
pub enum RawTip {
    /// A predicted scoreline. Strictly more informative than a bare 1X2
    /// label: all three markets derive from it.
    Score {
        home: u32,
        away: u32,
        prob: Option<String>,
    },
    /// A textual or class-encoded 1X2 tip ("Home Win", "tip2", "X").
    OneXTwo {
        text: String,
        class: String,
        prob: Option<String>,
    },
    /// A pre-labelled market tip (consensus sources expose these directly).
    MarketTip {
        market: String,
        pred: String,
        prob: Option<String>,
        tip_count: Option<String>,
    },
}

/// Collapse the collected signals into canonical markets. Scoreline-derived
/// outcomes win over any separately-advertised tip for the same market.
pub fn normalize(signals: &[RawTip]) -> BTreeMap<String, MarketPrediction> {
    let mut markets = BTreeMap::new();

    for signal in signals {
        match signal {
            RawTip::OneXTwo { text, class, prob } => {
                if let Some(code) = outcome_1x2(text, class) {
                    markets.insert(
                        MARKET_1X2.to_string(),
                        MarketPrediction::with_prob(code, prob.clone()),
                    );
                }
            }
            RawTip::MarketTip {
                market,
                pred,
                prob,
                tip_count,
            } => {
                let mut entry = MarketPrediction::with_prob(pred.clone(), prob.clone());
                entry.tip_count = tip_count.clone();
                markets.insert(market.clone(), entry);
            }
            RawTip::Score { .. } => {}
        }
    }

    // Second pass: scorelines overwrite whatever the labels said.
    for signal in signals {
        if let RawTip::Score { home, away, prob } = signal {
            for (key, mut entry) in markets_from_score(*home, *away) {
                if key == MARKET_1X2 {
                    if let Some(prob) = prob.clone() {
                        entry.prob = prob;
                    }
                }
                markets.insert(key, entry);
            }
        }
    }

    markets
}

/// Derive all three markets from a predicted scoreline.
pub fn markets_from_score(home: u32, away: u32) -> BTreeMap<String, MarketPrediction> {
    let mut markets = BTreeMap::new();

    let one_x_two = match home.cmp(&away) {
        std::cmp::Ordering::Greater => "1",
        std::cmp::Ordering::Less => "2",
        std::cmp::Ordering::Equal => "X",
    };
    markets.insert(MARKET_1X2.to_string(), MarketPrediction::new(one_x_two));

    let over_under = if home + away > 2 { "OVER" } else { "UNDER" };
    markets.insert(MARKET_OU25.to_string(), MarketPrediction::new(over_under));

    let btts = if home > 0 && away > 0 { "Yes" } else { "No" };
    markets.insert(MARKET_BTTS.to_string(), MarketPrediction::new(btts));

    markets
}

/// Resolve a textual tip plus element class into a canonical 1X2 code.
pub fn outcome_1x2(text: &str, class: &str) -> Option<String> {
    let trimmed = text.trim();

    // Exact short codes first; "12" would otherwise be eaten by the
    // substring checks below.
    match trimmed {
        "1X" | "X2" | "12" => return Some(trimmed.to_string()),
        "1" => return Some("1".to_string()),
        "2" => return Some("2".to_string()),
        "X" | "0" | "0-0" => return Some("X".to_string()),
        _ => {}
    }

    if trimmed.contains("Home") {
        return Some("1".to_string());
    }
    if trimmed.contains("Draw") {
        return Some("X".to_string());
    }
    if trimmed.contains("Away") {
        return Some("2".to_string());
    }

    // Class-name encodings ("tip1", "tipX") and loose single-character tips.
    if trimmed.contains('1') || class.contains("tip1") {
        return Some("1".to_string());
    }
    if trimmed.contains('X') || class.contains("tipX") || trimmed.contains('0') {
        return Some("X".to_string());
    }
    if trimmed.contains('2') || class.contains("tip2") {
        return Some("2".to_string());
    }

    None
}

/// Parse a "2-1" / "2:1" style scoreline into its two integers.
pub fn parse_score(raw: &str) -> Option<(u32, u32)> {
    let trimmed = raw.trim();
    let (left, right) = trimmed
        .split_once('-')
        .or_else(|| trimmed.split_once(':'))?;
    let home = left.trim().parse::<u32>().ok()?;
    let away = right.trim().parse::<u32>().ok()?;
    Some((home, away))
}
