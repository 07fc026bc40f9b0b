//! One adapter per prediction site. Each adapter is a leaf parser of one
//! page shape: locate repeating row elements (with fallback selectors for
//! markup drift), pull out teams, league, kickoff time and whatever tip
//! signals the site exposes, and hand the signals to the normalizer.
//!
//! Faults are contained at two levels: a row that fails extraction is
//! skipped, and an adapter that fails entirely yields zero records so the
//! store keeps the source's last good data.

use std::env;
use std::time::Duration;

use anyhow::Result;
use tracing::{debug, info};

use crate::browser::{Browser, ElementId, find_with_fallback, first_in, text_in};
use crate::normalize::{RawTip, normalize, outcome_1x2, parse_score};
use crate::record::{MatchRecord, MARKET_BTTS, MARKET_OU25, MARKET_1X2, UNKNOWN_LEAGUE};
use crate::store::ResultStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Forebet,
    Predictz,
    Windrawwin,
    Statarea,
    Vitibet,
    Zulubet,
    Olbg,
}

impl Source {
    pub const ALL: [Source; 7] = [
        Source::Forebet,
        Source::Predictz,
        Source::Windrawwin,
        Source::Statarea,
        Source::Vitibet,
        Source::Zulubet,
        Source::Olbg,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Source::Forebet => "forebet",
            Source::Predictz => "predictz",
            Source::Windrawwin => "windrawwin",
            Source::Statarea => "statarea",
            Source::Vitibet => "vitibet",
            Source::Zulubet => "zulubet",
            Source::Olbg => "olbg",
        }
    }

    fn default_url(self) -> &'static str {
        match self {
            Source::Forebet => "https://www.forebet.com/en/football-tips-and-predictions-for-today",
            Source::Predictz => "https://www.predictz.com/predictions/today/",
            Source::Windrawwin => "https://www.windrawwin.com/predictions/today/",
            Source::Statarea => "https://www.statarea.com/predictions",
            Source::Vitibet => {
                "https://www.vitibet.com/index.php?clanek=quicktips&sekce=fotbal&lang=en"
            }
            Source::Zulubet => "https://www.zulubet.com/",
            Source::Olbg => "https://www.olbg.com/betting-tips/football",
        }
    }

    pub fn url(self) -> String {
        let key = format!("TIPFEED_URL_{}", self.id().to_uppercase());
        match env::var(&key) {
            Ok(raw) if !raw.trim().is_empty() => raw.trim().to_string(),
            _ => self.default_url().to_string(),
        }
    }

    /// Post-navigation settle wait; the heavier anti-bot sites need longer.
    pub fn settle(self) -> Duration {
        let secs = match self {
            Source::Forebet => 25,
            Source::Windrawwin => 20,
            Source::Predictz => 15,
            Source::Olbg => 12,
            Source::Statarea | Source::Vitibet | Source::Zulubet => 10,
        };
        Duration::from_secs(secs)
    }

    pub fn extract(self, browser: &mut dyn Browser) -> Result<Vec<MatchRecord>> {
        match self {
            Source::Forebet => extract_forebet(browser),
            Source::Predictz => extract_predictz(browser),
            Source::Windrawwin => extract_windrawwin(browser),
            Source::Statarea => extract_statarea(browser),
            Source::Vitibet => extract_vitibet(browser),
            Source::Zulubet => extract_zulubet(browser),
            Source::Olbg => extract_olbg(browser),
        }
    }
}

/// Navigate, settle, extract and commit one source. The caller persists the
/// store and decides what a returned error means (it never aborts the pass).
pub fn run_source(
    source: Source,
    browser: &mut dyn Browser,
    store: &mut ResultStore,
) -> Result<usize> {
    let url = source.url();
    info!(source = source.id(), url = %url, "scraping source");
    browser.navigate(&url)?;
    browser.wait_fixed(source.settle());

    let records = source.extract(browser)?;
    let count = records.len();
    store.commit(source.id(), records);
    Ok(count)
}

fn extract_forebet(b: &mut dyn Browser) -> Result<Vec<MatchRecord>> {
    let rows = find_with_fallback(b, &["div.rcnt", "div.tr_0, div.tr_1"])?;
    debug!(rows = rows.len(), "forebet row candidates");

    let mut records = Vec::new();
    for row in &rows {
        let Some(home) = text_in(b, row, &["span.homeTeam"]) else {
            continue;
        };
        let Some(away) = text_in(b, row, &["span.awayTeam"]) else {
            continue;
        };

        let url = first_in(b, row, &["a[href*='/matches/']", "a"])
            .and_then(|el| b.attr(&el, "href").ok().flatten());

        let prob = text_in(b, row, &["span.fpr", "div.fprc b"])
            .map(|raw| raw.trim_end_matches('%').trim().to_string());

        let mut signals = Vec::new();
        let score = text_in(b, row, &["div.ex_sc", "span.l_scr", "div.avg_sc"])
            .and_then(|raw| parse_score(&raw));
        if let Some((h, a)) = score {
            signals.push(RawTip::Score {
                home: h,
                away: a,
                prob: prob.clone(),
            });
        }
        if let Some(tip) = text_in(b, row, &["div.predict span", "span.forepr"]) {
            signals.push(RawTip::OneXTwo {
                text: tip,
                class: String::new(),
                prob: if score.is_some() { None } else { prob.clone() },
            });
        }

        let when = text_in(b, row, &["span.date_bah", "div.date_bah"]).unwrap_or_default();
        let league = league_from_row(b, row, &["div.shortTag", "span.league_name"]);

        if let Some(mut record) = build_record(&home, &away, league, &signals) {
            record.url = url;
            if let Some(date) = find_date(&when) {
                record.date = date;
            }
            record.time = find_time(&when).unwrap_or_default();
            records.push(record);
        }
    }
    Ok(records)
}

fn extract_predictz(b: &mut dyn Browser) -> Result<Vec<MatchRecord>> {
    let rows = find_with_fallback(b, &["div.pttr.ptcnt", "tr.pttr"])?;
    debug!(rows = rows.len(), "predictz row candidates");

    let mut records = Vec::new();
    for row in &rows {
        let Some(game) = text_in(b, row, &["div.pttd.ptgame a", "div.ptgame"]) else {
            continue;
        };
        let Some((home, away)) = split_teams(&game, " v ") else {
            continue;
        };

        let Some(tip) = text_in(b, row, &["div.pttd.ptprd"]) else {
            continue;
        };

        let mut signals = Vec::new();
        // PredictZ shows "Home 2-1" style tips; the scoreline is the richer
        // signal when present.
        if let Some(score) = scan_score_tokens(&tip) {
            signals.push(RawTip::Score {
                home: score.0,
                away: score.1,
                prob: None,
            });
        }
        signals.push(RawTip::OneXTwo {
            text: tip,
            class: String::new(),
            prob: None,
        });

        let league = league_from_row(b, row, &["div.pttd.ptlge", "div.ptlge a"]);
        if let Some(record) = build_record(&home, &away, league, &signals) {
            records.push(record);
        }
    }
    Ok(records)
}

fn extract_windrawwin(b: &mut dyn Browser) -> Result<Vec<MatchRecord>> {
    let rows = find_with_fallback(b, &["div.wttr", "tr.wttr"])?;
    debug!(rows = rows.len(), "windrawwin row candidates");

    let mut records = Vec::new();
    for row in &rows {
        let Ok(raw) = b.text(row) else {
            continue;
        };
        let Some((home_part, rest)) = raw.split_once(" v ") else {
            continue;
        };
        // Row text runs team names, score and tip together; the home name is
        // the last line before the separator, the away name ends at the
        // double-space gap after it.
        let home = home_part.lines().last().unwrap_or("").trim().to_string();
        let away = rest
            .trim()
            .split("  ")
            .next()
            .unwrap_or("")
            .lines()
            .next()
            .unwrap_or("")
            .trim()
            .to_string();
        if home.is_empty() || away.is_empty() {
            continue;
        }

        let mut signals = Vec::new();
        let score = text_in(b, row, &["div.wtsc", "div.wtstkscr"])
            .and_then(|raw| parse_score(&raw))
            .or_else(|| scan_score_tokens(rest));
        if let Some((h, a)) = score {
            signals.push(RawTip::Score {
                home: h,
                away: a,
                prob: None,
            });
        }
        if let Some(tip) = text_in(b, row, &["div.wtprd"]) {
            signals.push(RawTip::OneXTwo {
                text: tip,
                class: String::new(),
                prob: None,
            });
        }

        let league = league_from_row(b, row, &["div.wtleague"]);
        if let Some(mut record) = build_record(&home, &away, league, &signals) {
            record.time = find_time(&raw).unwrap_or_default();
            records.push(record);
        }
    }
    Ok(records)
}

fn extract_statarea(b: &mut dyn Browser) -> Result<Vec<MatchRecord>> {
    let rows = find_with_fallback(b, &["div.cmatch", "div.match"])?;
    debug!(rows = rows.len(), "statarea row candidates");

    let mut records = Vec::new();
    for row in &rows {
        let teams = match (
            text_in(b, row, &["div.home"]),
            text_in(b, row, &["div.away"]),
        ) {
            (Some(home), Some(away)) => Some((home, away)),
            _ => text_in(b, row, &["div.teams"])
                .and_then(|raw| split_teams(&raw, " - ")),
        };
        let Some((home, away)) = teams else {
            continue;
        };

        let mut tip_text = String::new();
        let mut tip_class = String::new();
        if let Some(tip_el) = first_in(b, row, &["div.tip"]) {
            tip_text = b.text(&tip_el).map(|t| t.trim().to_string()).unwrap_or_default();
            if tip_text.is_empty() {
                tip_text = text_in(b, &tip_el, &["div.value"]).unwrap_or_default();
            }
            tip_class = b.attr(&tip_el, "class").ok().flatten().unwrap_or_default();
        }

        let signals = [RawTip::OneXTwo {
            text: tip_text,
            class: tip_class,
            prob: None,
        }];

        let league = league_from_row(b, row, &["div.league", "div.competition"]);
        if let Some(mut record) = build_record(&home, &away, league, &signals) {
            if let Some(when) = text_in(b, row, &["div.date", "div.time"]) {
                record.time = find_time(&when).unwrap_or_default();
                if let Some(date) = find_date(&when) {
                    record.date = date;
                }
            }
            records.push(record);
        }
    }
    Ok(records)
}

fn extract_vitibet(b: &mut dyn Browser) -> Result<Vec<MatchRecord>> {
    let rows = find_with_fallback(b, &["table.tablecenter tr", "table tr"])?;
    debug!(rows = rows.len(), "vitibet row candidates");

    let mut records = Vec::new();
    let mut current_league = UNKNOWN_LEAGUE.to_string();
    for row in &rows {
        let Ok(cells) = b.find_in(row, "td") else {
            continue;
        };
        if cells.len() < 7 {
            // Short rows are league group headers; remember them so the
            // match rows below inherit the label.
            if let Some(header) = cells.first().and_then(|cell| cell_text(b, cell)) {
                if !is_junk_league(&header) {
                    current_league = header;
                }
            }
            continue;
        }

        let Some(home) = cell_text(b, &cells[2]) else {
            continue;
        };
        let Some(away) = cell_text(b, &cells[3]) else {
            continue;
        };

        let mut signals = Vec::new();
        // Predicted goals sit in their own two columns.
        let goals = match (
            cell_text(b, &cells[4]).and_then(|v| v.parse::<u32>().ok()),
            cell_text(b, &cells[5]).and_then(|v| v.parse::<u32>().ok()),
        ) {
            (Some(h), Some(a)) => Some((h, a)),
            _ => None,
        };
        if let Some((h, a)) = goals {
            signals.push(RawTip::Score {
                home: h,
                away: a,
                prob: None,
            });
        }
        if let Some(tip) = cell_text(b, &cells[6]) {
            signals.push(RawTip::OneXTwo {
                text: tip,
                class: String::new(),
                prob: None,
            });
        }

        if let Some(mut record) = build_record(&home, &away, current_league.clone(), &signals) {
            if let Some(date) = cells.first().and_then(|c| cell_text(b, c)).and_then(|t| find_date(&t)) {
                record.date = date;
            }
            records.push(record);
        }
    }
    Ok(records)
}

fn extract_zulubet(b: &mut dyn Browser) -> Result<Vec<MatchRecord>> {
    let rows = find_with_fallback(b, &["table.content_table tr", "tr"])?;
    debug!(rows = rows.len(), "zulubet row candidates");

    let mut records = Vec::new();
    for row in &rows {
        let Ok(cells) = b.find_in(row, "td") else {
            continue;
        };
        if cells.len() < 7 {
            continue;
        }

        let Some(game) = cell_text(b, &cells[1]) else {
            continue;
        };
        let Some((home_part, away_part)) = game.split_once(" - ") else {
            continue;
        };
        // The match cell can also hold date and league fragments on their
        // own lines around the team names.
        let home = home_part.lines().last().unwrap_or("").trim().to_string();
        let away = away_part.lines().next().unwrap_or("").trim().to_string();
        if home.is_empty() || away.is_empty() {
            continue;
        }

        let mut tip = cell_text(b, &cells[6]).unwrap_or_default();
        if !matches!(tip.as_str(), "1" | "X" | "2") {
            if let Some(alt) = text_in(b, row, &["td:nth-child(7) b"]) {
                tip = alt;
            }
        }
        let signals = [RawTip::OneXTwo {
            text: tip,
            class: String::new(),
            prob: None,
        }];

        let league = league_from_row(b, &cells[1], &["span.league"]);
        if let Some(mut record) = build_record(&home, &away, league, &signals) {
            if let Some(when) = cell_text(b, &cells[0]) {
                record.time = find_time(&when).unwrap_or_default();
            }
            records.push(record);
        }
    }
    Ok(records)
}

/// OLBG exposes pre-labelled market tips with tipster consensus counts
/// instead of scorelines, one market per row.
fn extract_olbg(b: &mut dyn Browser) -> Result<Vec<MatchRecord>> {
    let rows = find_with_fallback(b, &["tr.rowodd, tr.roweven", "div.tip-row"])?;
    debug!(rows = rows.len(), "olbg row candidates");

    let mut records = Vec::new();
    for row in &rows {
        let Some(game) = text_in(b, row, &["td.event a", "div.event"]) else {
            continue;
        };
        let Some((home, away)) =
            split_teams(&game, " v ").or_else(|| split_teams(&game, " - "))
        else {
            continue;
        };

        let Some(market_label) = text_in(b, row, &["td.market", "div.market"]) else {
            continue;
        };
        let Some(selection) = text_in(b, row, &["td.selection b", "td.selection"]) else {
            continue;
        };
        let Some((market, pred)) = olbg_market(&market_label, &selection, &home, &away) else {
            continue;
        };

        let prob = text_in(b, row, &["td.confidence"])
            .map(|raw| raw.trim_end_matches('%').trim().to_string());
        let tip_count = text_in(b, row, &["td.tipsters"]).filter(|raw| raw.contains('/'));

        let signals = [RawTip::MarketTip {
            market,
            pred,
            prob,
            tip_count,
        }];

        let league = league_from_row(b, row, &["td.category", "div.category"]);
        if let Some(record) = build_record(&home, &away, league, &signals) {
            records.push(record);
        }
    }
    Ok(records)
}

/// Map an OLBG market label plus selection text to a canonical market entry.
fn olbg_market(
    label: &str,
    selection: &str,
    home: &str,
    away: &str,
) -> Option<(String, String)> {
    let label_lower = label.to_lowercase();
    let selection = selection.trim();

    if label_lower.contains("both teams") || label_lower.contains("btts") {
        let pred = if selection.to_lowercase().contains("yes") {
            "Yes"
        } else {
            "No"
        };
        return Some((MARKET_BTTS.to_string(), pred.to_string()));
    }
    if label_lower.contains("2.5") || label_lower.contains("over/under") {
        let pred = if selection.to_lowercase().contains("over") {
            "OVER"
        } else {
            "UNDER"
        };
        return Some((MARKET_OU25.to_string(), pred.to_string()));
    }
    if label_lower.contains("match result")
        || label_lower.contains("win market")
        || label_lower.contains("1x2")
    {
        let pred = if selection.contains(home) {
            "1".to_string()
        } else if selection.contains(away) {
            "2".to_string()
        } else if selection.to_lowercase().contains("draw") {
            "X".to_string()
        } else {
            outcome_1x2(selection, "")?
        };
        return Some((MARKET_1X2.to_string(), pred));
    }
    None
}

/// Assemble a record from normalized signals; `None` when the row fails the
/// validity rule (empty side or no resolvable market).
fn build_record(
    home: &str,
    away: &str,
    league: String,
    signals: &[RawTip],
) -> Option<MatchRecord> {
    let mut record = MatchRecord::new(home.trim(), away.trim());
    record.league = league;
    record.markets = normalize(signals);
    record.is_valid().then_some(record)
}

fn cell_text(b: &mut dyn Browser, cell: &ElementId) -> Option<String> {
    let text = b.text(cell).ok()?;
    let trimmed = text.trim().to_string();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

pub fn split_teams(raw: &str, separator: &str) -> Option<(String, String)> {
    let (home, away) = raw.split_once(separator)?;
    let home = home.trim();
    let away = away.trim();
    if home.is_empty() || away.is_empty() {
        return None;
    }
    Some((home.to_string(), away.to_string()))
}

/// Best-effort league label: dedicated elements, then a JS-handler argument,
/// then an image title/alt. Junk values fall through to "Unknown".
fn league_from_row(b: &mut dyn Browser, row: &ElementId, selectors: &[&str]) -> String {
    for selector in selectors {
        if let Some(label) = text_in(b, row, &[selector]) {
            if !is_junk_league(&label) {
                return label;
            }
        }
    }

    for attr_holder in [Some(row.clone()), first_in(b, row, &["a"])].into_iter().flatten() {
        if let Ok(Some(onclick)) = b.attr(&attr_holder, "onclick") {
            if let Some(label) = js_handler_arg(&onclick) {
                if !is_junk_league(&label) {
                    return label;
                }
            }
        }
    }

    if let Some(img) = first_in(b, row, &["img"]) {
        for name in ["title", "alt"] {
            if let Ok(Some(label)) = b.attr(&img, name) {
                let label = label.trim().to_string();
                if !label.is_empty() && !is_junk_league(&label) {
                    return label;
                }
            }
        }
    }

    UNKNOWN_LEAGUE.to_string()
}

/// First quoted argument of an inline JS handler, e.g.
/// `showComp('Premier League', 7)`.
pub fn js_handler_arg(raw: &str) -> Option<String> {
    let after_paren = raw.split_once('(')?.1;
    let quote = after_paren.chars().find(|c| *c == '\'' || *c == '"')?;
    let mut parts = after_paren.splitn(3, quote);
    parts.next()?;
    let arg = parts.next()?.trim();
    if arg.is_empty() { None } else { Some(arg.to_string()) }
}

/// Script fragments and literal braces mean the lookup grabbed code, not a
/// league name.
pub fn is_junk_league(raw: &str) -> bool {
    let trimmed = raw.trim();
    trimmed.is_empty()
        || trimmed.len() > 48
        || trimmed.contains('{')
        || trimmed.contains('}')
        || trimmed.contains("function")
        || trimmed.contains("javascript")
        || trimmed.contains("=>")
}

/// First HH:MM token in a blob of row text.
pub fn find_time(raw: &str) -> Option<String> {
    for token in raw.split_whitespace() {
        let token = token.trim_matches(|c: char| !c.is_ascii_digit() && c != ':');
        let Some((h, m)) = token.split_once(':') else {
            continue;
        };
        if let (Ok(h), Ok(m)) = (h.parse::<u32>(), m.parse::<u32>()) {
            if h < 24 && m < 60 {
                return Some(format!("{h:02}:{m:02}"));
            }
        }
    }
    None
}

/// First DD.MM token in a blob of row text, normalized to two digits each.
pub fn find_date(raw: &str) -> Option<String> {
    for token in raw.split_whitespace() {
        let token = token.trim_matches(|c: char| !c.is_ascii_digit() && c != '.');
        let mut parts = token.split('.').filter(|p| !p.is_empty());
        let (Some(day), Some(month)) = (parts.next(), parts.next()) else {
            continue;
        };
        if let (Ok(day), Ok(month)) = (day.parse::<u32>(), month.parse::<u32>()) {
            if (1..=31).contains(&day) && (1..=12).contains(&month) {
                return Some(format!("{day:02}.{month:02}"));
            }
        }
    }
    None
}

/// Scan loose row text for an embedded "2-1" style scoreline token.
fn scan_score_tokens(raw: &str) -> Option<(u32, u32)> {
    raw.split_whitespace().find_map(parse_score)
}
