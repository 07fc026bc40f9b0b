//! The browser collaborator surface. Page navigation, element lookup and
//! network-log access all go through [`Browser`]; the crate never talks to a
//! real browser directly, which keeps adapters and the capture loop testable
//! against scripted fakes.

use std::time::Duration;

use anyhow::Result;
use serde_json::Value;

/// Opaque handle to an element inside the live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementId(pub String);

/// One `Network.responseReceived` observation from the session's
/// performance log.
#[derive(Debug, Clone)]
pub struct NetworkEvent {
    pub request_id: String,
    pub url: String,
}

pub trait Browser {
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Fixed-duration settle wait. Suspension points are explicit; sites
    /// need time for async content and anti-automation challenges.
    fn wait_fixed(&mut self, wait: Duration);

    fn find_all(&mut self, selector: &str) -> Result<Vec<ElementId>>;

    fn find_in(&mut self, parent: &ElementId, selector: &str) -> Result<Vec<ElementId>>;

    fn text(&mut self, el: &ElementId) -> Result<String>;

    fn attr(&mut self, el: &ElementId, name: &str) -> Result<Option<String>>;

    fn execute_script(&mut self, js: &str) -> Result<Value>;

    /// Drain buffered network events. Each event is returned once.
    fn performance_events(&mut self) -> Result<Vec<NetworkEvent>>;

    /// Fetch a response body out-of-band; bodies are not inline in the
    /// performance log.
    fn response_body(&mut self, request_id: &str) -> Result<String>;
}

/// Evaluate an ordered list of row selectors until one yields matches.
/// Site markup drifts over time; zero matches on the primary selector is a
/// degrade-gracefully case, not an error.
pub fn find_with_fallback(
    browser: &mut dyn Browser,
    selectors: &[&str],
) -> Result<Vec<ElementId>> {
    for selector in selectors {
        let found = browser.find_all(selector)?;
        if !found.is_empty() {
            return Ok(found);
        }
    }
    Ok(Vec::new())
}

/// First element under `parent` matching any selector in the ordered list.
pub fn first_in(
    browser: &mut dyn Browser,
    parent: &ElementId,
    selectors: &[&str],
) -> Option<ElementId> {
    for selector in selectors {
        if let Ok(found) = browser.find_in(parent, selector) {
            if let Some(el) = found.into_iter().next() {
                return Some(el);
            }
        }
    }
    None
}

/// Trimmed text of the first matching child, if any.
pub fn text_in(
    browser: &mut dyn Browser,
    parent: &ElementId,
    selectors: &[&str],
) -> Option<String> {
    let el = first_in(browser, parent, selectors)?;
    let text = browser.text(&el).ok()?;
    let trimmed = text.trim().to_string();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}
