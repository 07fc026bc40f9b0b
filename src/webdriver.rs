//! Blocking WebDriver client for chromedriver, implementing [`Browser`].
//! Covers the small protocol subset the adapters and the capture loop need:
//! navigation, CSS element lookup, script injection, the Chromium
//! performance log and the `goog:cdp` response-body command.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::browser::{Browser, ElementId, NetworkEvent};
use crate::http_client::http_client;

const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub struct WebDriver {
    base: String,
    session: String,
}

impl WebDriver {
    /// Open a fresh headless Chrome session with performance logging on.
    pub fn new_session(webdriver_url: &str) -> Result<Self> {
        let base = webdriver_url.trim_end_matches('/').to_string();
        let caps = json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": {
                        "args": [
                            "--headless=new",
                            "--no-sandbox",
                            "--disable-gpu",
                            "--disable-dev-shm-usage",
                            "--window-size=1920,1080",
                            format!("--user-agent={USER_AGENT}"),
                        ],
                    },
                    "goog:loggingPrefs": { "performance": "ALL" },
                },
            },
        });

        let value = post_raw(&format!("{base}/session"), &caps)?;
        let session = value
            .get("sessionId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("webdriver session response missing sessionId"))?
            .to_string();
        debug!(session = %session, "webdriver session opened");
        Ok(Self { base, session })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/session/{}{}", self.base, self.session, path)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value> {
        post_raw(&self.url(path), body)
    }

    fn get(&self, path: &str) -> Result<Value> {
        let resp = http_client()?
            .get(self.url(path))
            .send()
            .context("webdriver request failed")?;
        unwrap_value(resp)
    }

    fn elements_from(&self, value: Value) -> Vec<ElementId> {
        let Some(list) = value.as_array() else {
            return Vec::new();
        };
        list.iter()
            .filter_map(|entry| entry.get(ELEMENT_KEY))
            .filter_map(|id| id.as_str())
            .map(|id| ElementId(id.to_string()))
            .collect()
    }
}

impl Browser for WebDriver {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.post("/url", &json!({ "url": url })).map(|_| ())
    }

    fn wait_fixed(&mut self, wait: Duration) {
        thread::sleep(wait);
    }

    fn find_all(&mut self, selector: &str) -> Result<Vec<ElementId>> {
        let value = self.post(
            "/elements",
            &json!({ "using": "css selector", "value": selector }),
        )?;
        Ok(self.elements_from(value))
    }

    fn find_in(&mut self, parent: &ElementId, selector: &str) -> Result<Vec<ElementId>> {
        let value = self.post(
            &format!("/element/{}/elements", parent.0),
            &json!({ "using": "css selector", "value": selector }),
        )?;
        Ok(self.elements_from(value))
    }

    fn text(&mut self, el: &ElementId) -> Result<String> {
        // textContent also surfaces text hidden from layout, which the
        // sites rely on for tucked-away league and score fragments.
        let value = self.get(&format!("/element/{}/property/textContent", el.0))?;
        if let Some(text) = value.as_str() {
            return Ok(text.to_string());
        }
        let value = self.get(&format!("/element/{}/text", el.0))?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn attr(&mut self, el: &ElementId, name: &str) -> Result<Option<String>> {
        let value = self.get(&format!("/element/{}/attribute/{name}", el.0))?;
        Ok(value.as_str().map(|v| v.to_string()))
    }

    fn execute_script(&mut self, js: &str) -> Result<Value> {
        self.post("/execute/sync", &json!({ "script": js, "args": [] }))
    }

    fn performance_events(&mut self) -> Result<Vec<NetworkEvent>> {
        let value = self.post("/se/log", &json!({ "type": "performance" }))?;
        let Some(entries) = value.as_array() else {
            return Ok(Vec::new());
        };
        let events = entries
            .iter()
            .filter_map(|entry| entry.get("message"))
            .filter_map(|msg| msg.as_str())
            .filter_map(parse_performance_entry)
            .collect();
        Ok(events)
    }

    fn response_body(&mut self, request_id: &str) -> Result<String> {
        let value = self.post(
            "/goog/cdp/execute",
            &json!({
                "cmd": "Network.getResponseBody",
                "params": { "requestId": request_id },
            }),
        )?;
        let body = value
            .get("body")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        if value
            .get("base64Encoded")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
        {
            use base64::Engine;
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(body)
                .context("response body base64 decode")?;
            return Ok(String::from_utf8_lossy(&bytes).into_owned());
        }
        Ok(body.to_string())
    }
}

impl Drop for WebDriver {
    fn drop(&mut self) {
        let url = format!("{}/session/{}", self.base, self.session);
        if let Ok(client) = http_client() {
            if let Err(err) = client.delete(url).send() {
                warn!("failed closing webdriver session: {err}");
            }
        }
    }
}

/// A chromedriver performance-log entry is JSON nested inside a JSON string;
/// unwrap it and keep only `Network.responseReceived` observations.
pub fn parse_performance_entry(raw: &str) -> Option<NetworkEvent> {
    let outer: Value = serde_json::from_str(raw).ok()?;
    let message = outer.get("message")?;
    if message.get("method")?.as_str()? != "Network.responseReceived" {
        return None;
    }
    let params = message.get("params")?;
    let request_id = params.get("requestId")?.as_str()?.to_string();
    let url = params
        .get("response")?
        .get("url")?
        .as_str()?
        .to_string();
    Some(NetworkEvent { request_id, url })
}

fn post_raw(url: &str, body: &Value) -> Result<Value> {
    let resp = http_client()?
        .post(url)
        .json(body)
        .send()
        .context("webdriver request failed")?;
    unwrap_value(resp)
}

fn unwrap_value(resp: reqwest::blocking::Response) -> Result<Value> {
    let status = resp.status();
    let body: Value = resp.json().context("invalid webdriver response json")?;
    let value = body.get("value").cloned().unwrap_or(Value::Null);
    if !status.is_success() {
        let message = value
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown webdriver error");
        return Err(anyhow!("webdriver {status}: {message}"));
    }
    Ok(value)
}
