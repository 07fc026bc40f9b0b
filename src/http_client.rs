use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

// Navigation commands block until the page load event fires, and the sites
// behind anti-bot challenges can take a while to get there.
const REQUEST_TIMEOUT_SECS: u64 = 180;

static CLIENT: OnceCell<Client> = OnceCell::new();

/// Shared blocking client for the WebDriver transport.
pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}
