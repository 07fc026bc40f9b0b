//! Live capture daemon: parks a browser session on the live-data site and
//! runs the capture/work-queue polling loop until the process dies.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tipfeed::browser::Browser;
use tipfeed::capture;
use tipfeed::config::Config;
use tipfeed::webdriver::WebDriver;

const INITIAL_SETTLE: Duration = Duration::from_secs(15);

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config::from_env();
    std::fs::create_dir_all(&cfg.data_dir)
        .with_context(|| format!("create data dir {}", cfg.data_dir.display()))?;

    let mut driver = WebDriver::new_session(&cfg.webdriver_url)?;
    info!(url = %cfg.live_site_url, "navigating capture session");
    driver.navigate(&cfg.live_site_url)?;
    std::thread::sleep(INITIAL_SETTLE);

    // The loop only returns on an unexpected fault; log it with full detail
    // and die. Restarting is the supervisor's job.
    if let Err(err) = capture::run_loop(&mut driver, &cfg) {
        error!("fatal error in capture loop: {err:?}");
        return Err(err);
    }
    Ok(())
}
