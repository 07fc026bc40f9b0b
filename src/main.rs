//! One consensus scrape pass: run every source adapter sequentially against
//! a fresh browser session, normalize, merge into the store, persist after
//! each source.

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tipfeed::config::Config;
use tipfeed::sources::{run_source, Source};
use tipfeed::store::ResultStore;
use tipfeed::webdriver::WebDriver;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config::from_env();
    let mut store = ResultStore::load(cfg.store_file.clone());
    info!(
        store = %store.path().display(),
        sources = store.source_count(),
        "starting consensus pass"
    );

    for source in Source::ALL {
        match scrape_one(source, &cfg, &mut store) {
            Ok(count) => info!(source = source.id(), records = count, "source done"),
            // A broken site or unreachable driver costs us one source, not
            // the pass; the store keeps that source's last good data.
            Err(err) => warn!(source = source.id(), "adapter failed, keeping prior data: {err:#}"),
        }
        if let Err(err) = store.persist() {
            error!("failed persisting store: {err:#}");
        }
        std::thread::sleep(cfg.source_cooldown);
    }

    info!(sources = store.source_count(), "consensus pass complete");
    Ok(())
}

/// One browser session per source, torn down around the run; no session
/// reuse across sites.
fn scrape_one(source: Source, cfg: &Config, store: &mut ResultStore) -> Result<usize> {
    let mut driver = WebDriver::new_session(&cfg.webdriver_url)?;
    run_source(source, &mut driver, store)
}
