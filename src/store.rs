//! Persisted per-source prediction store. One key per source, full list
//! replacement per successful run, keep-last-known-good when a run comes back
//! empty.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::record::MatchRecord;

#[derive(Debug)]
pub struct ResultStore {
    path: PathBuf,
    sources: BTreeMap<String, Vec<MatchRecord>>,
}

impl ResultStore {
    /// Load the store from disk. A missing or unreadable file is not an
    /// error; the store simply starts empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let sources = match read_store_file(&path) {
            Ok(Some(sources)) => {
                info!(sources = sources.len(), path = %path.display(), "loaded existing store");
                sources
            }
            Ok(None) => BTreeMap::new(),
            Err(err) => {
                warn!(path = %path.display(), "could not load existing store, starting fresh: {err:#}");
                BTreeMap::new()
            }
        };
        Self { path, sources }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace a source's list wholesale. An empty run keeps the prior list
    /// unchanged so a flaky site never wipes its own last good data.
    pub fn commit(&mut self, source_id: &str, records: Vec<MatchRecord>) {
        if records.is_empty() {
            if self.sources.contains_key(source_id) {
                info!(source = source_id, "no records this run, keeping prior data");
            }
            return;
        }
        info!(source = source_id, records = records.len(), "committing records");
        self.sources.insert(source_id.to_string(), records);
    }

    /// Full-file rewrite through a temp file. Run frequency is low and the
    /// store is small, so no incremental update is needed.
    pub fn persist(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("create store dir {}", dir.display()))?;
            }
        }
        let json =
            serde_json::to_string_pretty(&self.sources).context("serialize prediction store")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("swap {}", self.path.display()))?;
        Ok(())
    }

    pub fn records(&self, source_id: &str) -> Option<&[MatchRecord]> {
        self.sources.get(source_id).map(|v| v.as_slice())
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn sources(&self) -> impl Iterator<Item = (&str, &[MatchRecord])> {
        self.sources.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

fn read_store_file(path: &Path) -> Result<Option<BTreeMap<String, Vec<MatchRecord>>>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let mut sources: BTreeMap<String, Vec<MatchRecord>> =
        serde_json::from_str(&raw).context("invalid store json")?;
    for records in sources.values_mut() {
        for record in records.iter_mut() {
            record.migrate_legacy();
        }
    }
    Ok(Some(sources))
}
