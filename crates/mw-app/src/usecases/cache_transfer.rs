use std::sync::Arc;

use anyhow::{Context, Result};
use mw_core::entry::validate_entry;
use mw_core::ports::EntryCachePort;
use mw_core::Entry;
use tracing::{info, warn};

/// Use case for dumping the cache as a JSON array of entries.
pub struct ExportCache {
    cache: Arc<dyn EntryCachePort>,
}

impl ExportCache {
    pub fn from_ports(cache: Arc<dyn EntryCachePort>) -> Self {
        Self { cache }
    }

    #[tracing::instrument(name = "usecase.export_cache.execute", skip(self))]
    pub async fn execute(&self) -> Result<String> {
        let entries = self.cache.list_all().await?;
        info!(count = entries.len(), "Exporting entry cache");
        serde_json::to_string_pretty(&entries).context("Failed to encode entries")
    }
}

/// Use case for replacing the cache with a previously exported dump.
///
/// Image references are not checked against the remote store; entries that
/// fail the structural checks are skipped.
pub struct ImportCache {
    cache: Arc<dyn EntryCachePort>,
}

impl ImportCache {
    pub fn from_ports(cache: Arc<dyn EntryCachePort>) -> Self {
        Self { cache }
    }

    #[tracing::instrument(name = "usecase.import_cache.execute", skip(self, dump))]
    pub async fn execute(&self, dump: &str) -> Result<usize> {
        let entries: Vec<Entry> =
            serde_json::from_str(dump).context("Cache dump is not a list of entries")?;

        let mut accepted = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = entry.id.clone();
            match validate_entry(entry, |_| true) {
                Ok(entry) => accepted.push(entry),
                Err(reason) => warn!(entry_id = %id, reason = %reason, "Skipping imported entry"),
            }
        }

        let written = self
            .cache
            .replace_all(&accepted)
            .await
            .context("Failed to replace entry cache")?;
        info!(written, "Imported entry cache");
        Ok(written)
    }
}
