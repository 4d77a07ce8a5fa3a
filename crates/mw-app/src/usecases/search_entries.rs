use std::sync::Arc;

use anyhow::Result;
use mw_core::ports::EntryCachePort;
use mw_core::Entry;
use tracing::debug;

/// Use case for free-text search over the cache.
///
/// Matching is a case-insensitive substring test OR-combined across title,
/// description, prompt and the analysis text; a blank query matches all.
pub struct SearchEntries {
    cache: Arc<dyn EntryCachePort>,
}

impl SearchEntries {
    pub fn from_ports(cache: Arc<dyn EntryCachePort>) -> Self {
        Self { cache }
    }

    #[tracing::instrument(name = "usecase.search_entries.execute", skip(self))]
    pub async fn execute(&self, query: &str) -> Result<Vec<Entry>> {
        let results = self.cache.search(query).await?;
        debug!(hits = results.len(), "search finished");
        Ok(results)
    }
}
