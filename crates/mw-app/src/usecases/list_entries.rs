use std::sync::Arc;

use anyhow::{Context, Result};
use mw_core::ports::EntryCachePort;
use mw_core::{Entry, EntryId};
use tracing::info;

use super::resync_library::ResyncLibrary;

/// Use case for listing every cached entry.
///
/// An empty cache is filled from the remote store first.
pub struct ListEntries {
    cache: Arc<dyn EntryCachePort>,
    resync: ResyncLibrary,
}

impl ListEntries {
    pub fn from_ports(cache: Arc<dyn EntryCachePort>, resync: ResyncLibrary) -> Self {
        Self { cache, resync }
    }

    #[tracing::instrument(name = "usecase.list_entries.execute", skip(self))]
    pub async fn execute(&self) -> Result<Vec<Entry>> {
        if self.cache.count().await? == 0 {
            info!("Entry cache is empty; resyncing from remote");
            self.resync
                .execute()
                .await
                .context("Failed to fill empty cache")?;
        }
        self.cache.list_all().await
    }
}

/// Use case for listing entries flagged as featured.
pub struct ListFeaturedEntries {
    cache: Arc<dyn EntryCachePort>,
}

impl ListFeaturedEntries {
    pub fn from_ports(cache: Arc<dyn EntryCachePort>) -> Self {
        Self { cache }
    }

    #[tracing::instrument(name = "usecase.list_featured_entries.execute", skip(self))]
    pub async fn execute(&self) -> Result<Vec<Entry>> {
        self.cache.list_featured().await
    }
}

pub struct GetEntry {
    cache: Arc<dyn EntryCachePort>,
}

impl GetEntry {
    pub fn from_ports(cache: Arc<dyn EntryCachePort>) -> Self {
        Self { cache }
    }

    #[tracing::instrument(name = "usecase.get_entry.execute", skip(self), fields(entry_id = %entry_id))]
    pub async fn execute(&self, entry_id: &EntryId) -> Result<Option<Entry>> {
        self.cache.get(entry_id).await
    }
}
