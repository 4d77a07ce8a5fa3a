//! # Library storage facade
//!
//! The single entry point the presentation layer talks to. Reads come from
//! the local cache; writes go through the use cases, which keep the remote
//! store authoritative.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use mw_core::entry::AiAnalysis;
use mw_core::ports::{AnalysisError, ClockPort, EntryCachePort};
use mw_core::{Entry, EntryDraft, EntryId, EntryPatch, ImageUpload};
use tracing::{info, warn};

use crate::deps::{AppDeps, StorageOptions};
use crate::usecases::*;

pub struct LibraryStorage {
    cache: Arc<dyn EntryCachePort>,
    clock: Arc<dyn ClockPort>,
    stale_after: Duration,
    resync: ResyncLibrary,
    list: ListEntries,
    featured: ListFeaturedEntries,
    get: GetEntry,
    search: SearchEntries,
    save: SaveEntry,
    update: UpdateEntry,
    delete: DeleteEntries,
    analyze: AnalyzeImage,
    analyze_batch: AnalyzeImages,
    export: ExportCache,
    import: ImportCache,
}

impl LibraryStorage {
    pub fn new(deps: AppDeps, options: StorageOptions) -> Self {
        let AppDeps {
            remote,
            cache,
            analyzer,
            clock,
        } = deps;

        let deployment = DeploymentSignal::new(
            Arc::clone(&remote),
            Arc::clone(&clock),
            options.deployment_marker_dir.as_deref(),
        );
        let resync = ResyncLibrary::from_ports(
            Arc::clone(&remote),
            Arc::clone(&cache),
            Arc::clone(&clock),
            deployment.clone(),
        );

        Self {
            list: ListEntries::from_ports(Arc::clone(&cache), resync.clone()),
            featured: ListFeaturedEntries::from_ports(Arc::clone(&cache)),
            get: GetEntry::from_ports(Arc::clone(&cache)),
            search: SearchEntries::from_ports(Arc::clone(&cache)),
            save: SaveEntry::from_ports(
                Arc::clone(&remote),
                Arc::clone(&cache),
                Arc::clone(&clock),
                deployment.clone(),
            ),
            update: UpdateEntry::from_ports(
                Arc::clone(&remote),
                Arc::clone(&cache),
                Arc::clone(&clock),
                deployment.clone(),
            ),
            delete: DeleteEntries::from_ports(
                Arc::clone(&remote),
                Arc::clone(&cache),
                Arc::clone(&clock),
                deployment,
            ),
            analyze: AnalyzeImage::from_ports(Arc::clone(&analyzer)),
            analyze_batch: AnalyzeImages::from_ports(analyzer),
            export: ExportCache::from_ports(Arc::clone(&cache)),
            import: ImportCache::from_ports(Arc::clone(&cache)),
            resync,
            cache,
            clock,
            stale_after: options.stale_after,
        }
    }

    /// Every entry, most recently modified first.
    pub async fn get_all_entries(&self) -> Result<Vec<Entry>> {
        self.list.execute().await
    }

    pub async fn search_entries(&self, query: &str) -> Result<Vec<Entry>> {
        self.search.execute(query).await
    }

    pub async fn list_featured(&self) -> Result<Vec<Entry>> {
        self.featured.execute().await
    }

    pub async fn get_entry(&self, entry_id: &EntryId) -> Result<Option<Entry>> {
        self.get.execute(entry_id).await
    }

    pub async fn save_entry(&self, draft: EntryDraft) -> Result<EntryId> {
        self.save.execute(draft).await
    }

    pub async fn update_entry(&self, entry_id: &EntryId, patch: EntryPatch) -> Result<Entry> {
        self.update.execute(entry_id, patch).await
    }

    pub async fn delete_entry(&self, entry_id: &EntryId) -> Result<()> {
        self.delete.execute(entry_id).await
    }

    pub async fn delete_entries(&self, entry_ids: &[EntryId]) -> Result<(), BatchDeleteError> {
        self.delete.execute_many(entry_ids).await
    }

    pub async fn resync_library(&self) -> Result<ResyncReport, ResyncError> {
        self.resync.execute().await
    }

    /// Drop the cache schema and rebuild it from the remote store.
    ///
    /// Waits for a running resync before resetting so its rebuild cannot
    /// land after the reset.
    #[tracing::instrument(name = "storage.force_resync_and_clear_cache", skip(self))]
    pub async fn force_resync_and_clear_cache(&self) -> Result<ResyncReport> {
        self.resync.settle().await;
        self.cache
            .reset()
            .await
            .context("Failed to reset entry cache")?;
        info!("Entry cache reset; resyncing");
        Ok(self.resync.execute().await?)
    }

    /// Start a background resync when the cache is older than the staleness
    /// window. Returns whether one was started.
    pub async fn refresh_if_stale(&self) -> Result<bool> {
        let last = self.cache.last_synced_at().await?;
        let now = self.clock.now_ms();
        let window = i64::try_from(self.stale_after.as_millis()).unwrap_or(i64::MAX);
        let stale = match last {
            Some(at) => now.saturating_sub(at) > window,
            None => true,
        };
        if !stale {
            return Ok(false);
        }

        let cycle = self.resync.begin().await;
        tokio::spawn(async move {
            if let Err(err) = cycle.wait().await {
                warn!(error = %err, "Background revalidation failed");
            }
        });
        Ok(true)
    }

    /// Wait for a running resync, including one started in the background.
    pub async fn wait_for_resync(&self) {
        self.resync.settle().await;
    }

    pub async fn analyze_image(&self, upload: &ImageUpload) -> Result<AiAnalysis, AnalysisError> {
        self.analyze.execute(upload).await
    }

    pub async fn analyze_images(&self, uploads: &[ImageUpload]) -> Vec<ImageAnalysisResult> {
        self.analyze_batch.execute(uploads).await
    }

    pub async fn export_cache(&self) -> Result<String> {
        self.export.execute().await
    }

    pub async fn import_cache(&self, dump: &str) -> Result<usize> {
        self.import.execute(dump).await
    }
}
