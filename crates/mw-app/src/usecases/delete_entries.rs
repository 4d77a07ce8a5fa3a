use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use mw_core::ports::{ClockPort, EntryCachePort, RemoteStorePort};
use mw_core::remote::{deletion_marker_path, entry_path, image_path_from_url};
use mw_core::time::to_iso_millis;
use mw_core::EntryId;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::internal::{DeploymentSignal, ImageIndex};

/// One failed id of a batch delete.
#[derive(Debug)]
pub struct DeleteFailure {
    pub id: EntryId,
    pub error: anyhow::Error,
}

/// Partial failure of a batch delete; only the ids that failed are listed.
#[derive(Debug)]
pub struct BatchDeleteError {
    pub attempted: usize,
    pub failures: Vec<DeleteFailure>,
}

impl BatchDeleteError {
    pub fn failed_ids(&self) -> impl Iterator<Item = &EntryId> {
        self.failures.iter().map(|failure| &failure.id)
    }
}

impl fmt::Display for BatchDeleteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to delete {} of {} entries:",
            self.failures.len(),
            self.attempted
        )?;
        for failure in &self.failures {
            write!(f, " [{}: {:#}]", failure.id, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchDeleteError {}

/// Use case for deleting entries from the remote store and the cache.
///
/// The remote side always goes first; the cache row is removed only once
/// the remote deletion has succeeded.
pub struct DeleteEntries {
    remote: Arc<dyn RemoteStorePort>,
    cache: Arc<dyn EntryCachePort>,
    clock: Arc<dyn ClockPort>,
    deployment: DeploymentSignal,
}

impl DeleteEntries {
    pub fn from_ports(
        remote: Arc<dyn RemoteStorePort>,
        cache: Arc<dyn EntryCachePort>,
        clock: Arc<dyn ClockPort>,
        deployment: DeploymentSignal,
    ) -> Self {
        Self {
            remote,
            cache,
            clock,
            deployment,
        }
    }

    /// Deletes one entry in the required order.
    ///
    /// 1. Read the remote metadata document.
    /// 2. Missing document: leave a deletion marker. Present: delete every
    ///    referenced image in one revision, then the document itself.
    /// 3. Remove the cache row.
    #[tracing::instrument(
        name = "usecase.delete_entries.execute",
        skip(self),
        fields(entry_id = %entry_id)
    )]
    pub async fn execute(&self, entry_id: &EntryId) -> Result<()> {
        info!(entry_id = %entry_id, "Starting entry deletion");

        self.delete_remote(entry_id).await?;

        match entry_id.cache_key() {
            Some(key) => {
                let removed = self
                    .cache
                    .delete(key)
                    .await
                    .with_context(|| format!("Failed to remove cached entry {entry_id}"))?;
                debug!(removed, "cache row removed");
            }
            None => warn!(entry_id = %entry_id, "Entry id is not a cache key; nothing cached"),
        }

        self.deployment
            .signal(&format!("delete entry {entry_id}"))
            .await;
        info!(entry_id = %entry_id, "Deleted entry successfully");
        Ok(())
    }

    /// Delete several entries one after another.
    ///
    /// Every id is attempted; failures are collected.
    #[tracing::instrument(
        name = "usecase.delete_entries.execute_many",
        skip(self, entry_ids),
        fields(count = entry_ids.len())
    )]
    pub async fn execute_many(&self, entry_ids: &[EntryId]) -> Result<(), BatchDeleteError> {
        let mut failures = Vec::new();
        for entry_id in entry_ids {
            if let Err(error) = self.execute(entry_id).await {
                warn!(entry_id = %entry_id, error = %error, "Entry deletion failed");
                failures.push(DeleteFailure {
                    id: entry_id.clone(),
                    error,
                });
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(BatchDeleteError {
                attempted: entry_ids.len(),
                failures,
            })
        }
    }

    async fn delete_remote(&self, entry_id: &EntryId) -> Result<()> {
        let path = entry_path(entry_id);
        let metadata = self
            .remote
            .get_file(&path)
            .await
            .with_context(|| format!("Failed to read {path}"))?;

        let Some(metadata) = metadata else {
            return self.write_marker(entry_id).await;
        };

        // Images already gone are skipped so the removal commit stays valid.
        let stored = ImageIndex::load(self.remote.as_ref()).await?;
        let message = format!("Delete entry {entry_id}");
        let mut images: Vec<String> = Vec::new();
        for url in referenced_image_urls(&metadata.content) {
            match image_path_from_url(&url) {
                Some(image) if !stored.contains_path(&image) => {
                    debug!(image = %image, "image already absent");
                }
                Some(image) if !images.contains(&image) => images.push(image),
                Some(_) => {}
                None => debug!(url = %url, "image url outside the store; skipping"),
            }
        }
        if !images.is_empty() {
            self.remote
                .batch_delete(&images, &message)
                .await
                .with_context(|| {
                    format!("Failed to delete {} images of {entry_id}", images.len())
                })?;
        }

        if let Err(err) = self.remote.delete_file(&path, &message).await {
            error!(
                entry_id = %entry_id,
                error = %err,
                "Images deleted but metadata remains; remote state is orphaned"
            );
            return Err(anyhow!(err).context(format!(
                "Orphaned state: images of {entry_id} were deleted but {path} could not be"
            )));
        }

        // A marker left by an earlier attempt is stale now.
        let marker = deletion_marker_path(entry_id);
        if let Err(err) = self.remote.delete_file(&marker, &message).await {
            debug!(error = %err, "could not clean up deletion marker");
        }
        Ok(())
    }

    async fn write_marker(&self, entry_id: &EntryId) -> Result<()> {
        let marker = deletion_marker_path(entry_id);
        info!(entry_id = %entry_id, "No remote metadata; writing deletion marker");

        let body = json!({
            "id": entry_id,
            "deletedAt": to_iso_millis(&self.clock.now()),
        });
        self.remote
            .put_file(
                &marker,
                body.to_string().as_bytes(),
                &format!("Mark entry {entry_id} as deleted"),
                None,
            )
            .await
            .with_context(|| format!("Failed to write deletion marker {marker}"))
    }
}

/// Image URLs of a raw entry document; empty when it cannot be parsed.
fn referenced_image_urls(raw: &[u8]) -> Vec<String> {
    let Ok(value) = serde_json::from_slice::<Value>(raw) else {
        warn!("entry document is not JSON; no images to delete");
        return Vec::new();
    };
    value
        .get("images")
        .and_then(Value::as_array)
        .map(|images| {
            images
                .iter()
                .filter_map(|image| image.get("url").and_then(Value::as_str))
                .filter(|url| !url.trim().is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
