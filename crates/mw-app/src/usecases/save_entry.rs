use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use mw_core::entry::validate_draft;
use mw_core::ports::{ClockPort, EntryCachePort, FileUpdate, RemoteStorePort};
use mw_core::remote::entry_path;
use mw_core::{EntryDraft, EntryId};
use tracing::{error, info};

use super::internal::{validate_uploads, DeploymentSignal, ImageIndex, StagedImages};

/// Id carried by a draft between validation and cache insertion.
const PROVISIONAL_ID: &str = "draft";

/// Use case for authoring a new entry.
///
/// The entry is validated, written to the cache under a fresh id, and then
/// mirrored to the remote store in one revision together with its images.
/// A failed remote write removes the cache row again.
pub struct SaveEntry {
    remote: Arc<dyn RemoteStorePort>,
    cache: Arc<dyn EntryCachePort>,
    clock: Arc<dyn ClockPort>,
    deployment: DeploymentSignal,
}

impl SaveEntry {
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

    #[tracing::instrument(
        name = "usecase.save_entry.execute",
        skip(self, draft),
        fields(title = %draft.title, images = draft.images.len())
    )]
    pub async fn execute(&self, mut draft: EntryDraft) -> Result<EntryId> {
        validate_uploads(draft.uploads())?;

        // 1. Stage uploads under free names
        let now = self.clock.now();
        let mut index = ImageIndex::load(self.remote.as_ref()).await?;
        let slots = std::mem::take(&mut draft.images);
        let staged = StagedImages::stage(self.remote.as_ref(), slots, &mut index, now)?;

        // 2. Validate
        let entry = draft.into_entry(EntryId::from(PROVISIONAL_ID), staged.images, now);
        let mut entry = validate_draft(entry, |url| index.resolves(url))
            .context("Entry failed validation")?;

        // 3. Cache
        let entry_id = self
            .cache
            .insert_new(&entry)
            .await
            .context("Failed to cache new entry")?;
        entry.id = entry_id.clone();
        info!(entry_id = %entry_id, "Cached new entry");

        // 4. Mirror remotely
        let path = entry_path(&entry_id);
        if let Err(err) = self.refuse_existing(&path).await {
            self.rollback(&entry_id).await;
            return Err(err);
        }

        let document = match serde_json::to_vec_pretty(&entry) {
            Ok(document) => document,
            Err(err) => {
                self.rollback(&entry_id).await;
                return Err(anyhow!(err).context("Failed to encode entry"));
            }
        };
        let mut updates = Vec::with_capacity(staged.blobs.len() + 2);
        updates.push(FileUpdate::new(path, document));
        updates.extend(staged.blobs);
        updates.extend(self.deployment.marker_update(&format!("add entry {entry_id}")));

        let message = format!("Add entry {entry_id}: {}", entry.title);
        if let Err(err) = self.remote.batch_commit(&updates, &message).await {
            self.rollback(&entry_id).await;
            return Err(anyhow!(err).context(format!("Failed to store entry {entry_id} remotely")));
        }

        info!(entry_id = %entry_id, files = updates.len(), "Saved entry successfully");
        Ok(entry_id)
    }

    /// A document already stored under the new id belongs to someone else.
    async fn refuse_existing(&self, path: &str) -> Result<()> {
        let existing = self
            .remote
            .get_file(path)
            .await
            .with_context(|| format!("Failed to check {path}"))?;
        if existing.is_some() {
            bail!("Remote store already holds {path}; resync before saving");
        }
        Ok(())
    }

    async fn rollback(&self, entry_id: &EntryId) {
        let Some(key) = entry_id.cache_key() else {
            return;
        };
        if let Err(err) = self.cache.delete(key).await {
            error!(entry_id = %entry_id, error = %err, "Failed to roll back cached entry");
        }
    }
}
