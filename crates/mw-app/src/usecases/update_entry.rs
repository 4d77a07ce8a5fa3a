use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use mw_core::entry::{parse_remote_document, validate_draft, DraftImage, ParsedEntry};
use mw_core::ports::{ClockPort, EntryCachePort, FileUpdate, RemoteStorePort};
use mw_core::remote::entry_path;
use mw_core::{Entry, EntryId, EntryPatch};
use tracing::{error, info};

use super::internal::{validate_uploads, DeploymentSignal, ImageIndex, StagedImages};

/// Use case for editing an existing entry.
///
/// The merged entry goes through the same document parse a resync applies,
/// so an update can never produce an entry the next resync would drop.
/// New images land in the same revision as the metadata that references
/// them.
pub struct UpdateEntry {
    remote: Arc<dyn RemoteStorePort>,
    cache: Arc<dyn EntryCachePort>,
    clock: Arc<dyn ClockPort>,
    deployment: DeploymentSignal,
}

impl UpdateEntry {
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
        name = "usecase.update_entry.execute",
        skip(self, patch),
        fields(entry_id = %entry_id)
    )]
    pub async fn execute(&self, entry_id: &EntryId, mut patch: EntryPatch) -> Result<Entry> {
        let current = self
            .cache
            .get(entry_id)
            .await?
            .ok_or_else(|| anyhow!("Entry not found: {}", entry_id))?;

        // 1. Stage new uploads under free names
        let now = self.clock.now();
        let mut index = ImageIndex::load(self.remote.as_ref()).await?;
        let (images, blobs) = match patch.images.take() {
            Some(slots) => {
                validate_uploads(slots.iter().filter_map(|slot| match slot {
                    DraftImage::Upload(upload) => Some(upload),
                    DraftImage::Existing(_) => None,
                }))?;
                let staged = StagedImages::stage(self.remote.as_ref(), slots, &mut index, now)?;
                (Some(staged.images), staged.blobs)
            }
            None => (None, Vec::new()),
        };

        // 2. Merge and validate
        let merged = patch.apply(current.clone(), images, now);
        let entry = self.revalidate(entry_id, &merged, &index)?;
        let document = serde_json::to_vec_pretty(&entry).context("Failed to encode entry")?;

        // 3. Cache, then mirror remotely
        self.cache
            .upsert(&entry)
            .await
            .context("Failed to update cached entry")?;

        let written = if blobs.is_empty() {
            self.write_document(entry_id, &document).await
        } else {
            self.commit_with_images(entry_id, document, blobs).await
        };
        if let Err(err) = written {
            if let Err(restore) = self.cache.upsert(&current).await {
                error!(entry_id = %entry_id, error = %restore, "Failed to restore cached entry");
            }
            return Err(err);
        }

        info!(entry_id = %entry_id, "Updated entry successfully");
        Ok(entry)
    }

    fn revalidate(&self, entry_id: &EntryId, merged: &Entry, index: &ImageIndex) -> Result<Entry> {
        let raw = serde_json::to_vec(merged).context("Failed to encode entry")?;
        let entry = match parse_remote_document(entry_id.as_str(), &raw, self.clock.now(), |url| {
            index.resolves(url)
        }) {
            ParsedEntry::Valid(entry) => entry,
            ParsedEntry::Rejected { reason, .. } => {
                return Err(anyhow!(reason).context("Updated entry failed validation"))
            }
        };
        validate_draft(entry, |url| index.resolves(url)).context("Updated entry failed validation")
    }

    /// Metadata-only edits overwrite the document against its current sha.
    async fn write_document(&self, entry_id: &EntryId, document: &[u8]) -> Result<()> {
        let path = entry_path(entry_id);
        let sha = self
            .remote
            .get_file(&path)
            .await
            .with_context(|| format!("Failed to read {path}"))?
            .map(|file| file.sha);

        self.remote
            .put_file(
                &path,
                document,
                &format!("Update entry {entry_id}"),
                sha.as_deref(),
            )
            .await
            .with_context(|| format!("Failed to store {path}"))?;

        self.deployment
            .signal(&format!("update entry {entry_id}"))
            .await;
        Ok(())
    }

    async fn commit_with_images(
        &self,
        entry_id: &EntryId,
        document: Vec<u8>,
        blobs: Vec<FileUpdate>,
    ) -> Result<()> {
        let mut updates = Vec::with_capacity(blobs.len() + 2);
        updates.push(FileUpdate::new(entry_path(entry_id), document));
        updates.extend(blobs);
        updates.extend(self.deployment.marker_update(&format!("update entry {entry_id}")));

        self.remote
            .batch_commit(&updates, &format!("Update entry {entry_id}"))
            .await
            .map_err(|err| {
                anyhow!(err).context(format!("Failed to store entry {entry_id} remotely"))
            })?;
        info!(entry_id = %entry_id, files = updates.len(), "Committed entry with new images");
        Ok(())
    }
}
