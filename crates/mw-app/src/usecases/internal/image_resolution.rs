//! Turning draft image slots into stored images.

use std::collections::HashSet;
use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use mw_core::entry::{DraftImage, EntryImage};
use mw_core::ports::{FileUpdate, RemoteStoreError, RemoteStorePort};
use mw_core::remote::{image_path, image_path_from_url, IMAGES_DIR};
use mw_core::{ImageUpload, UploadRejection};

/// Paths currently stored under the images directory.
#[derive(Debug, Clone, Default)]
pub struct ImageIndex {
    paths: HashSet<String>,
}

impl ImageIndex {
    pub async fn load(remote: &dyn RemoteStorePort) -> Result<Self> {
        let listing = remote
            .list_directory(IMAGES_DIR)
            .await
            .context("Failed to list stored images")?;
        Ok(Self {
            paths: listing
                .into_iter()
                .filter(|item| item.is_file())
                .map(|item| item.path)
                .collect(),
        })
    }

    pub fn from_paths(paths: impl IntoIterator<Item = String>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, path: String) -> bool {
        self.paths.insert(path)
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// Whether `url` points at a stored image.
    pub fn resolves(&self, url: &str) -> bool {
        image_path_from_url(url).is_some_and(|path| self.paths.contains(&path))
    }

    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.paths.iter()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Image list of a draft with the blobs still to be committed.
#[derive(Debug, Default)]
pub struct StagedImages {
    pub images: Vec<EntryImage>,
    pub blobs: Vec<FileUpdate>,
}

impl StagedImages {
    /// Pick a free name for every upload without writing anything.
    ///
    /// Names already taken in `index` or by an earlier upload of the same
    /// draft are skipped. `index` gains the chosen paths.
    pub fn stage(
        remote: &dyn RemoteStorePort,
        slots: Vec<DraftImage>,
        index: &mut ImageIndex,
        now: DateTime<Utc>,
    ) -> Result<Self, RemoteStoreError> {
        let mut staged = StagedImages::default();
        for slot in slots {
            match slot {
                DraftImage::Existing(image) => staged.images.push(image),
                DraftImage::Upload(upload) => {
                    let path = upload
                        .candidate_names(now)
                        .into_iter()
                        .map(|name| image_path(&name))
                        .find(|path| !index.contains_path(path))
                        .ok_or_else(|| RemoteStoreError::UploadNamesExhausted {
                            file_name: upload.file_name.clone(),
                        })?;
                    index.insert(path.clone());

                    let size = upload.size();
                    staged
                        .images
                        .push(EntryImage::from_url(remote.raw_url(&path), size));
                    staged.blobs.push(FileUpdate::new(path, upload.bytes));
                }
            }
        }
        Ok(staged)
    }
}

/// One rejected upload of a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFailure {
    pub file_name: String,
    pub reason: UploadRejection,
}

/// Every rejected upload of a draft or patch, reported together.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadBatchError {
    pub attempted: usize,
    pub failures: Vec<UploadFailure>,
}

impl fmt::Display for UploadBatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rejected {} of {} uploads:",
            self.failures.len(),
            self.attempted
        )?;
        for failure in &self.failures {
            write!(f, " [{}: {}]", failure.file_name, failure.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for UploadBatchError {}

/// Check every upload before anything is written.
pub fn validate_uploads<'a>(
    uploads: impl IntoIterator<Item = &'a ImageUpload>,
) -> Result<(), UploadBatchError> {
    let mut attempted = 0;
    let mut failures = Vec::new();
    for upload in uploads {
        attempted += 1;
        if let Err(reason) = upload.validate() {
            failures.push(UploadFailure {
                file_name: upload.file_name.clone(),
                reason,
            });
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(UploadBatchError {
            attempted,
            failures,
        })
    }
}
