use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::upload::ImageUpload;

/// A file read from the remote store together with its revision token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    pub content: Vec<u8>,
    /// Optimistic-concurrency token required to update or delete the file.
    pub sha: String,
}

impl RemoteFile {
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.content)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteEntryKind {
    File,
    Dir,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDirEntry {
    pub name: String,
    pub path: String,
    pub kind: RemoteEntryKind,
}

impl RemoteDirEntry {
    pub fn is_file(&self) -> bool {
        self.kind == RemoteEntryKind::File
    }
}

/// One file written by a batch commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdate {
    pub path: String,
    pub content: Vec<u8>,
}

impl FileUpdate {
    pub fn new(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum RemoteStoreError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Stale or missing revision token, or a non-fast-forward ref update.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized: check the access token")]
    Unauthorized,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("rate limited by the remote host")]
    RateLimited,

    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response: {0}")]
    Protocol(String),

    #[error("unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: Box<RemoteStoreError>,
    },

    #[error("every candidate name for {file_name} is already taken")]
    UploadNamesExhausted { file_name: String },
}

impl RemoteStoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteStoreError::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, RemoteStoreError::Conflict(_))
    }

    /// Failures worth retrying for idempotent reads.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteStoreError::Timeout
            | RemoteStoreError::Network(_)
            | RemoteStoreError::RateLimited => true,
            RemoteStoreError::UnexpectedStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Transactional file-store view of the remote host.
#[async_trait]
pub trait RemoteStorePort: Send + Sync {
    /// `Ok(None)` when the file does not exist.
    async fn get_file(&self, path: &str) -> Result<Option<RemoteFile>, RemoteStoreError>;

    /// Empty when the directory does not exist.
    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteDirEntry>, RemoteStoreError>;

    /// Create or update a file.
    ///
    /// A conflict caused by a stale `expected_sha` is retried internally
    /// with a freshly fetched token; exhaustion is returned as
    /// [`RemoteStoreError::RetriesExhausted`].
    async fn put_file(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        expected_sha: Option<&str>,
    ) -> Result<(), RemoteStoreError>;

    /// Delete a file. A file that is already gone counts as deleted.
    async fn delete_file(&self, path: &str, message: &str) -> Result<(), RemoteStoreError>;

    /// Write every update in a single revision.
    async fn batch_commit(&self, updates: &[FileUpdate], message: &str)
        -> Result<(), RemoteStoreError>;

    /// Remove every path in a single revision.
    async fn batch_delete(&self, paths: &[String], message: &str) -> Result<(), RemoteStoreError>;

    /// Store an image under `images/originals/` without overwriting existing
    /// files and return its canonical URL.
    async fn upload_image(&self, upload: &ImageUpload) -> Result<String, RemoteStoreError>;

    /// Canonical URL of a stored path.
    fn raw_url(&self, path: &str) -> String;
}

#[async_trait]
impl<T: RemoteStorePort + ?Sized> RemoteStorePort for Arc<T> {
    async fn get_file(&self, path: &str) -> Result<Option<RemoteFile>, RemoteStoreError> {
        (**self).get_file(path).await
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteDirEntry>, RemoteStoreError> {
        (**self).list_directory(path).await
    }

    async fn put_file(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        expected_sha: Option<&str>,
    ) -> Result<(), RemoteStoreError> {
        (**self).put_file(path, content, message, expected_sha).await
    }

    async fn delete_file(&self, path: &str, message: &str) -> Result<(), RemoteStoreError> {
        (**self).delete_file(path, message).await
    }

    async fn batch_commit(
        &self,
        updates: &[FileUpdate],
        message: &str,
    ) -> Result<(), RemoteStoreError> {
        (**self).batch_commit(updates, message).await
    }

    async fn batch_delete(&self, paths: &[String], message: &str) -> Result<(), RemoteStoreError> {
        (**self).batch_delete(paths, message).await
    }

    async fn upload_image(&self, upload: &ImageUpload) -> Result<String, RemoteStoreError> {
        (**self).upload_image(upload).await
    }

    fn raw_url(&self, path: &str) -> String {
        (**self).raw_url(path)
    }
}
