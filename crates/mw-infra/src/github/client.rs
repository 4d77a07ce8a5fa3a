use std::future::Future;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use mw_core::ports::{
    FileUpdate, RemoteDirEntry, RemoteEntryKind, RemoteFile, RemoteStoreError, RemoteStorePort,
};
use mw_core::remote::layout;
use mw_core::ImageUpload;
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use super::config::GithubStoreConfig;
use super::error::{from_transport, map_status_code};
use super::wire::{
    ContentsFile, ContentsItem, CreateBlob, CreateCommit, CreateTree, DeleteContents, ErrorBody,
    GitBlob, GitCommit, GitRef, PutContents, ShaOnly, TreeItem, UpdateRef,
};

const API_VERSION: &str = "2022-11-28";
const MEDIA_TYPE: &str = "application/vnd.github+json";

/// [`RemoteStorePort`] over the GitHub REST API.
pub struct GithubContentStore {
    http: reqwest::Client,
    config: GithubStoreConfig,
}

impl GithubContentStore {
    pub fn new(config: GithubStoreConfig) -> Result<Self, RemoteStoreError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!("midweave/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteStoreError::Network(format!("building HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let url = format!(
            "{}/repos/{}/{}/{}",
            self.config.api_base, self.config.owner, self.config.repo, endpoint
        );
        let builder = self
            .http
            .request(method, url)
            .header(ACCEPT, HeaderValue::from_static(MEDIA_TYPE))
            .header("X-GitHub-Api-Version", API_VERSION);

        if self.config.token.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.config.token)
        }
    }

    fn contents(&self, method: Method, path: &str) -> RequestBuilder {
        self.request(method, &format!("contents/{}", path.trim_start_matches('/')))
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, RemoteStoreError> {
        let response = builder.send().await.map_err(from_transport)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let headers = response.headers().clone();
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.message)
            .unwrap_or_default();
        Err(map_status_code(status, &headers, message))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, RemoteStoreError> {
        self.send(builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| RemoteStoreError::Protocol(e.to_string()))
    }

    /// Retry idempotent reads on transient failures.
    async fn retry_read<F, Fut, T>(&self, op: &str, mut action: F) -> Result<T, RemoteStoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RemoteStoreError>>,
    {
        let attempts = self.max_attempts();
        let mut attempt = 0;
        loop {
            match action().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt + 1 < attempts => {
                    let backoff = self.config.backoff(attempt);
                    warn!(
                        "{} failed (attempt {}): {}. retrying in {:?}",
                        op,
                        attempt + 1,
                        err,
                        backoff
                    );
                    sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_transient() {
                        error!("{} failed after {} attempts: {}", op, attempt + 1, err);
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Wait before the next conflict retry, or give up once attempts run out.
    async fn conflict_backoff(
        &self,
        op: &str,
        attempt: u32,
        err: RemoteStoreError,
    ) -> Result<(), RemoteStoreError> {
        let attempts = self.max_attempts();
        if attempt + 1 >= attempts {
            error!("{} still conflicting after {} attempts: {}", op, attempts, err);
            return Err(RemoteStoreError::RetriesExhausted {
                attempts,
                last: Box::new(err),
            });
        }

        let backoff = self.config.backoff(attempt);
        warn!(
            "{} conflicted (attempt {}): {}. retrying in {:?}",
            op,
            attempt + 1,
            err,
            backoff
        );
        sleep(backoff).await;
        Ok(())
    }

    async fn fetch_contents(&self, path: &str) -> Result<Option<RemoteFile>, RemoteStoreError> {
        let request = self
            .contents(Method::GET, path)
            .query(&[("ref", self.config.branch.as_str())]);
        let body = match self.send_json::<serde_json::Value>(request).await {
            Ok(body) => body,
            Err(err) if err.is_not_found() => return Ok(None),
            Err(err) => return Err(err),
        };

        if body.is_array() {
            return Err(RemoteStoreError::Protocol(format!("{path} is a directory")));
        }
        let file: ContentsFile = serde_json::from_value(body)
            .map_err(|e| RemoteStoreError::Protocol(format!("contents of {path}: {e}")))?;

        let content = match (file.encoding.as_deref(), file.content.as_deref()) {
            (Some("base64"), Some(encoded)) => decode_base64(encoded)?,
            // Files above the contents API size limit come back without a body.
            _ => self.fetch_blob(&file.sha).await?,
        };

        Ok(Some(RemoteFile {
            path: file.path,
            content,
            sha: file.sha,
        }))
    }

    async fn fetch_blob(&self, sha: &str) -> Result<Vec<u8>, RemoteStoreError> {
        debug!(sha, "fetching blob through the git data API");
        let blob: GitBlob = self
            .send_json(self.request(Method::GET, &format!("git/blobs/{sha}")))
            .await?;
        if blob.encoding != "base64" {
            return Err(RemoteStoreError::Protocol(format!(
                "unsupported blob encoding {:?}",
                blob.encoding
            )));
        }
        decode_base64(&blob.content)
    }

    /// Current revision token of `path`, `None` when absent.
    async fn fetch_sha(&self, path: &str) -> Result<Option<String>, RemoteStoreError> {
        self.retry_read("fetch_sha", || async move {
            let request = self
                .contents(Method::GET, path)
                .query(&[("ref", self.config.branch.as_str())]);
            match self.send_json::<ShaOnly>(request).await {
                Ok(meta) => Ok(Some(meta.sha)),
                Err(err) if err.is_not_found() => Ok(None),
                Err(err) => Err(err),
            }
        })
        .await
    }

    async fn put_contents(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        sha: Option<&str>,
    ) -> Result<(), RemoteStoreError> {
        let body = PutContents {
            message,
            content: STANDARD.encode(content),
            branch: &self.config.branch,
            sha,
        };
        self.send(self.contents(Method::PUT, path).json(&body))
            .await
            .map(|_| ())
    }

    async fn head_commit(&self) -> Result<GitCommit, RemoteStoreError> {
        let branch = &self.config.branch;
        let head: GitRef = self
            .send_json(self.request(Method::GET, &format!("git/ref/heads/{branch}")))
            .await?;
        self.send_json(self.request(Method::GET, &format!("git/commits/{}", head.object.sha)))
            .await
    }

    async fn create_blob(&self, content: &[u8]) -> Result<String, RemoteStoreError> {
        let body = CreateBlob {
            content: STANDARD.encode(content),
            encoding: "base64",
        };
        let created: ShaOnly = self
            .send_json(self.request(Method::POST, "git/blobs").json(&body))
            .await?;
        Ok(created.sha)
    }

    /// Apply `items` on top of the branch tip as one commit.
    ///
    /// A rejected (non-fast-forward) ref update restarts from a fresh tip.
    async fn commit_tree(&self, op: &str, items: &[TreeItem], message: &str) -> Result<(), RemoteStoreError> {
        let mut attempt = 0;
        loop {
            let head = self.head_commit().await?;

            let tree: ShaOnly = self
                .send_json(self.request(Method::POST, "git/trees").json(&CreateTree {
                    base_tree: &head.tree.sha,
                    tree: items,
                }))
                .await?;

            let commit: ShaOnly = self
                .send_json(self.request(Method::POST, "git/commits").json(&CreateCommit {
                    message,
                    tree: &tree.sha,
                    parents: [&head.sha],
                }))
                .await?;

            let branch = &self.config.branch;
            let update = self
                .request(Method::PATCH, &format!("git/refs/heads/{branch}"))
                .json(&UpdateRef {
                    sha: &commit.sha,
                    force: false,
                });
            match self.send(update).await {
                Ok(_) => {
                    debug!(commit = %commit.sha, files = items.len(), "{} landed", op);
                    return Ok(());
                }
                Err(err) if err.is_conflict() => {
                    self.conflict_backoff(op, attempt, err).await?;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>, RemoteStoreError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact)
        .map_err(|e| RemoteStoreError::Protocol(format!("invalid base64 content: {e}")))
}

fn entry_kind(raw: &str) -> RemoteEntryKind {
    match raw {
        "file" => RemoteEntryKind::File,
        "dir" => RemoteEntryKind::Dir,
        _ => RemoteEntryKind::Other,
    }
}

#[async_trait]
impl RemoteStorePort for GithubContentStore {
    #[tracing::instrument(name = "github.get_file", skip(self))]
    async fn get_file(&self, path: &str) -> Result<Option<RemoteFile>, RemoteStoreError> {
        self.retry_read("get_file", || self.fetch_contents(path)).await
    }

    #[tracing::instrument(name = "github.list_directory", skip(self))]
    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteDirEntry>, RemoteStoreError> {
        let items = self
            .retry_read("list_directory", || async move {
                let request = self
                    .contents(Method::GET, path)
                    .query(&[("ref", self.config.branch.as_str())]);
                match self.send_json::<serde_json::Value>(request).await {
                    Ok(body) => Ok(Some(body)),
                    Err(err) if err.is_not_found() => Ok(None),
                    Err(err) => Err(err),
                }
            })
            .await?;

        let Some(body) = items else {
            return Ok(Vec::new());
        };
        if !body.is_array() {
            return Err(RemoteStoreError::Protocol(format!("{path} is not a directory")));
        }
        let items: Vec<ContentsItem> = serde_json::from_value(body)
            .map_err(|e| RemoteStoreError::Protocol(format!("listing of {path}: {e}")))?;

        Ok(items
            .into_iter()
            .map(|item| RemoteDirEntry {
                kind: entry_kind(&item.kind),
                name: item.name,
                path: item.path,
            })
            .collect())
    }

    #[tracing::instrument(name = "github.put_file", skip(self, content), fields(bytes = content.len()))]
    async fn put_file(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        expected_sha: Option<&str>,
    ) -> Result<(), RemoteStoreError> {
        let mut sha = expected_sha.map(str::to_string);
        let mut attempt = 0;
        loop {
            match self.put_contents(path, content, message, sha.as_deref()).await {
                Ok(()) => return Ok(()),
                Err(err) if err.is_conflict() => {
                    self.conflict_backoff("put_file", attempt, err).await?;
                    attempt += 1;
                    sha = self.fetch_sha(path).await?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    #[tracing::instrument(name = "github.delete_file", skip(self))]
    async fn delete_file(&self, path: &str, message: &str) -> Result<(), RemoteStoreError> {
        let mut attempt = 0;
        loop {
            let Some(sha) = self.fetch_sha(path).await? else {
                debug!("{} already absent", path);
                return Ok(());
            };

            let body = DeleteContents {
                message,
                sha: &sha,
                branch: &self.config.branch,
            };
            match self.send(self.contents(Method::DELETE, path).json(&body)).await {
                Ok(_) => return Ok(()),
                Err(err) if err.is_not_found() => return Ok(()),
                Err(err) if err.is_conflict() => {
                    self.conflict_backoff("delete_file", attempt, err).await?;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    #[tracing::instrument(name = "github.batch_commit", skip(self, updates), fields(files = updates.len()))]
    async fn batch_commit(
        &self,
        updates: &[FileUpdate],
        message: &str,
    ) -> Result<(), RemoteStoreError> {
        if updates.is_empty() {
            return Ok(());
        }

        // Blobs are content-addressed, so they survive ref-update retries.
        let mut items = Vec::with_capacity(updates.len());
        for update in updates {
            let sha = self.create_blob(&update.content).await?;
            items.push(TreeItem::blob(update.path.clone(), sha));
        }

        self.commit_tree("batch_commit", &items, message).await
    }

    #[tracing::instrument(name = "github.batch_delete", skip(self, paths), fields(files = paths.len()))]
    async fn batch_delete(&self, paths: &[String], message: &str) -> Result<(), RemoteStoreError> {
        if paths.is_empty() {
            return Ok(());
        }
        let items: Vec<TreeItem> = paths.iter().map(TreeItem::removal).collect();
        self.commit_tree("batch_delete", &items, message).await
    }

    #[tracing::instrument(name = "github.upload_image", skip(self, upload), fields(file = %upload.file_name))]
    async fn upload_image(&self, upload: &ImageUpload) -> Result<String, RemoteStoreError> {
        for name in upload.candidate_names(Utc::now()) {
            let path = layout::image_path(&name);
            // No sha: the host refuses to overwrite an existing file.
            match self
                .put_contents(&path, &upload.bytes, &format!("Upload image {name}"), None)
                .await
            {
                Ok(()) => return Ok(self.raw_url(&path)),
                Err(err) if err.is_conflict() => {
                    debug!("{} is taken, trying the next name", path);
                }
                Err(err) => return Err(err),
            }
        }

        Err(RemoteStoreError::UploadNamesExhausted {
            file_name: upload.file_name.clone(),
        })
    }

    fn raw_url(&self, path: &str) -> String {
        layout::raw_url(
            &self.config.raw_host,
            &self.config.owner,
            &self.config.repo,
            &self.config.branch,
            path,
        )
    }
}
