//! In-memory fakes shared by the integration tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mw_app::{AppDeps, LibraryStorage, StorageOptions};
use mw_core::entry::AiAnalysis;
use mw_core::ports::{
    AnalysisError, ClockPort, EntryCachePort, FileUpdate, ImageAnalyzerPort, RemoteDirEntry,
    RemoteEntryKind, RemoteFile, RemoteStoreError, RemoteStorePort,
};
use mw_core::remote::image_path;
use mw_core::ImageUpload;
use mw_infra::db::executor::DieselSqliteExecutor;
use mw_infra::db::mappers::LibraryEntryRowMapper;
use mw_infra::db::pool::init_db_pool;
use mw_infra::db::repositories::DieselEntryCacheRepository;
use serde_json::json;

pub const RAW_PREFIX: &str = "https://raw.test/octo/gallery/main/";
pub const PNG: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Remote store backed by a map, recording every mutating call.
#[derive(Default)]
pub struct InMemoryRemoteStore {
    files: Mutex<BTreeMap<String, (Vec<u8>, u64)>>,
    revision: AtomicU64,
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed(&self, path: &str, content: impl Into<Vec<u8>>) {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst);
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), (content.into(), revision));
    }

    pub fn has(&self, path: &str) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    pub fn remove(&self, path: &str) {
        self.files.lock().unwrap().remove(path);
    }

    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).map(|(c, _)| c.clone())
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    /// Make calls labelled `label` (e.g. `delete:images/originals/A.PNG`) fail.
    pub fn fail_on(&self, label: &str) {
        self.failing.lock().unwrap().insert(label.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, label: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == label).count()
    }

    fn record(&self, label: String) -> Result<(), RemoteStoreError> {
        self.calls.lock().unwrap().push(label.clone());
        if self.failing.lock().unwrap().contains(&label) {
            return Err(RemoteStoreError::Network(format!("injected failure: {label}")));
        }
        Ok(())
    }

    fn write(&self, path: &str, content: &[u8]) {
        self.seed(path, content.to_vec());
    }
}

#[async_trait]
impl RemoteStorePort for InMemoryRemoteStore {
    async fn get_file(&self, path: &str) -> Result<Option<RemoteFile>, RemoteStoreError> {
        self.record(format!("get:{path}"))?;
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(path)
            .map(|(content, revision)| RemoteFile {
                path: path.to_string(),
                content: content.clone(),
                sha: format!("sha-{revision}"),
            }))
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteDirEntry>, RemoteStoreError> {
        // Let concurrent callers interleave.
        tokio::task::yield_now().await;
        self.record(format!("list:{path}"))?;

        let prefix = format!("{}/", path.trim_end_matches('/'));
        Ok(self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter_map(|key| {
                let name = key.strip_prefix(&prefix)?;
                (!name.contains('/')).then(|| RemoteDirEntry {
                    name: name.to_string(),
                    path: key.clone(),
                    kind: RemoteEntryKind::File,
                })
            })
            .collect())
    }

    async fn put_file(
        &self,
        path: &str,
        content: &[u8],
        _message: &str,
        _expected_sha: Option<&str>,
    ) -> Result<(), RemoteStoreError> {
        self.record(format!("put:{path}"))?;
        self.write(path, content);
        Ok(())
    }

    async fn delete_file(&self, path: &str, _message: &str) -> Result<(), RemoteStoreError> {
        self.record(format!("delete:{path}"))?;
        self.files.lock().unwrap().remove(path);
        Ok(())
    }

    async fn batch_commit(
        &self,
        updates: &[FileUpdate],
        _message: &str,
    ) -> Result<(), RemoteStoreError> {
        self.record("batch_commit".to_string())?;
        for update in updates {
            self.write(&update.path, &update.content);
        }
        Ok(())
    }

    async fn batch_delete(&self, paths: &[String], _message: &str) -> Result<(), RemoteStoreError> {
        self.record("batch_delete".to_string())?;
        let mut files = self.files.lock().unwrap();
        for path in paths {
            files.remove(path);
        }
        Ok(())
    }

    async fn upload_image(&self, upload: &ImageUpload) -> Result<String, RemoteStoreError> {
        self.record(format!("upload:{}", upload.file_name))?;
        let now = chrono::Utc::now();
        for name in upload.candidate_names(now) {
            let path = image_path(&name);
            if !self.has(&path) {
                self.write(&path, &upload.bytes);
                return Ok(self.raw_url(&path));
            }
        }
        Err(RemoteStoreError::UploadNamesExhausted {
            file_name: upload.file_name.clone(),
        })
    }

    fn raw_url(&self, path: &str) -> String {
        format!("{RAW_PREFIX}{path}")
    }
}

pub struct FixedClock {
    now_ms: AtomicI64,
}

impl FixedClock {
    pub fn at(now_ms: i64) -> Arc<Self> {
        Arc::new(Self {
            now_ms: AtomicI64::new(now_ms),
        })
    }

    pub fn advance(&self, by_ms: i64) {
        self.now_ms.fetch_add(by_ms, Ordering::SeqCst);
    }
}

impl ClockPort for FixedClock {
    fn now_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

pub struct OfflineAnalyzer;

#[async_trait]
impl ImageAnalyzerPort for OfflineAnalyzer {
    async fn analyze(&self, _image: &[u8]) -> Result<AiAnalysis, AnalysisError> {
        Err(AnalysisError::Failed("offline".to_string()))
    }
}

pub fn memory_cache() -> Arc<dyn EntryCachePort> {
    let pool = init_db_pool(":memory:").expect("Failed to create test DB pool");
    Arc::new(DieselEntryCacheRepository::new(
        DieselSqliteExecutor::new(pool),
        LibraryEntryRowMapper,
    ))
}

pub struct Harness {
    pub remote: Arc<InMemoryRemoteStore>,
    pub cache: Arc<dyn EntryCachePort>,
    pub clock: Arc<FixedClock>,
    pub storage: LibraryStorage,
}

pub fn harness(remote: Arc<InMemoryRemoteStore>) -> Harness {
    harness_with(remote, None)
}

pub fn harness_with(remote: Arc<InMemoryRemoteStore>, marker_dir: Option<&str>) -> Harness {
    let cache = memory_cache();
    let clock = FixedClock::at(1_700_000_000_000);
    let storage = LibraryStorage::new(
        AppDeps {
            remote: remote.clone(),
            cache: Arc::clone(&cache),
            analyzer: Arc::new(OfflineAnalyzer),
            clock: clock.clone(),
        },
        StorageOptions {
            stale_after: Duration::from_secs(300),
            deployment_marker_dir: marker_dir.map(str::to_string),
        },
    );
    Harness {
        remote,
        cache,
        clock,
        storage,
    }
}

pub fn image_url(name: &str) -> String {
    format!("{RAW_PREFIX}images/originals/{name}")
}

/// A valid remote entry document referencing `images`.
pub fn entry_document(id: &str, title: &str, images: &[&str]) -> Vec<u8> {
    let images: Vec<_> = images
        .iter()
        .map(|name| json!({ "url": image_url(name), "size": 8 }))
        .collect();
    serde_json::to_vec(&json!({
        "id": id,
        "title": title,
        "description": format!("{title} description"),
        "images": images,
        "parameters": { "sref": format!("sref-{id}"), "prompt": format!("{title} prompt") },
        "adminMetadata": {
            "createdAt": "2024-01-01T00:00:00.000Z",
            "lastModified": "2024-01-02T00:00:00.000Z",
            "featured": false,
            "curatorNotes": ""
        }
    }))
    .expect("document should encode")
}
