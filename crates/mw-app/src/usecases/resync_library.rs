//! Rebuilding the local cache from the remote store.
//!
//! A cycle lists the entry documents and stored images, validates every
//! document, prunes images no valid entry references, and swaps the cache
//! contents in one transaction. Concurrent callers share a single in-flight
//! cycle.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Context;
use futures::future::{BoxFuture, FutureExt, Shared};
use futures::stream::{self, StreamExt, TryStreamExt};
use mw_core::entry::{parse_remote_document, Entry, EntryRejection, ParsedEntry};
use mw_core::ports::{ClockPort, EntryCachePort, RemoteStorePort};
use mw_core::remote::{entry_stem, image_path_from_url, ENTRIES_DIR};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::internal::{DeploymentSignal, ImageIndex};

/// Entry documents fetched concurrently during a cycle.
const FETCH_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, Error)]
pub enum ResyncError {
    /// The remote lists entry documents but none made it into the cache.
    #[error("resync wrote no entries although the remote lists {remote_entries}")]
    Integrity { remote_entries: usize },

    #[error("resync failed: {0:#}")]
    Failed(Arc<anyhow::Error>),
}

impl From<anyhow::Error> for ResyncError {
    fn from(err: anyhow::Error) -> Self {
        ResyncError::Failed(Arc::new(err))
    }
}

/// A document dropped by validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedDocument {
    pub id: Option<String>,
    pub reason: EntryRejection,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResyncReport {
    /// Entry documents listed remotely.
    pub remote_entries: usize,
    /// Rows written to the cache.
    pub cached: usize,
    pub rejected: Vec<RejectedDocument>,
    /// Image paths removed as orphans.
    pub pruned: Vec<String>,
    pub finished_at_ms: i64,
}

type InFlight = Shared<BoxFuture<'static, Result<ResyncReport, ResyncError>>>;

struct ResyncInner {
    remote: Arc<dyn RemoteStorePort>,
    cache: Arc<dyn EntryCachePort>,
    clock: Arc<dyn ClockPort>,
    deployment: DeploymentSignal,
    in_flight: Mutex<Option<(u64, InFlight)>>,
    generation: AtomicU64,
}

/// Single-flight resynchronization of the cache.
#[derive(Clone)]
pub struct ResyncLibrary {
    inner: Arc<ResyncInner>,
}

impl ResyncLibrary {
    pub fn from_ports(
        remote: Arc<dyn RemoteStorePort>,
        cache: Arc<dyn EntryCachePort>,
        clock: Arc<dyn ClockPort>,
        deployment: DeploymentSignal,
    ) -> Self {
        Self {
            inner: Arc::new(ResyncInner {
                remote,
                cache,
                clock,
                deployment,
                in_flight: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Run a cycle, or join the one already running.
    ///
    /// Every caller that joins a cycle observes the same outcome.
    #[tracing::instrument(name = "usecase.resync_library.execute", skip(self))]
    pub async fn execute(&self) -> Result<ResyncReport, ResyncError> {
        self.begin().await.wait().await
    }

    /// Register interest in a cycle, starting one if none is running.
    ///
    /// The cycle is in flight once this returns, so [`Self::settle`] and
    /// later callers see it even before the handle is awaited. A cycle
    /// leaves the slot as its last step, so a finished cycle is never joined.
    pub async fn begin(&self) -> ResyncHandle {
        let mut slot = self.inner.in_flight.lock().await;
        let cycle = match slot.as_ref() {
            Some((generation, cycle)) => {
                debug!(generation, "joining in-flight resync");
                cycle.clone()
            }
            None => {
                let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
                let inner = Arc::clone(&self.inner);
                let cycle = async move {
                    let outcome = inner.run_cycle().await;
                    inner.release(generation).await;
                    outcome
                }
                .boxed()
                .shared();
                *slot = Some((generation, cycle.clone()));
                cycle
            }
        };

        ResyncHandle { cycle }
    }

    /// Wait for the in-flight cycle, if any, without starting one.
    pub async fn settle(&self) {
        let cycle = {
            let slot = self.inner.in_flight.lock().await;
            slot.as_ref().map(|(_, cycle)| cycle.clone())
        };
        if let Some(cycle) = cycle {
            let _ = cycle.await;
        }
    }
}

/// A joined resync cycle.
pub struct ResyncHandle {
    cycle: InFlight,
}

impl ResyncHandle {
    pub async fn wait(self) -> Result<ResyncReport, ResyncError> {
        self.cycle.await
    }
}

impl ResyncInner {
    async fn release(&self, generation: u64) {
        let mut slot = self.in_flight.lock().await;
        if matches!(slot.as_ref(), Some((current, _)) if *current == generation) {
            *slot = None;
        }
    }

    async fn run_cycle(&self) -> Result<ResyncReport, ResyncError> {
        info!("Starting library resync");

        // 1. Fetch listings
        let listing = self
            .remote
            .list_directory(ENTRIES_DIR)
            .await
            .context("Failed to list entry documents")?;
        let documents: Vec<(String, String)> = listing
            .into_iter()
            .filter(|item| item.is_file())
            .filter_map(|item| {
                let stem = entry_stem(&item.name)?.to_string();
                Some((stem, item.path))
            })
            .collect();
        let remote_entries = documents.len();

        let images = ImageIndex::load(self.remote.as_ref()).await?;

        let remote = Arc::clone(&self.remote);
        let fetched: Vec<(String, Option<Vec<u8>>)> = stream::iter(documents)
            .map(|(stem, path)| {
                let remote = Arc::clone(&remote);
                async move {
                    let file = remote
                        .get_file(&path)
                        .await
                        .with_context(|| format!("Failed to fetch {path}"))?;
                    Ok::<_, anyhow::Error>((stem, file.map(|f| f.content)))
                }
            })
            .buffered(FETCH_CONCURRENCY)
            .try_collect()
            .await?;

        // 2. Validate
        let now = self.clock.now();
        let mut valid: Vec<Entry> = Vec::with_capacity(fetched.len());
        let mut rejected = Vec::new();
        for (stem, content) in fetched {
            let Some(content) = content else {
                debug!(id = %stem, "document vanished during resync");
                continue;
            };
            match parse_remote_document(&stem, &content, now, |url| images.resolves(url)) {
                ParsedEntry::Valid(entry) => valid.push(entry),
                ParsedEntry::Rejected { id, reason } => {
                    warn!(id = ?id, reason = %reason, "Dropping invalid entry");
                    rejected.push(RejectedDocument { id, reason });
                }
            }
        }

        // 3. Prune orphaned images
        let pruned = if valid.is_empty() && remote_entries > 0 {
            warn!(remote_entries, "No valid entries; skipping image pruning");
            Vec::new()
        } else {
            self.prune_orphans(&valid, &images).await?
        };

        // 4. Rebuild cache
        let cached = self
            .cache
            .replace_all(&valid)
            .await
            .context("Failed to rebuild entry cache")?;

        // 5. Complete
        if cached == 0 && remote_entries > 0 {
            return Err(ResyncError::Integrity { remote_entries });
        }

        let finished_at_ms = self.clock.now_ms();
        self.cache
            .record_sync(finished_at_ms)
            .await
            .context("Failed to record sync time")?;

        info!(
            remote_entries,
            cached,
            rejected = rejected.len(),
            pruned = pruned.len(),
            "Library resync finished"
        );
        Ok(ResyncReport {
            remote_entries,
            cached,
            rejected,
            pruned,
            finished_at_ms,
        })
    }

    async fn prune_orphans(
        &self,
        valid: &[Entry],
        images: &ImageIndex,
    ) -> anyhow::Result<Vec<String>> {
        let referenced: HashSet<String> = valid
            .iter()
            .flat_map(|entry| entry.image_urls())
            .filter_map(image_path_from_url)
            .collect();

        let mut orphans: Vec<String> = images
            .paths()
            .filter(|path| !referenced.contains(*path))
            .cloned()
            .collect();
        if orphans.is_empty() {
            return Ok(orphans);
        }
        orphans.sort();

        info!(count = orphans.len(), "Pruning orphaned images");
        self.remote
            .batch_delete(&orphans, &format!("Prune {} orphaned images", orphans.len()))
            .await
            .context("Failed to prune orphaned images")?;
        self.deployment.signal("prune orphaned images").await;
        Ok(orphans)
    }
}
