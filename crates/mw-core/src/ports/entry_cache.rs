use anyhow::Result;
use async_trait::async_trait;

use crate::entry::Entry;
use crate::ids::EntryId;

/// Indexed local mirror of the remote store.
///
/// Rows are keyed by the integer form of [`EntryId`]; entries whose id has no
/// integer form are never stored.
#[async_trait]
pub trait EntryCachePort: Send + Sync {
    /// All entries, most recently modified first.
    async fn list_all(&self) -> Result<Vec<Entry>>;

    /// Featured entries, most recently modified first.
    async fn list_featured(&self) -> Result<Vec<Entry>>;

    /// Case-insensitive substring search, OR-combined across fields.
    async fn search(&self, query: &str) -> Result<Vec<Entry>>;

    async fn get(&self, id: &EntryId) -> Result<Option<Entry>>;

    async fn count(&self) -> Result<u64>;

    /// Store a new entry under the next free key and return the assigned id.
    /// `entry.id` is ignored.
    async fn insert_new(&self, entry: &Entry) -> Result<EntryId>;

    /// Insert or replace the row for `entry.id`.
    async fn upsert(&self, entry: &Entry) -> Result<()>;

    /// Returns whether a row was removed.
    async fn delete(&self, key: i64) -> Result<bool>;

    /// Atomically swap the whole table for `entries`, skipping entries whose
    /// id is not an integer. Returns the number of rows written.
    async fn replace_all(&self, entries: &[Entry]) -> Result<usize>;

    /// Destroy and recreate the cache schema.
    async fn reset(&self) -> Result<()>;

    /// Epoch millis of the last successful resync.
    async fn last_synced_at(&self) -> Result<Option<i64>>;

    async fn record_sync(&self, at_ms: i64) -> Result<()>;
}
