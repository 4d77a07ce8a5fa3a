use crate::db::models::{LibraryEntryRow, NewLibraryEntryRow, SyncStateRow};
use crate::db::pool::reset_schema;
use crate::db::ports::{DbExecutor, InsertMapper, RowMapper};
use crate::db::schema::{library_entries, sync_state};
use anyhow::Result;
use diesel::prelude::*;
use mw_core::entry::{matches_query, Entry};
use mw_core::ports::EntryCachePort;
use mw_core::EntryId;
use tracing::{debug, warn};

const LAST_SYNC_KEY: &str = "last_sync";
const LIKE_ESCAPE: char = '\\';

pub struct DieselEntryCacheRepository<E, M> {
    executor: E,
    mapper: M,
}

impl<E, M> DieselEntryCacheRepository<E, M> {
    pub fn new(executor: E, mapper: M) -> Self {
        Self { executor, mapper }
    }
}

impl<E, M> DieselEntryCacheRepository<E, M>
where
    M: InsertMapper<Entry, NewLibraryEntryRow> + RowMapper<LibraryEntryRow, Entry>,
{
    fn keyed_row(&self, entry: &Entry) -> Result<LibraryEntryRow> {
        let key = entry
            .id
            .cache_key()
            .ok_or_else(|| anyhow::anyhow!("entry id {} is not a cache key", entry.id))?;
        Ok(self.mapper.to_row(entry)?.with_id(key))
    }

    fn to_entries(&self, rows: Vec<LibraryEntryRow>) -> Result<Vec<Entry>> {
        rows.iter().map(|row| self.mapper.to_domain(row)).collect()
    }
}

/// `%needle%` with LIKE wildcards in the needle escaped.
fn like_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 2);
    pattern.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            pattern.push(LIKE_ESCAPE);
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait::async_trait]
impl<E, M> EntryCachePort for DieselEntryCacheRepository<E, M>
where
    E: DbExecutor,
    M: InsertMapper<Entry, NewLibraryEntryRow> + RowMapper<LibraryEntryRow, Entry>,
{
    async fn list_all(&self) -> Result<Vec<Entry>> {
        let rows = self.executor.run(|conn| {
            Ok(library_entries::table
                .order((
                    library_entries::last_modified_ms.desc(),
                    library_entries::id.desc(),
                ))
                .load::<LibraryEntryRow>(conn)?)
        })?;
        self.to_entries(rows)
    }

    async fn list_featured(&self) -> Result<Vec<Entry>> {
        let rows = self.executor.run(|conn| {
            Ok(library_entries::table
                .filter(library_entries::featured.eq(true))
                .order((
                    library_entries::last_modified_ms.desc(),
                    library_entries::id.desc(),
                ))
                .load::<LibraryEntryRow>(conn)?)
        })?;
        self.to_entries(rows)
    }

    async fn search(&self, query: &str) -> Result<Vec<Entry>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.list_all().await;
        }

        let pattern = like_pattern(&needle);
        let rows = self.executor.run(|conn| {
            Ok(library_entries::table
                .filter(
                    library_entries::search_text
                        .like(&pattern)
                        .escape(LIKE_ESCAPE),
                )
                .order((
                    library_entries::last_modified_ms.desc(),
                    library_entries::id.desc(),
                ))
                .load::<LibraryEntryRow>(conn)?)
        })?;

        // SQLite LIKE folds ASCII only; the domain check is authoritative.
        Ok(self
            .to_entries(rows)?
            .into_iter()
            .filter(|entry| matches_query(entry, &needle))
            .collect())
    }

    async fn get(&self, id: &EntryId) -> Result<Option<Entry>> {
        let Some(key) = id.cache_key() else {
            return Ok(None);
        };
        let row = self.executor.run(|conn| {
            Ok(library_entries::table
                .find(key)
                .first::<LibraryEntryRow>(conn)
                .optional()?)
        })?;
        row.map(|row| self.mapper.to_domain(&row)).transpose()
    }

    async fn count(&self) -> Result<u64> {
        let count = self.executor.run(|conn| {
            Ok(library_entries::table
                .count()
                .get_result::<i64>(conn)?)
        })?;
        Ok(count.max(0) as u64)
    }

    async fn insert_new(&self, entry: &Entry) -> Result<EntryId> {
        let row = self.mapper.to_row(entry)?;
        let key = self.executor.run(|conn| {
            Ok(diesel::insert_into(library_entries::table)
                .values(&row)
                .returning(library_entries::id)
                .get_result::<i64>(conn)?)
        })?;
        debug!(key, "inserted cache row");
        Ok(EntryId::from_cache_key(key))
    }

    async fn upsert(&self, entry: &Entry) -> Result<()> {
        let row = self.keyed_row(entry)?;
        self.executor.run(|conn| {
            diesel::replace_into(library_entries::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
    }

    async fn delete(&self, key: i64) -> Result<bool> {
        let removed = self.executor.run(|conn| {
            Ok(diesel::delete(library_entries::table.find(key)).execute(conn)?)
        })?;
        Ok(removed > 0)
    }

    async fn replace_all(&self, entries: &[Entry]) -> Result<usize> {
        let mut rows = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.id.cache_key() {
                Some(_) => rows.push(self.keyed_row(entry)?),
                None => warn!(id = %entry.id, "skipping entry whose id is not an integer"),
            }
        }

        self.executor.transaction(|conn| {
            diesel::delete(library_entries::table).execute(conn)?;
            for row in &rows {
                diesel::replace_into(library_entries::table)
                    .values(row)
                    .execute(conn)?;
            }
            Ok(rows.len())
        })
    }

    async fn reset(&self) -> Result<()> {
        self.executor.run(reset_schema)
    }

    async fn last_synced_at(&self) -> Result<Option<i64>> {
        self.executor.run(|conn| {
            Ok(sync_state::table
                .find(LAST_SYNC_KEY)
                .select(sync_state::value_ms)
                .first::<i64>(conn)
                .optional()?)
        })
    }

    async fn record_sync(&self, at_ms: i64) -> Result<()> {
        let row = SyncStateRow {
            key: LAST_SYNC_KEY.to_string(),
            value_ms: at_ms,
        };
        self.executor.run(|conn| {
            diesel::replace_into(sync_state::table)
                .values(&row)
                .execute(conn)?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("neon"), "%neon%");
        assert_eq!(like_pattern("100%_x"), "%100\\%\\_x%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
