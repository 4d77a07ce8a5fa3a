//! Seams between the cache repository and diesel.

use anyhow::Result;
use diesel::SqliteConnection;

/// Runs closures against a pooled SQLite connection.
pub trait DbExecutor: Send + Sync {
    fn run<T>(&self, f: impl FnOnce(&mut SqliteConnection) -> Result<T>) -> Result<T>;

    /// Like [`run`](Self::run), inside one `BEGIN IMMEDIATE` transaction.
    /// Readers on other connections see either all of `f` or none of it.
    fn transaction<T>(&self, f: impl FnOnce(&mut SqliteConnection) -> Result<T>) -> Result<T> {
        self.run(|conn| conn.immediate_transaction(f))
    }
}

/// Domain entry to an insertable row.
pub trait InsertMapper<D, R>: Send + Sync {
    fn to_row(&self, domain: &D) -> Result<R>;
}

/// Stored row back to the domain entry.
pub trait RowMapper<R, D>: Send + Sync {
    fn to_domain(&self, row: &R) -> Result<D>;
}
