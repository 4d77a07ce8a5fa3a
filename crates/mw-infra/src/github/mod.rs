//! GitHub-backed remote store.
//!
//! Entries and images live as files in a repository; single-file writes go
//! through the contents API and multi-file revisions through the git data
//! API (blobs, trees, commits, refs).

mod client;
mod config;
mod error;
mod wire;

pub use client::GithubContentStore;
pub use config::GithubStoreConfig;
