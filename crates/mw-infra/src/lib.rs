//! # mw-infra
//!
//! Adapters implementing the `mw-core` ports: the GitHub remote store, the
//! SQLite entry cache, the captioning client and the system clock.

pub mod analysis;
pub mod db;
pub mod github;
pub mod time;

pub use analysis::{OpenAiAnalyzerConfig, OpenAiImageAnalyzer};
pub use github::{GithubContentStore, GithubStoreConfig};
pub use time::SystemClock;
