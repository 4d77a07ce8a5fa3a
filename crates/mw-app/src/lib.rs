//! Midweave application layer
//!
//! Use cases over the `mw-core` ports: the synchronization engine
//! (single-flight resync, orphan pruning, deletions), entry authoring, image
//! analysis, and the [`LibraryStorage`] facade consumed by the presentation
//! layer.

pub mod deps;
pub mod storage;
pub mod usecases;

pub use deps::{AppDeps, StorageOptions};
pub use storage::LibraryStorage;
