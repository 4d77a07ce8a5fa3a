//! Port interfaces between the use cases and their adapters.
//!
//! Adapters live in `mw-infra`; use cases in `mw-app` only ever see these
//! traits, injected as `Arc<dyn Port>`.

mod clock;
pub mod entry_cache;
pub mod image_analyzer;
pub mod remote_store;

pub use clock::*;
pub use entry_cache::EntryCachePort;
pub use image_analyzer::{AnalysisError, ImageAnalyzerPort};
pub use remote_store::{
    FileUpdate, RemoteDirEntry, RemoteEntryKind, RemoteFile, RemoteStoreError, RemoteStorePort,
};
