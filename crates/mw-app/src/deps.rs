//! # Application Dependencies
//!
//! Parameter grouping for [`crate::LibraryStorage`] construction.
//! Not a builder: no defaults, no hidden logic.

use std::sync::Arc;
use std::time::Duration;

use mw_core::ports::*;

pub struct AppDeps {
    pub remote: Arc<dyn RemoteStorePort>,
    pub cache: Arc<dyn EntryCachePort>,
    pub analyzer: Arc<dyn ImageAnalyzerPort>,
    pub clock: Arc<dyn ClockPort>,
}

/// Behavioural knobs of the storage facade.
#[derive(Debug, Clone)]
pub struct StorageOptions {
    /// Background revalidation triggers once the last sync is older than this.
    pub stale_after: Duration,
    /// Directory for deployment markers; `None` disables signalling.
    pub deployment_marker_dir: Option<String>,
}
