//! Library use cases
//!
//! ```text
//! remote store ──► ResyncLibrary ──► entry cache ──► ListEntries / SearchEntries
//!      ▲                                  │
//!      └── SaveEntry / UpdateEntry / DeleteEntries (remote first, cache second)
//! ```

pub mod admin_session;
pub mod analyze_images;
pub mod cache_transfer;
pub mod delete_entries;
pub mod internal;
pub mod list_entries;
pub mod resync_library;
pub mod save_entry;
pub mod search_entries;
pub mod update_entry;

pub use admin_session::AdminSession;
pub use analyze_images::{AnalyzeImage, AnalyzeImages, ImageAnalysisResult};
pub use cache_transfer::{ExportCache, ImportCache};
pub use delete_entries::{BatchDeleteError, DeleteEntries, DeleteFailure};
pub use internal::{DeploymentSignal, UploadBatchError, UploadFailure};
pub use list_entries::{GetEntry, ListEntries, ListFeaturedEntries};
pub use resync_library::{
    RejectedDocument, ResyncError, ResyncHandle, ResyncLibrary, ResyncReport,
};
pub use save_entry::SaveEntry;
pub use search_entries::SearchEntries;
pub use update_entry::UpdateEntry;
