//! Library entries: the document shared by the local cache and the remote store.

pub mod draft;
pub mod model;
pub mod parameters;
pub mod search;
pub mod validation;

pub use draft::{DraftImage, EntryDraft, EntryPatch};
pub use model::{
    AdminMetadata, AiAnalysis, AnalysisTags, ColorAnalysis, Entry, EntryImage, Parameters,
    StyleAnalysis, TechnicalAnalysis,
};
pub use search::matches_query;
pub use validation::{
    parse_remote_document, validate_draft, validate_entry, EntryRejection, ParsedEntry,
};
