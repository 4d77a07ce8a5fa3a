//! # mw-core
//!
//! Domain model and ports for the Midweave library.
//!
//! This crate holds the entry schema, the validation gate, the remote file
//! layout and the port traits. It performs no I/O.

pub mod config;
pub mod entry;
pub mod ids;
pub mod ports;
pub mod remote;
pub mod time;
pub mod upload;

pub use config::AppConfig;
pub use entry::{Entry, EntryDraft, EntryImage, EntryPatch, EntryRejection, ParsedEntry};
pub use ids::EntryId;
pub use upload::{ImageUpload, UploadRejection};
