//! ID type wrappers for type safety.

pub mod entry_id;

pub use entry_id::EntryId;
