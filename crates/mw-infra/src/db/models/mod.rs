pub mod library_entry_row;
pub mod sync_state_row;

pub use library_entry_row::{LibraryEntryRow, NewLibraryEntryRow};
pub use sync_state_row::SyncStateRow;
