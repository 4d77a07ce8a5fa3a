pub mod library_entry_mapper;

pub use library_entry_mapper::LibraryEntryRowMapper;
