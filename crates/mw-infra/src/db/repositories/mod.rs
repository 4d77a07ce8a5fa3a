mod entry_cache_repo;

pub use entry_cache_repo::*;
