//! Local persistence: recent searches, comparison set, favorites, company
//! cache and search log over a pluggable [`Storage`] backend.

mod error;
pub use error::StoreError;

mod storage;
pub use storage::{Collection, Storage};

mod memory;
pub use memory::MemoryStorage;

mod file;
pub use file::FileStorage;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStorage;

pub mod records;
pub use records::{
    CachedCompany, CleanupReport, ComparisonEntry, Favorite, RecentSearch, SearchLogEntry, Snapshot,
};

mod local;
pub use local::{COMPARISON_LIMIT, DEFAULT_RETENTION_DAYS, LocalStore, RECENT_SEARCH_LIMIT};
