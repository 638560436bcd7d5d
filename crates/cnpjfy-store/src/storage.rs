//! The storage capability behind [`LocalStore`](crate::LocalStore).
//!
//! A backend is a set of named collections, each a map from string keys to
//! JSON values. Backends know nothing about the records they hold.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::StoreError;

/// The persisted collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection {
    RecentSearches,
    Comparison,
    Favorites,
    Companies,
    SearchLog,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::RecentSearches,
        Collection::Comparison,
        Collection::Favorites,
        Collection::Companies,
        Collection::SearchLog,
    ];

    /// Stable on-disk name.
    pub fn name(self) -> &'static str {
        match self {
            Collection::RecentSearches => "recent_searches",
            Collection::Comparison => "comparison",
            Collection::Favorites => "favorites",
            Collection::Companies => "companies",
            Collection::SearchLog => "search_log",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Keyed JSON storage, one namespace per [`Collection`].
///
/// Writes are last-write-wins. Nothing is atomic across collections.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, collection: Collection, key: &str) -> Result<Option<Value>, StoreError>;

    /// Insert or overwrite.
    async fn put(&self, collection: Collection, key: &str, value: Value) -> Result<(), StoreError>;

    /// Removing a missing key is not an error.
    async fn delete(&self, collection: Collection, key: &str) -> Result<(), StoreError>;

    /// All entries, in key order.
    async fn list(&self, collection: Collection) -> Result<Vec<(String, Value)>, StoreError>;

    async fn clear(&self, collection: Collection) -> Result<(), StoreError>;
}
