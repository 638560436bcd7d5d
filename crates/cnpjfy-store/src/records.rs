//! Persisted wrappers around the company model.

use chrono::{DateTime, Utc};
use cnpjfy_core::{Cnpj, Company};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentSearch {
    pub cnpj: Cnpj,
    pub registered_name: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonEntry {
    pub company: Company,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub cnpj: Cnpj,
    pub registered_name: String,
    pub added_at: DateTime<Utc>,
}

/// A cached lookup result with its usage counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedCompany {
    pub company: Company,
    pub searched_at: DateTime<Utc>,
    pub search_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchLogEntry {
    pub id: String,
    /// Cleaned digits of what was looked up; may be fewer than 14 for
    /// rejected input.
    pub cnpj: String,
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full dump of every collection, used for backup and restore.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exported_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recent_searches: Vec<RecentSearch>,
    #[serde(default)]
    pub comparison: Vec<ComparisonEntry>,
    #[serde(default)]
    pub favorites: Vec<Favorite>,
    #[serde(default)]
    pub companies: Vec<CachedCompany>,
    #[serde(default)]
    pub search_log: Vec<SearchLogEntry>,
}

/// How many entries a cleanup pass removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub recent_searches: usize,
    pub companies: usize,
    pub search_log: usize,
}

impl CleanupReport {
    pub fn total(&self) -> usize {
        self.recent_searches + self.companies + self.search_log
    }
}
