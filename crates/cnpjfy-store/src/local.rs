//! `LocalStore`: the user's history, comparison set, favorites, company
//! cache and search log on top of a [`Storage`] backend.
//!
//! Storage failures never reach the caller. Every operation logs a warning
//! and falls back to an empty or default result, so the lookup flow keeps
//! working when persistence is broken.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, TimeDelta, Utc};
use cnpjfy_core::cnpj::clean;
use cnpjfy_core::{Cnpj, Company};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::records::{
    CachedCompany, CleanupReport, ComparisonEntry, Favorite, RecentSearch, SearchLogEntry, Snapshot,
};
use crate::{Collection, MemoryStorage, Storage, StoreError};

/// Recent searches kept, most recent first.
pub const RECENT_SEARCH_LIMIT: usize = 10;

/// Companies in the comparison set.
pub const COMPARISON_LIMIT: usize = 4;

/// Retention used by `cleanup` when the caller has no preference.
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Key of the single document holding an ordered collection.
const LIST_KEY: &str = "list";

pub struct LocalStore {
    storage: Arc<dyn Storage>,
    seq: AtomicU64,
    /// Held across every load-modify-save so concurrent callers don't lose
    /// each other's updates.
    update_lock: Mutex<()>,
}

impl LocalStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            seq: AtomicU64::new(0),
            update_lock: Mutex::new(()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    // ── Recent searches ──

    /// Move `cnpj` to the front of the recent list, dropping entries past the
    /// limit.
    pub async fn add_recent_search(&self, cnpj: &Cnpj, registered_name: &str) {
        let _guard = self.update_lock.lock().await;
        let result = async {
            let mut list: Vec<RecentSearch> = self.load_list(Collection::RecentSearches).await?;
            list.retain(|r| &r.cnpj != cnpj);
            list.insert(
                0,
                RecentSearch {
                    cnpj: cnpj.clone(),
                    registered_name: registered_name.to_string(),
                    timestamp: Utc::now(),
                },
            );
            list.truncate(RECENT_SEARCH_LIMIT);
            self.save_list(Collection::RecentSearches, &list).await
        }
        .await;
        or_default("add_recent_search", result)
    }

    pub async fn recent_searches(&self) -> Vec<RecentSearch> {
        or_default(
            "recent_searches",
            self.load_list(Collection::RecentSearches).await,
        )
    }

    pub async fn clear_recent_searches(&self) {
        or_default(
            "clear_recent_searches",
            self.storage.clear(Collection::RecentSearches).await,
        )
    }

    // ── Comparison set ──

    /// Put `company` at the front of the comparison set. The set never grows
    /// past [`COMPARISON_LIMIT`]; callers are expected to refuse a fifth
    /// company before getting here.
    pub async fn add_to_comparison(&self, company: &Company) {
        let _guard = self.update_lock.lock().await;
        let result = async {
            let mut list: Vec<ComparisonEntry> = self.load_list(Collection::Comparison).await?;
            list.retain(|e| e.company.cnpj != company.cnpj);
            list.insert(
                0,
                ComparisonEntry {
                    company: company.clone(),
                    timestamp: Utc::now(),
                },
            );
            list.truncate(COMPARISON_LIMIT);
            self.save_list(Collection::Comparison, &list).await
        }
        .await;
        or_default("add_to_comparison", result)
    }

    pub async fn remove_from_comparison(&self, cnpj: &Cnpj) {
        let _guard = self.update_lock.lock().await;
        let result = async {
            let mut list: Vec<ComparisonEntry> = self.load_list(Collection::Comparison).await?;
            list.retain(|e| &e.company.cnpj != cnpj);
            self.save_list(Collection::Comparison, &list).await
        }
        .await;
        or_default("remove_from_comparison", result)
    }

    pub async fn comparison(&self) -> Vec<ComparisonEntry> {
        or_default("comparison", self.load_list(Collection::Comparison).await)
    }

    pub async fn clear_comparison(&self) {
        or_default(
            "clear_comparison",
            self.storage.clear(Collection::Comparison).await,
        )
    }

    // ── Favorites ──

    pub async fn add_favorite(&self, cnpj: &Cnpj, registered_name: &str) {
        let favorite = Favorite {
            cnpj: cnpj.clone(),
            registered_name: registered_name.to_string(),
            added_at: Utc::now(),
        };
        or_default(
            "add_favorite",
            self.put_record(Collection::Favorites, cnpj.as_str(), &favorite)
                .await,
        )
    }

    pub async fn remove_favorite(&self, cnpj: &Cnpj) {
        or_default(
            "remove_favorite",
            self.storage
                .delete(Collection::Favorites, cnpj.as_str())
                .await,
        )
    }

    /// All favorites, newest first.
    pub async fn favorites(&self) -> Vec<Favorite> {
        let mut favorites: Vec<Favorite> = or_default(
            "favorites",
            self.load_records(Collection::Favorites).await,
        );
        favorites.sort_by(|a, b| b.added_at.cmp(&a.added_at));
        favorites
    }

    pub async fn is_favorite(&self, cnpj: &Cnpj) -> bool {
        let found = self
            .storage
            .get(Collection::Favorites, cnpj.as_str())
            .await
            .map(|v| v.is_some());
        or_default("is_favorite", found)
    }

    // ── Company cache ──

    /// Cache `company`, replacing any previous payload and bumping the usage
    /// counter.
    pub async fn save_company(&self, company: &Company) {
        let _guard = self.update_lock.lock().await;
        let result = async {
            let key = company.cnpj.as_str();
            let previous = self
                .storage
                .get(Collection::Companies, key)
                .await?
                .and_then(|v| decode::<CachedCompany>(Collection::Companies, key, v));
            let search_count = previous.map_or(1, |p| p.search_count.saturating_add(1));
            let cached = CachedCompany {
                company: company.clone(),
                searched_at: Utc::now(),
                search_count,
            };
            debug!(cnpj = %company.cnpj, search_count, "caching company");
            self.put_record(Collection::Companies, key, &cached).await
        }
        .await;
        or_default("save_company", result)
    }

    pub async fn get_company(&self, cnpj: &Cnpj) -> Option<CachedCompany> {
        let result = self
            .storage
            .get(Collection::Companies, cnpj.as_str())
            .await
            .map(|v| v.and_then(|v| decode(Collection::Companies, cnpj.as_str(), v)));
        or_default("get_company", result)
    }

    pub async fn delete_company(&self, cnpj: &Cnpj) {
        or_default(
            "delete_company",
            self.storage
                .delete(Collection::Companies, cnpj.as_str())
                .await,
        )
    }

    /// Most recently looked-up companies.
    pub async fn recent_companies(&self, limit: usize) -> Vec<CachedCompany> {
        let mut companies = self.cached_companies("recent_companies").await;
        companies.sort_by(|a, b| b.searched_at.cmp(&a.searched_at));
        companies.truncate(limit);
        companies
    }

    /// Companies by usage counter; ties go to the more recent lookup.
    pub async fn most_searched(&self, limit: usize) -> Vec<CachedCompany> {
        let mut companies = self.cached_companies("most_searched").await;
        companies.sort_by(|a, b| {
            b.search_count
                .cmp(&a.search_count)
                .then_with(|| b.searched_at.cmp(&a.searched_at))
        });
        companies.truncate(limit);
        companies
    }

    /// Case-insensitive match on registered or trade name, plus a digit match
    /// on the identifier when the query has digits. A blank query matches
    /// nothing.
    pub async fn search_local(&self, query: &str, limit: usize) -> Vec<CachedCompany> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let digits = clean(&needle);
        let mut hits: Vec<CachedCompany> = self
            .cached_companies("search_local")
            .await
            .into_iter()
            .filter(|c| {
                let company = &c.company;
                company.registered_name.to_lowercase().contains(&needle)
                    || company
                        .trade_name
                        .as_deref()
                        .is_some_and(|t| t.to_lowercase().contains(&needle))
                    || (!digits.is_empty() && company.cnpj.as_str().contains(&digits))
            })
            .collect();
        hits.sort_by(|a, b| b.searched_at.cmp(&a.searched_at));
        hits.truncate(limit);
        hits
    }

    async fn cached_companies(&self, op: &str) -> Vec<CachedCompany> {
        or_default(op, self.load_records(Collection::Companies).await)
    }

    // ── Search log ──

    /// Record a lookup attempt. `cnpj` is stored as its cleaned digits.
    pub async fn log_search(&self, cnpj: &str, query: &str, success: bool, error: Option<&str>) {
        let now = Utc::now();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let entry = SearchLogEntry {
            id: format!("{}-{seq:04}", now.timestamp_micros()),
            cnpj: clean(cnpj),
            query: query.to_string(),
            timestamp: now,
            success,
            error: error.map(str::to_string),
        };
        or_default(
            "log_search",
            self.put_record(Collection::SearchLog, &entry.id, &entry)
                .await,
        )
    }

    /// Latest log entries first.
    pub async fn search_log(&self, limit: usize) -> Vec<SearchLogEntry> {
        let mut entries: Vec<SearchLogEntry> = or_default(
            "search_log",
            self.load_records(Collection::SearchLog).await,
        );
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id)));
        entries.truncate(limit);
        entries
    }

    pub async fn clear_search_log(&self) {
        or_default(
            "clear_search_log",
            self.storage.clear(Collection::SearchLog).await,
        )
    }

    // ── Retention ──

    /// Drop recent searches, search-log entries and cached companies older
    /// than `days_to_keep` days. Favorited companies stay cached; favorites
    /// themselves are never pruned.
    pub async fn cleanup(&self, days_to_keep: u32) -> CleanupReport {
        let cutoff = retention_cutoff(days_to_keep);
        let _guard = self.update_lock.lock().await;
        let result = async {
            let mut report = CleanupReport::default();

            let mut recent: Vec<RecentSearch> = self.load_list(Collection::RecentSearches).await?;
            let before = recent.len();
            recent.retain(|r| r.timestamp >= cutoff);
            report.recent_searches = before - recent.len();
            if report.recent_searches > 0 {
                self.save_list(Collection::RecentSearches, &recent).await?;
            }

            for entry in self.load_records::<SearchLogEntry>(Collection::SearchLog).await? {
                if entry.timestamp < cutoff {
                    self.storage.delete(Collection::SearchLog, &entry.id).await?;
                    report.search_log += 1;
                }
            }

            let favorites: HashSet<Cnpj> = self
                .load_records::<Favorite>(Collection::Favorites)
                .await?
                .into_iter()
                .map(|f| f.cnpj)
                .collect();
            for cached in self.load_records::<CachedCompany>(Collection::Companies).await? {
                let cnpj = &cached.company.cnpj;
                if cached.searched_at < cutoff && !favorites.contains(cnpj) {
                    self.storage.delete(Collection::Companies, cnpj.as_str()).await?;
                    report.companies += 1;
                }
            }

            Ok::<_, StoreError>(report)
        }
        .await;
        let report = or_default("cleanup", result);
        info!(
            days_to_keep,
            recent_searches = report.recent_searches,
            companies = report.companies,
            search_log = report.search_log,
            "cleanup finished"
        );
        report
    }

    // ── Backup ──

    pub async fn export_all(&self) -> Snapshot {
        let result = async {
            Ok::<_, StoreError>(Snapshot {
                exported_at: Some(Utc::now()),
                recent_searches: self.load_list(Collection::RecentSearches).await?,
                comparison: self.load_list(Collection::Comparison).await?,
                favorites: self.load_records(Collection::Favorites).await?,
                companies: self.load_records(Collection::Companies).await?,
                search_log: self.load_records(Collection::SearchLog).await?,
            })
        }
        .await;
        or_default("export_all", result)
    }

    /// Replace every collection with the snapshot's contents.
    pub async fn import_all(&self, snapshot: &Snapshot) {
        let _guard = self.update_lock.lock().await;
        let result = async {
            for collection in Collection::ALL {
                self.storage.clear(collection).await?;
            }
            let mut recent = snapshot.recent_searches.clone();
            recent.truncate(RECENT_SEARCH_LIMIT);
            self.save_list(Collection::RecentSearches, &recent).await?;
            let mut comparison = snapshot.comparison.clone();
            comparison.truncate(COMPARISON_LIMIT);
            self.save_list(Collection::Comparison, &comparison).await?;
            for f in &snapshot.favorites {
                self.put_record(Collection::Favorites, f.cnpj.as_str(), f).await?;
            }
            for c in &snapshot.companies {
                self.put_record(Collection::Companies, c.company.cnpj.as_str(), c)
                    .await?;
            }
            for e in &snapshot.search_log {
                self.put_record(Collection::SearchLog, &e.id, e).await?;
            }
            Ok::<_, StoreError>(())
        }
        .await;
        if result.is_ok() {
            info!(
                favorites = snapshot.favorites.len(),
                companies = snapshot.companies.len(),
                "imported snapshot"
            );
        }
        or_default("import_all", result)
    }

    pub async fn clear_all(&self) {
        let result = async {
            for collection in Collection::ALL {
                self.storage.clear(collection).await?;
            }
            Ok::<_, StoreError>(())
        }
        .await;
        or_default("clear_all", result)
    }

    // ── Helpers ──

    async fn load_list<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>, StoreError> {
        let items = match self.storage.get(collection, LIST_KEY).await? {
            Some(Value::Array(items)) => items,
            Some(_) => {
                warn!(%collection, "ordered collection is not a list; treating as empty");
                return Ok(Vec::new());
            }
            None => return Ok(Vec::new()),
        };
        Ok(items
            .into_iter()
            .filter_map(|v| decode(collection, LIST_KEY, v))
            .collect())
    }

    async fn save_list<T: Serialize>(&self, collection: Collection, items: &[T]) -> Result<(), StoreError> {
        let value = serde_json::to_value(items)?;
        self.storage.put(collection, LIST_KEY, value).await
    }

    async fn load_records<T: DeserializeOwned>(&self, collection: Collection) -> Result<Vec<T>, StoreError> {
        Ok(self
            .storage
            .list(collection)
            .await?
            .into_iter()
            .filter_map(|(key, v)| decode(collection, &key, v))
            .collect())
    }

    async fn put_record<T: Serialize>(
        &self,
        collection: Collection,
        key: &str,
        record: &T,
    ) -> Result<(), StoreError> {
        let value = serde_json::to_value(record)?;
        self.storage.put(collection, key, value).await
    }
}

fn decode<T: DeserializeOwned>(collection: Collection, key: &str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(%collection, key, error = %e, "skipping undecodable record");
            None
        }
    }
}

fn or_default<T: Default>(op: &str, result: Result<T, StoreError>) -> T {
    result.unwrap_or_else(|e| {
        warn!(op, error = %e, "local storage operation failed");
        T::default()
    })
}

/// Oldest timestamp that survives a cleanup. Retentions reaching past the
/// representable range keep everything.
fn retention_cutoff(days_to_keep: u32) -> DateTime<Utc> {
    TimeDelta::try_days(i64::from(days_to_keep))
        .and_then(|keep| Utc::now().checked_sub_signed(keep))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
