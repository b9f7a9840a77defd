//! Hash-keyed cache of provider search result lists.
//!
//! An entry is keyed by the SHA-256 of the normalized query and its
//! effective filters, and holds the ordered ids of the works the search
//! returned. Entries are refreshed in place, so a cache id stays valid as a
//! saved-search handle.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};
use uuid::Uuid;

use litgraph_core::{CreateSearchCacheRequest, Result, SearchCacheEntry, SearchRequest, WorkStore};

/// Trim, lowercase and collapse internal whitespace runs.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Deterministic cache key for a search and its filters.
pub fn query_hash(
    query: &str,
    from_year: Option<i32>,
    to_year: Option<i32>,
    sort: Option<&str>,
) -> String {
    let year = |y: Option<i32>| y.map(|y| y.to_string()).unwrap_or_default();
    let key = format!(
        "{}|{}|{}|{}",
        normalize_query(query),
        year(from_year),
        year(to_year),
        sort.unwrap_or_default()
    );
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Cache key for a search request. The page is not part of the key.
pub fn request_hash(req: &SearchRequest) -> String {
    query_hash(
        &req.query,
        req.from_year,
        req.to_year,
        req.sort.map(|s| s.as_str()),
    )
}

/// Whether an entry refreshed at `refreshed_at` is older than the window at `now`.
///
/// A window too large to represent never expires.
pub fn is_stale_at(refreshed_at: DateTime<Utc>, now: DateTime<Utc>, max_age_hours: i64) -> bool {
    Duration::try_hours(max_age_hours).is_some_and(|max_age| now - refreshed_at > max_age)
}

pub fn is_stale(refreshed_at: DateTime<Utc>, max_age_hours: i64) -> bool {
    is_stale_at(refreshed_at, Utc::now(), max_age_hours)
}

/// Store-backed search cache operations.
#[derive(Clone)]
pub struct QueryCache {
    store: Arc<dyn WorkStore>,
}

impl QueryCache {
    pub fn new(store: Arc<dyn WorkStore>) -> Self {
        Self { store }
    }

    pub async fn find(&self, req: &SearchRequest) -> Result<Option<SearchCacheEntry>> {
        self.store.find_search_cache(&request_hash(req)).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<SearchCacheEntry>> {
        self.store.get_search_cache(id).await
    }

    /// Return the entry for this search, creating it from `work_ids` if absent.
    /// An existing entry is returned untouched.
    #[instrument(
        skip(self, req, work_ids),
        fields(subsystem = "pipeline", component = "query_cache", op = "find_or_create")
    )]
    pub async fn find_or_create(
        &self,
        req: &SearchRequest,
        work_ids: &[String],
        result_count: i64,
    ) -> Result<SearchCacheEntry> {
        if let Some(entry) = self.find(req).await? {
            return Ok(entry);
        }
        self.create(req, work_ids, result_count).await
    }

    /// Insert an entry for this search. A concurrent insert for the same key
    /// is refreshed with these results instead.
    pub async fn create(
        &self,
        req: &SearchRequest,
        work_ids: &[String],
        result_count: i64,
    ) -> Result<SearchCacheEntry> {
        let entry = self
            .store
            .insert_search_cache(CreateSearchCacheRequest {
                query_hash: request_hash(req),
                query: req.query.trim().to_string(),
                from_year: req.from_year,
                to_year: req.to_year,
                sort: req.sort.map(|s| s.as_str().to_string()),
                work_ids: work_ids.to_vec(),
                result_count,
                refreshed_at: Utc::now(),
            })
            .await?;
        debug!(cache_id = %entry.id, result_count, "Search cache entry stored");
        Ok(entry)
    }

    /// Overwrite an entry's ids, count and refresh time.
    pub async fn refresh(
        &self,
        entry: &SearchCacheEntry,
        work_ids: &[String],
        result_count: i64,
    ) -> Result<SearchCacheEntry> {
        let refreshed = self
            .store
            .refresh_search_cache(entry.id, work_ids, result_count, Utc::now())
            .await?;
        debug!(cache_id = %refreshed.id, result_count, "Search cache entry refreshed");
        Ok(refreshed)
    }
}
