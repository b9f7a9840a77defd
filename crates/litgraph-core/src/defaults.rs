//! Centralized default constants for litgraph.
//!
//! **This module is the single source of truth** for shared default values.
//! Components read their environment overrides in `Config::from_env()` and
//! fall back to these constants.

// =============================================================================
// ENTITY DEFAULTS
// =============================================================================

/// Title written on stub works created as citation-edge endpoints.
pub const STUB_TITLE: &str = "Unknown";

/// Title used when a full provider record has no title.
pub const UNTITLED: &str = "Untitled";

/// Display name used for authors, institutions, sources and funders without one.
pub const UNKNOWN_NAME: &str = "Unknown";

// =============================================================================
// PROVIDERS
// =============================================================================

/// OpenAlex API base URL.
pub const OPENALEX_URL: &str = "https://api.openalex.org";

/// Semantic Scholar Graph API base URL.
pub const SEMANTIC_SCHOLAR_URL: &str = "https://api.semanticscholar.org";

/// Maximum ids per OpenAlex OR-filter batch request.
pub const OPENALEX_BATCH_SIZE: usize = 100;

/// Default page size for provider search.
pub const SEARCH_PER_PAGE: u32 = 20;

/// Maximum page size accepted for provider search.
pub const SEARCH_PER_PAGE_MAX: u32 = 200;

/// Earliest publication year accepted in a search filter.
pub const MIN_PUBLICATION_YEAR: i32 = 0;

/// Latest publication year accepted in a search filter.
pub const MAX_PUBLICATION_YEAR: i32 = 9999;

/// Page size for the paginated cited-by fetch.
pub const CITED_BY_PAGE_SIZE: usize = 100;

/// Upper bound on citing works collected for one record.
pub const CITED_BY_MAX: usize = 5_000;

/// Provider HTTP request timeout in seconds.
pub const PROVIDER_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// PIPELINE
// =============================================================================

/// Maximum ids per store `IN (...)` lookup.
pub const STORE_IN_CHUNK: usize = 200;

/// Provider batches fetched concurrently during hydration.
pub const HYDRATE_CONCURRENCY: usize = 3;

/// Stubs selected per scheduled hydration run.
pub const HYDRATE_BATCH_LIMIT: i64 = 50;

/// Hydration attempts after which a stub is no longer selected by scheduled runs.
pub const HYDRATE_MAX_ATTEMPTS: i32 = 5;

/// Lease held by an enrichment claim before another caller may take it over.
pub const ENRICH_CLAIM_LEASE_SECS: i64 = 600;

/// Upper bound accepted for the enrichment lease, in seconds.
pub const MAX_ENRICH_CLAIM_LEASE_SECS: i64 = 86_400;

// =============================================================================
// QUERY CACHE
// =============================================================================

/// Staleness window for page-1 search caching, in hours.
pub const SEARCH_CACHE_MAX_AGE_HOURS: i64 = 4;

/// Staleness window for replaying a "newest"-sorted saved search, in hours.
pub const SAVED_SEARCH_MAX_AGE_HOURS: i64 = 24;

/// Upper bound accepted for either staleness window, in hours.
pub const MAX_CACHE_AGE_HOURS: i64 = 8_760;

/// Sort key whose results change over time and are refreshed on stale reads.
pub const SORT_NEWEST: &str = "newest";

// =============================================================================
// JOB PROCESSING
// =============================================================================

/// Maximum jobs executed concurrently by the worker.
pub const JOB_MAX_CONCURRENT: usize = 4;

/// Interval between scheduled stub hydration runs, in seconds.
pub const HYDRATE_INTERVAL_SECS: u64 = 900;

/// Wall-clock limit for one job, in seconds.
pub const JOB_TIMEOUT_SECS: u64 = 600;

/// Capacity of the job submission queue.
pub const JOB_QUEUE_CAPACITY: usize = 1024;

/// Default worker event broadcast channel capacity.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saved_search_window_longer_than_search_window() {
        assert!(SAVED_SEARCH_MAX_AGE_HOURS > SEARCH_CACHE_MAX_AGE_HOURS);
    }

    #[test]
    fn test_store_chunk_covers_provider_batch() {
        assert!(STORE_IN_CHUNK >= OPENALEX_BATCH_SIZE);
    }
}
