//! Core traits for litgraph abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::payload::RawWork;

// =============================================================================
// STORE TRAITS
// =============================================================================

/// One atomic unit of ingestion writes.
///
/// Writes are visible to readers only after [`IngestSession::commit`].
/// Dropping a session without committing discards every write.
#[async_trait]
pub trait IngestSession: Send {
    /// Upsert publication venues, overwriting mutable columns.
    async fn upsert_sources(&mut self, sources: &[Source]) -> Result<()>;

    async fn upsert_institutions(&mut self, institutions: &[Institution]) -> Result<()>;

    async fn upsert_funders(&mut self, funders: &[Funder]) -> Result<()>;

    /// Upsert topic nodes. Parents must already exist in this session or the store.
    async fn upsert_topics(&mut self, topics: &[Topic]) -> Result<()>;

    async fn upsert_authors(&mut self, authors: &[Author]) -> Result<()>;

    /// Insert or overwrite a full work. Clears the stub flag and never
    /// touches `citations_fetched`.
    async fn upsert_work(&mut self, work: &WorkRecord) -> Result<()>;

    async fn upsert_work_authors(&mut self, links: &[WorkAuthor]) -> Result<()>;

    async fn upsert_work_topics(&mut self, links: &[WorkTopic]) -> Result<()>;

    async fn upsert_work_funders(&mut self, links: &[WorkFunder]) -> Result<()>;

    /// Insert author/institution pairs, ignoring existing ones.
    async fn insert_author_institutions(&mut self, links: &[AuthorInstitution]) -> Result<()>;

    /// Insert stub works for ids not yet present. Returns the number created.
    async fn insert_stub_works(&mut self, ids: &[String]) -> Result<u64>;

    /// Insert citation edges, ignoring existing ones. Returns the number created.
    async fn insert_citation_edges(&mut self, edges: &[CitationEdge]) -> Result<u64>;

    /// Set `citations_fetched` and clear any enrichment claim.
    async fn mark_citations_fetched(&mut self, work_id: &str) -> Result<()>;

    /// Make every write in this session visible.
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Persistent work graph and search cache.
#[async_trait]
pub trait WorkStore: Send + Sync {
    /// Open a new ingestion session.
    async fn begin(&self) -> Result<Box<dyn IngestSession>>;

    /// Fetch a single work row.
    async fn get_work(&self, id: &str) -> Result<Option<Work>>;

    /// Fetch a work with authors ordered by position and topics by score.
    async fn get_work_with_relations(&self, id: &str) -> Result<Option<WorkWithRelations>>;

    /// Fetch several works with relations, preserving the order of `ids`.
    /// Missing ids are skipped.
    async fn get_works_with_relations(&self, ids: &[String]) -> Result<Vec<WorkWithRelations>>;

    /// Return the subset of `ids` that are stored as stubs.
    async fn filter_stub_ids(&self, ids: &[String]) -> Result<Vec<String>>;

    /// List up to `limit` stub ids with fewer than `max_attempts` hydration
    /// attempts. Never-attempted stubs come first, then the least recently
    /// attempted; ties break on creation order.
    async fn list_stub_ids(&self, limit: i64, max_attempts: i32) -> Result<Vec<String>>;

    /// Count one hydration attempt at `now` for each of `ids` that is still a
    /// stub. Returns the number of rows updated.
    async fn record_hydration_attempts(&self, ids: &[String], now: DateTime<Utc>)
        -> Result<u64>;

    /// Outgoing and incoming citation edges for a work.
    async fn citation_neighbors(&self, id: &str) -> Result<CitationNeighbors>;

    /// Atomically claim a work for citation enrichment.
    ///
    /// A claim older than `lease` is considered abandoned and may be taken over.
    async fn claim_citation_fetch(
        &self,
        id: &str,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome>;

    /// Drop a claim after a failed enrichment so a later call may retry.
    ///
    /// Only clears the claim taken at `claimed_at`; a claim another caller
    /// took over after the lease expired is left alone.
    async fn release_citation_claim(&self, id: &str, claimed_at: DateTime<Utc>) -> Result<()>;

    /// Look up a search cache entry by query hash.
    async fn find_search_cache(&self, query_hash: &str) -> Result<Option<SearchCacheEntry>>;

    async fn get_search_cache(&self, id: Uuid) -> Result<Option<SearchCacheEntry>>;

    /// Insert a cache entry. If one already exists for the hash, it is
    /// refreshed in place and returned.
    async fn insert_search_cache(&self, req: CreateSearchCacheRequest) -> Result<SearchCacheEntry>;

    /// Replace an entry's result list and refresh time.
    async fn refresh_search_cache(
        &self,
        id: Uuid,
        work_ids: &[String],
        result_count: i64,
        refreshed_at: DateTime<Utc>,
    ) -> Result<SearchCacheEntry>;
}

// =============================================================================
// PROVIDER TRAITS
// =============================================================================

/// Primary bibliographic metadata provider.
#[async_trait]
pub trait PrimaryProvider: Send + Sync {
    /// Provider name for logs and errors.
    fn name(&self) -> &'static str;

    /// Maximum ids accepted by one [`PrimaryProvider::batch_get_works`] call.
    fn max_batch_size(&self) -> usize;

    /// Fetch one work. Returns `None` when the provider has no such record.
    async fn get_work(&self, id: &str) -> Result<Option<RawWork>>;

    /// Run a keyword search.
    async fn search_works(&self, req: &SearchRequest) -> Result<SearchPage>;

    /// Fetch up to [`PrimaryProvider::max_batch_size`] works in one request.
    /// Unknown ids are silently absent from the result.
    async fn batch_get_works(&self, ids: &[String]) -> Result<Vec<RawWork>>;
}

/// Secondary provider used for the citation graph.
///
/// Both methods return primary-provider ids. A record the provider does not
/// know yields an empty list, not an error.
#[async_trait]
pub trait CitationProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Works cited by `work_id`.
    async fn fetch_references(&self, work_id: &str) -> Result<Vec<String>>;

    /// Works citing `work_id`.
    async fn fetch_cited_by(&self, work_id: &str) -> Result<Vec<String>>;
}
