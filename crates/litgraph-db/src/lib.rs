//! # litgraph-db
//!
//! PostgreSQL store for the litgraph work graph.
//!
//! This crate provides:
//! - Connection pool management
//! - Transactional ingestion sessions
//! - Work, citation-graph and topic reads
//! - The provider search cache
//! - An in-memory store behind the `memory` feature
//!
//! ## Example
//!
//! ```rust,ignore
//! use litgraph_db::{Database, WorkStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/litgraph").await?;
//!     let work = db.get_work("W2741809807").await?;
//!     println!("{:?}", work.map(|w| w.title));
//!     Ok(())
//! }
//! ```

pub mod ingest;
#[cfg(feature = "memory")]
pub mod memory;
pub mod pool;
pub mod search_cache;
pub mod works;

pub mod test_fixtures;

pub use litgraph_core::*;

pub use ingest::PgIngestSession;
#[cfg(feature = "memory")]
pub use memory::{MemoryStore, StoreWrite};
pub use pool::{connect_pool, PoolConfig};
pub use search_cache::PgSearchCacheRepository;
pub use works::PgWorkRepository;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Work, relation and citation reads plus enrichment claims.
    pub works: PgWorkRepository,
    /// Cached provider searches.
    pub search_cache: PgSearchCacheRepository,
}

impl Database {
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            works: PgWorkRepository::new(pool.clone()),
            search_cache: PgSearchCacheRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect with the default pool configuration.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_config(url, PoolConfig::default()).await
    }

    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = connect_pool(url, &config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}

#[async_trait]
impl WorkStore for Database {
    async fn begin(&self) -> Result<Box<dyn IngestSession>> {
        Ok(Box::new(PgIngestSession::begin(&self.pool).await?))
    }

    async fn get_work(&self, id: &str) -> Result<Option<Work>> {
        self.works.get(id).await
    }

    async fn get_work_with_relations(&self, id: &str) -> Result<Option<WorkWithRelations>> {
        let mut found = self.works.get_with_relations(&[id.to_string()]).await?;
        Ok(found.pop())
    }

    async fn get_works_with_relations(&self, ids: &[String]) -> Result<Vec<WorkWithRelations>> {
        self.works.get_with_relations(ids).await
    }

    async fn filter_stub_ids(&self, ids: &[String]) -> Result<Vec<String>> {
        self.works.filter_stub_ids(ids).await
    }

    async fn list_stub_ids(&self, limit: i64, max_attempts: i32) -> Result<Vec<String>> {
        self.works.list_stub_ids(limit, max_attempts).await
    }

    async fn record_hydration_attempts(
        &self,
        ids: &[String],
        now: DateTime<Utc>,
    ) -> Result<u64> {
        self.works.record_hydration_attempts(ids, now).await
    }

    async fn citation_neighbors(&self, id: &str) -> Result<CitationNeighbors> {
        self.works.citation_neighbors(id).await
    }

    async fn claim_citation_fetch(
        &self,
        id: &str,
        lease: Duration,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        self.works.claim_citation_fetch(id, lease, now).await
    }

    async fn release_citation_claim(&self, id: &str, claimed_at: DateTime<Utc>) -> Result<()> {
        self.works.release_citation_claim(id, claimed_at).await
    }

    async fn find_search_cache(&self, query_hash: &str) -> Result<Option<SearchCacheEntry>> {
        self.search_cache.find_by_hash(query_hash).await
    }

    async fn get_search_cache(&self, id: Uuid) -> Result<Option<SearchCacheEntry>> {
        self.search_cache.get(id).await
    }

    async fn insert_search_cache(&self, req: CreateSearchCacheRequest) -> Result<SearchCacheEntry> {
        self.search_cache.insert(req).await
    }

    async fn refresh_search_cache(
        &self,
        id: Uuid,
        work_ids: &[String],
        result_count: i64,
        refreshed_at: DateTime<Utc>,
    ) -> Result<SearchCacheEntry> {
        self.search_cache
            .refresh(id, work_ids, result_count, refreshed_at)
            .await
    }
}
