//! # litgraph-pipeline
//!
//! Literature ingestion and hydration pipeline.
//!
//! - [`extract`]: pure normalization of provider payloads
//! - [`Ingestor`]: ordered, transactional upserts of one work and its references
//! - [`Hydrator`]: upgrades stub works in bounded-concurrency provider batches
//! - [`WorkFetcher`]: cache-first single work lookup
//! - [`CitationEnricher`]: one-time citation edge materialization
//! - [`QueryCache`] / [`SearchService`]: cached provider search
//!
//! [`Pipeline`] wires every component against one store and one pair of
//! providers.

use std::sync::Arc;

use litgraph_core::{CitationProvider, PrimaryProvider, WorkStore};

pub mod config;
pub mod enrich;
pub mod extract;
pub mod fetch;
pub mod hydrate;
pub mod ingest;
pub mod query_cache;
pub mod search;

pub use config::PipelineConfig;
pub use enrich::CitationEnricher;
pub use fetch::WorkFetcher;
pub use hydrate::Hydrator;
pub use ingest::Ingestor;
pub use query_cache::{is_stale, is_stale_at, normalize_query, query_hash, QueryCache};
pub use search::SearchService;

/// All pipeline components sharing one store and provider pair.
#[derive(Clone)]
pub struct Pipeline {
    pub store: Arc<dyn WorkStore>,
    pub ingestor: Ingestor,
    pub hydrator: Hydrator,
    pub fetcher: WorkFetcher,
    pub enricher: CitationEnricher,
    pub search: SearchService,
    pub config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn WorkStore>,
        primary: Arc<dyn PrimaryProvider>,
        citations: Arc<dyn CitationProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            ingestor: Ingestor::new(store.clone()),
            hydrator: Hydrator::new(store.clone(), primary.clone(), config.clone()),
            fetcher: WorkFetcher::new(store.clone(), primary.clone()),
            enricher: CitationEnricher::new(store.clone(), citations, config.clone()),
            search: SearchService::new(store.clone(), primary, config.clone()),
            store,
            config,
        }
    }
}
