//! Provider search behind the query cache.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use litgraph_core::defaults::{
    MAX_PUBLICATION_YEAR, MIN_PUBLICATION_YEAR, SEARCH_PER_PAGE, SEARCH_PER_PAGE_MAX,
};
use litgraph_core::{
    Error, PrimaryProvider, Result, SearchCacheEntry, SearchRequest, SearchResults, SearchSort,
    WorkStore, WorkWithRelations,
};

use crate::config::PipelineConfig;
use crate::ingest::Ingestor;
use crate::query_cache::{is_stale, QueryCache};

/// Searches the primary provider, ingesting results and caching page 1.
#[derive(Clone)]
pub struct SearchService {
    store: Arc<dyn WorkStore>,
    provider: Arc<dyn PrimaryProvider>,
    ingestor: Ingestor,
    cache: QueryCache,
    config: PipelineConfig,
}

/// Result ids and total count of one provider search, after ingestion.
struct Executed {
    work_ids: Vec<String>,
    total_count: i64,
}

impl SearchService {
    pub fn new(
        store: Arc<dyn WorkStore>,
        provider: Arc<dyn PrimaryProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            ingestor: Ingestor::new(store.clone()),
            cache: QueryCache::new(store.clone()),
            store,
            provider,
            config,
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    fn validate(req: &SearchRequest) -> Result<SearchRequest> {
        let query = req.query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("search query is empty".to_string()));
        }
        for year in [req.from_year, req.to_year].into_iter().flatten() {
            if !(MIN_PUBLICATION_YEAR..=MAX_PUBLICATION_YEAR).contains(&year) {
                return Err(Error::InvalidInput(format!(
                    "year {year} outside {MIN_PUBLICATION_YEAR}..={MAX_PUBLICATION_YEAR}"
                )));
            }
        }
        if let (Some(from), Some(to)) = (req.from_year, req.to_year) {
            if from > to {
                return Err(Error::InvalidInput(format!(
                    "from_year {from} is after to_year {to}"
                )));
            }
        }
        Ok(SearchRequest {
            query: query.to_string(),
            page: req.page.max(1),
            per_page: req.per_page.clamp(1, SEARCH_PER_PAGE_MAX),
            ..req.clone()
        })
    }

    /// Whether a validated request is served through the query cache. Only
    /// the first page at the default page size is cached.
    fn is_cacheable(req: &SearchRequest) -> bool {
        req.page == 1 && req.per_page == SEARCH_PER_PAGE
    }

    /// Run a search. A cacheable request is served from a fresh cache entry
    /// when one exists; otherwise the provider is queried and the entry
    /// created or refreshed. When refreshing a stale entry fails, the stale
    /// results are served. Other pages and page sizes always go to the
    /// provider.
    #[instrument(
        skip(self, req),
        fields(subsystem = "pipeline", component = "search", op = "search", query = %req.query, page = req.page)
    )]
    pub async fn search(&self, req: &SearchRequest) -> Result<SearchResults> {
        let start = Instant::now();
        let req = Self::validate(req)?;

        if !Self::is_cacheable(&req) {
            let executed = self.execute(&req).await?;
            return self.results(&req, executed.work_ids, executed.total_count, None, false).await;
        }

        let cached = self.cache.find(&req).await?;
        if let Some(entry) = &cached {
            if !is_stale(entry.refreshed_at, self.config.search_cache_max_age_hours) {
                debug!(cache_id = %entry.id, "Search cache hit");
                return self
                    .results(&req, entry.work_ids.clone(), entry.result_count, Some(entry.id), true)
                    .await;
            }
            debug!(cache_id = %entry.id, "Search cache entry stale");
        }

        let executed = match self.execute(&req).await {
            Ok(executed) => executed,
            Err(e) => {
                let Some(entry) = cached else {
                    return Err(e);
                };
                warn!(cache_id = %entry.id, error = %e, "Search refresh failed, serving stale results");
                return self
                    .results(&req, entry.work_ids.clone(), entry.result_count, Some(entry.id), true)
                    .await;
            }
        };
        let entry = match cached {
            Some(entry) => {
                self.cache
                    .refresh(&entry, &executed.work_ids, executed.total_count)
                    .await?
            }
            None => {
                self.cache
                    .create(&req, &executed.work_ids, executed.total_count)
                    .await?
            }
        };

        info!(
            cache_id = %entry.id,
            result_count = executed.work_ids.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Search executed"
        );
        self.results(&req, executed.work_ids, executed.total_count, Some(entry.id), false)
            .await
    }

    /// Serve a saved search by cache id.
    ///
    /// A `newest`-sorted entry older than the saved-search window is re-run
    /// against the provider and refreshed in place; if that fails the stale
    /// results are served.
    #[instrument(
        skip(self),
        fields(subsystem = "pipeline", component = "search", op = "replay", cache_id = %cache_id)
    )]
    pub async fn replay(&self, cache_id: Uuid) -> Result<SearchResults> {
        let entry = self
            .cache
            .get(cache_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("search cache entry {cache_id}")))?;
        let req = Self::request_for(&entry);

        let time_sensitive = req.sort.is_some_and(|s| s.is_time_sensitive());
        if time_sensitive && is_stale(entry.refreshed_at, self.config.saved_search_max_age_hours) {
            match self.refresh_entry(&entry, &req).await {
                Ok(refreshed) => {
                    info!(result_count = refreshed.work_ids.len(), "Saved search refreshed");
                    return self
                        .results(
                            &req,
                            refreshed.work_ids,
                            refreshed.result_count,
                            Some(refreshed.id),
                            false,
                        )
                        .await;
                }
                Err(e) => {
                    warn!(error = %e, "Saved search refresh failed, serving stale results");
                }
            }
        }

        self.results(&req, entry.work_ids.clone(), entry.result_count, Some(entry.id), true)
            .await
    }

    fn request_for(entry: &SearchCacheEntry) -> SearchRequest {
        let sort = entry.sort.as_deref().and_then(|s| match s.parse::<SearchSort>() {
            Ok(sort) => Some(sort),
            Err(_) => {
                warn!(cache_id = %entry.id, sort = s, "Ignoring unknown cached sort");
                None
            }
        });
        SearchRequest {
            query: entry.query.clone(),
            page: 1,
            per_page: SEARCH_PER_PAGE,
            from_year: entry.from_year,
            to_year: entry.to_year,
            sort,
        }
    }

    async fn refresh_entry(
        &self,
        entry: &SearchCacheEntry,
        req: &SearchRequest,
    ) -> Result<SearchCacheEntry> {
        let executed = self.execute(req).await?;
        self.cache
            .refresh(entry, &executed.work_ids, executed.total_count)
            .await
    }

    /// Query the provider and ingest every result. Works that fail to
    /// ingest are dropped from the result list.
    async fn execute(&self, req: &SearchRequest) -> Result<Executed> {
        let page = self.provider.search_works(req).await?;
        let mut work_ids = Vec::with_capacity(page.results.len());
        for raw in &page.results {
            match self.ingestor.ingest_work(raw).await {
                Ok(work) => work_ids.push(work.id),
                Err(e) => warn!(work_id = %raw.id, error = %e, "Dropping search result"),
            }
        }
        Ok(Executed {
            work_ids,
            total_count: page.total_count,
        })
    }

    async fn results(
        &self,
        req: &SearchRequest,
        work_ids: Vec<String>,
        count: i64,
        cache_id: Option<Uuid>,
        from_cache: bool,
    ) -> Result<SearchResults> {
        let results: Vec<WorkWithRelations> = self.store.get_works_with_relations(&work_ids).await?;
        Ok(SearchResults {
            results,
            count,
            page: req.page,
            per_page: req.per_page,
            cache_id,
            from_cache,
        })
    }
}
