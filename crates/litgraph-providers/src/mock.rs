//! Mock providers for deterministic testing.
//!
//! Both mocks keep a call log so tests can assert how many provider
//! round-trips an operation made.
//!
//! ```rust,ignore
//! use litgraph_providers::mock::MockPrimaryProvider;
//!
//! let provider = MockPrimaryProvider::new().with_work(raw_work);
//! let found = provider.get_work("W1").await?;
//! assert_eq!(provider.call_count("get_work"), 1);
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use litgraph_core::defaults::OPENALEX_BATCH_SIZE;
use litgraph_core::{
    normalize_id, CitationProvider, Error, PrimaryProvider, RawWork, Result, SearchPage,
    SearchRequest,
};

/// One recorded provider call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderCall {
    pub operation: &'static str,
    pub input: String,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn injected(provider: &'static str) -> Error {
    Error::Upstream {
        provider,
        status: 503,
    }
}

/// Mock primary provider serving works from an in-memory catalogue.
#[derive(Clone, Default)]
pub struct MockPrimaryProvider {
    works: Arc<Mutex<HashMap<String, RawWork>>>,
    search_results: Arc<Mutex<Option<(Vec<RawWork>, i64)>>>,
    failing_ids: Arc<Mutex<HashSet<String>>>,
    failing_ops: Arc<Mutex<HashSet<&'static str>>>,
    call_log: Arc<Mutex<Vec<ProviderCall>>>,
}

impl MockPrimaryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a work to the catalogue, keyed by its normalized id.
    pub fn with_work(self, work: RawWork) -> Self {
        self.add_work(work);
        self
    }

    pub fn add_work(&self, work: RawWork) {
        lock(&self.works).insert(normalize_id(&work.id), work);
    }

    /// Results returned by every search, with the reported total count.
    pub fn with_search_results(self, results: Vec<RawWork>, total_count: i64) -> Self {
        self.set_search_results(results, total_count);
        self
    }

    pub fn set_search_results(&self, results: Vec<RawWork>, total_count: i64) {
        *lock(&self.search_results) = Some((results, total_count));
    }

    /// Fail any batch request that includes this id.
    pub fn fail_batches_containing(self, id: &str) -> Self {
        lock(&self.failing_ids).insert(normalize_id(id));
        self
    }

    /// Fail every call of one operation (`get_work`, `search_works`, `batch_get_works`).
    pub fn fail_operation(&self, operation: &'static str) {
        lock(&self.failing_ops).insert(operation);
    }

    pub fn clear_failures(&self) {
        lock(&self.failing_ops).clear();
        lock(&self.failing_ids).clear();
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        lock(&self.call_log).clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        lock(&self.call_log)
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        lock(&self.call_log).len()
    }

    fn record(&self, operation: &'static str, input: String) -> Result<()> {
        lock(&self.call_log).push(ProviderCall { operation, input });
        if lock(&self.failing_ops).contains(operation) {
            return Err(injected("mock_openalex"));
        }
        Ok(())
    }
}

#[async_trait]
impl PrimaryProvider for MockPrimaryProvider {
    fn name(&self) -> &'static str {
        "mock_openalex"
    }

    fn max_batch_size(&self) -> usize {
        OPENALEX_BATCH_SIZE
    }

    async fn get_work(&self, id: &str) -> Result<Option<RawWork>> {
        self.record("get_work", id.to_string())?;
        Ok(lock(&self.works).get(&normalize_id(id)).cloned())
    }

    async fn search_works(&self, req: &SearchRequest) -> Result<SearchPage> {
        self.record("search_works", req.query.clone())?;
        let (results, total_count) = lock(&self.search_results).clone().unwrap_or_default();
        Ok(SearchPage {
            results,
            total_count,
        })
    }

    async fn batch_get_works(&self, ids: &[String]) -> Result<Vec<RawWork>> {
        self.record("batch_get_works", ids.join("|"))?;
        if ids.len() > OPENALEX_BATCH_SIZE {
            return Err(Error::InvalidInput(format!(
                "batch of {} exceeds provider limit",
                ids.len()
            )));
        }
        {
            let failing = lock(&self.failing_ids);
            if ids.iter().any(|id| failing.contains(&normalize_id(id))) {
                return Err(injected("mock_openalex"));
            }
        }
        let works = lock(&self.works);
        Ok(ids
            .iter()
            .filter_map(|id| works.get(&normalize_id(id)).cloned())
            .collect())
    }
}

/// Mock citation provider with fixed reference and citing lists.
#[derive(Clone, Default)]
pub struct MockCitationProvider {
    references: Arc<Mutex<HashMap<String, Vec<String>>>>,
    cited_by: Arc<Mutex<HashMap<String, Vec<String>>>>,
    failing_ops: Arc<Mutex<HashSet<&'static str>>>,
    latency: Option<Duration>,
    call_log: Arc<Mutex<Vec<ProviderCall>>>,
}

impl MockCitationProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_references(self, work_id: &str, ids: &[&str]) -> Self {
        lock(&self.references).insert(
            normalize_id(work_id),
            ids.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn with_cited_by(self, work_id: &str, ids: &[&str]) -> Self {
        lock(&self.cited_by).insert(
            normalize_id(work_id),
            ids.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    /// Delay every call, to widen race windows in concurrency tests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fail every call of one operation (`fetch_references`, `fetch_cited_by`).
    pub fn fail_operation(&self, operation: &'static str) {
        lock(&self.failing_ops).insert(operation);
    }

    pub fn clear_failures(&self) {
        lock(&self.failing_ops).clear();
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        lock(&self.call_log).clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        lock(&self.call_log)
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    async fn record(&self, operation: &'static str, input: &str) -> Result<()> {
        lock(&self.call_log).push(ProviderCall {
            operation,
            input: input.to_string(),
        });
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if lock(&self.failing_ops).contains(operation) {
            return Err(injected("mock_semantic_scholar"));
        }
        Ok(())
    }
}

#[async_trait]
impl CitationProvider for MockCitationProvider {
    fn name(&self) -> &'static str {
        "mock_semantic_scholar"
    }

    async fn fetch_references(&self, work_id: &str) -> Result<Vec<String>> {
        self.record("fetch_references", work_id).await?;
        Ok(lock(&self.references)
            .get(&normalize_id(work_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_cited_by(&self, work_id: &str) -> Result<Vec<String>> {
        self.record("fetch_cited_by", work_id).await?;
        Ok(lock(&self.cited_by)
            .get(&normalize_id(work_id))
            .cloned()
            .unwrap_or_default())
    }
}
