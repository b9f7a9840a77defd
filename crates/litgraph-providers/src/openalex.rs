//! OpenAlex primary provider client.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};

use litgraph_core::defaults::OPENALEX_BATCH_SIZE;
use litgraph_core::{
    normalize_id, Error, PrimaryProvider, RawWork, RawWorksResponse, Result, SearchPage,
    SearchRequest, SearchSort,
};

use crate::config::OpenAlexConfig;

const PROVIDER: &str = "openalex";

/// `sort` parameter for a search sort. Relevance is the provider default.
pub fn sort_param(sort: SearchSort) -> Option<&'static str> {
    match sort {
        SearchSort::Relevance => None,
        SearchSort::CitedByCount => Some("cited_by_count:desc"),
        SearchSort::Newest => Some("publication_date:desc"),
        SearchSort::Oldest => Some("publication_date:asc"),
    }
}

/// Inclusive year bounds as a provider `filter` value. A bound at the edge of
/// the `i32` range excludes nothing and is left out.
pub fn year_filter(from_year: Option<i32>, to_year: Option<i32>) -> Option<String> {
    let mut filters = Vec::new();
    if let Some(after) = from_year.and_then(|from| from.checked_sub(1)) {
        filters.push(format!("publication_year:>{after}"));
    }
    if let Some(before) = to_year.and_then(|to| to.checked_add(1)) {
        filters.push(format!("publication_year:<{before}"));
    }
    (!filters.is_empty()).then(|| filters.join(","))
}

/// HTTP client for the OpenAlex works API.
pub struct OpenAlexClient {
    client: Client,
    config: OpenAlexConfig,
}

impl OpenAlexClient {
    pub fn new(config: OpenAlexConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        debug!(
            subsystem = "provider",
            component = PROVIDER,
            base_url = %config.base_url,
            authenticated = config.api_key.is_some(),
            "Initializing OpenAlex client"
        );

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(OpenAlexConfig::from_env())
    }

    pub fn config(&self) -> &OpenAlexConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// GET with auth applied. Returns the raw response for status handling.
    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<reqwest::Response> {
        let mut req = self.client.get(self.url(path)).query(params);
        if let Some((key, value)) = self.config.auth_param() {
            req = req.query(&[(key, value)]);
        }
        Ok(req.send().await?)
    }

    async fn fetch_list(&self, params: &[(&str, String)], op: &str) -> Result<RawWorksResponse> {
        let start = Instant::now();
        let response = self.get("/works", params).await?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                subsystem = "provider",
                component = PROVIDER,
                op,
                status = status.as_u16(),
                "OpenAlex request failed"
            );
            return Err(Error::Upstream {
                provider: PROVIDER,
                status: status.as_u16(),
            });
        }

        let body: RawWorksResponse = response.json().await?;
        debug!(
            subsystem = "provider",
            component = PROVIDER,
            op,
            result_count = body.results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "OpenAlex list complete"
        );
        Ok(body)
    }
}

#[async_trait]
impl PrimaryProvider for OpenAlexClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn max_batch_size(&self) -> usize {
        OPENALEX_BATCH_SIZE
    }

    #[instrument(skip(self), fields(subsystem = "provider", component = PROVIDER))]
    async fn get_work(&self, id: &str) -> Result<Option<RawWork>> {
        let id = normalize_id(id);
        let response = self.get(&format!("/works/{id}"), &[]).await?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                debug!(work_id = %id, "Work not found at provider");
                Ok(None)
            }
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => {
                warn!(work_id = %id, status = status.as_u16(), "OpenAlex get_work failed");
                Err(Error::Upstream {
                    provider: PROVIDER,
                    status: status.as_u16(),
                })
            }
        }
    }

    async fn search_works(&self, req: &SearchRequest) -> Result<SearchPage> {
        let mut params = vec![
            ("search", req.query.clone()),
            ("page", req.page.max(1).to_string()),
            ("per_page", req.per_page.to_string()),
        ];
        if let Some(filter) = year_filter(req.from_year, req.to_year) {
            params.push(("filter", filter));
        }
        if let Some(sort) = req.sort.and_then(sort_param) {
            params.push(("sort", sort.to_string()));
        }

        let body = self.fetch_list(&params, "search_works").await?;
        let total_count = body.meta.count.unwrap_or(body.results.len() as i64);
        Ok(SearchPage {
            results: body.results,
            total_count,
        })
    }

    async fn batch_get_works(&self, ids: &[String]) -> Result<Vec<RawWork>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        if ids.len() > OPENALEX_BATCH_SIZE {
            return Err(Error::InvalidInput(format!(
                "batch of {} exceeds provider limit {}",
                ids.len(),
                OPENALEX_BATCH_SIZE
            )));
        }

        let joined = ids
            .iter()
            .map(|id| normalize_id(id))
            .collect::<Vec<_>>()
            .join("|");
        let params = [
            ("filter", format!("openalex:{joined}")),
            ("per_page", ids.len().min(OPENALEX_BATCH_SIZE).to_string()),
        ];

        Ok(self.fetch_list(&params, "batch_get_works").await?.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_param_mapping() {
        assert_eq!(sort_param(SearchSort::Relevance), None);
        assert_eq!(
            sort_param(SearchSort::CitedByCount),
            Some("cited_by_count:desc")
        );
        assert_eq!(sort_param(SearchSort::Newest), Some("publication_date:desc"));
        assert_eq!(sort_param(SearchSort::Oldest), Some("publication_date:asc"));
    }

    #[test]
    fn test_year_filter_is_inclusive() {
        assert_eq!(
            year_filter(Some(2020), Some(2024)).as_deref(),
            Some("publication_year:>2019,publication_year:<2025")
        );
        assert_eq!(
            year_filter(None, Some(2010)).as_deref(),
            Some("publication_year:<2011")
        );
        assert_eq!(year_filter(None, None), None);
    }

    #[test]
    fn test_year_filter_at_i32_extremes() {
        assert_eq!(year_filter(Some(i32::MIN), None), None);
        assert_eq!(year_filter(None, Some(i32::MAX)), None);
        assert_eq!(
            year_filter(Some(i32::MIN), Some(2000)).as_deref(),
            Some("publication_year:<2001")
        );
    }
}
