//! Semantic Scholar citation provider client.
//!
//! Papers are addressed by their OpenAlex id (`openalex:W…`) and citation
//! neighbours are mapped back through `externalIds.OpenAlex`. Neighbours
//! without an OpenAlex id are dropped.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use litgraph_core::{normalize_id, CitationProvider, Error, Result};

use crate::config::SemanticScholarConfig;

const PROVIDER: &str = "semantic_scholar";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExternalIds {
    #[serde(rename = "OpenAlex")]
    open_alex: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PaperRef {
    #[serde(rename = "externalIds")]
    external_ids: Option<ExternalIds>,
}

impl PaperRef {
    fn openalex_id(&self) -> Option<String> {
        self.external_ids
            .as_ref()
            .and_then(|ids| ids.open_alex.as_deref())
            .map(normalize_id)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ReferencesResponse {
    references: Option<Vec<Option<PaperRef>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CitationEntry {
    #[serde(rename = "citingPaper")]
    citing_paper: Option<PaperRef>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CitationsPage {
    data: Option<Vec<CitationEntry>>,
    next: Option<u64>,
}

/// HTTP client for the Semantic Scholar Graph API.
pub struct SemanticScholarClient {
    client: Client,
    config: SemanticScholarConfig,
}

impl SemanticScholarClient {
    pub fn new(config: SemanticScholarConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        debug!(
            subsystem = "provider",
            component = PROVIDER,
            base_url = %config.base_url,
            authenticated = config.api_key.is_some(),
            "Initializing Semantic Scholar client"
        );

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(SemanticScholarConfig::from_env())
    }

    pub fn config(&self) -> &SemanticScholarConfig {
        &self.config
    }

    fn paper_url(&self, work_id: &str, suffix: &str) -> String {
        format!(
            "{}/graph/v1/paper/openalex:{}{}",
            self.config.base_url.trim_end_matches('/'),
            normalize_id(work_id),
            suffix
        )
    }

    /// GET a paper resource. `None` when the paper is unknown.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        params: &[(&str, String)],
        op: &str,
    ) -> Result<Option<T>> {
        let mut req = self.client.get(url).query(params);
        if let Some(key) = &self.config.api_key {
            req = req.header("x-api-key", key);
        }
        let response = req.send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => {
                warn!(
                    subsystem = "provider",
                    component = PROVIDER,
                    op,
                    status = status.as_u16(),
                    "Semantic Scholar request failed"
                );
                Err(Error::Upstream {
                    provider: PROVIDER,
                    status: status.as_u16(),
                })
            }
        }
    }
}

#[async_trait]
impl CitationProvider for SemanticScholarClient {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn fetch_references(&self, work_id: &str) -> Result<Vec<String>> {
        let start = Instant::now();
        let body: Option<ReferencesResponse> = self
            .get_json(
                self.paper_url(work_id, ""),
                &[("fields", "references.externalIds".to_string())],
                "fetch_references",
            )
            .await?;

        let ids: Vec<String> = body
            .and_then(|b| b.references)
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .filter_map(|r| r.openalex_id())
            .collect();

        debug!(
            subsystem = "provider",
            component = PROVIDER,
            op = "fetch_references",
            work_id,
            result_count = ids.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "References fetched"
        );
        Ok(ids)
    }

    async fn fetch_cited_by(&self, work_id: &str) -> Result<Vec<String>> {
        let start = Instant::now();
        let limit = self.config.cited_by_page_size.max(1);
        let mut offset = 0usize;
        let mut ids = Vec::new();

        while offset < self.config.cited_by_max {
            let params = [
                ("fields", "externalIds".to_string()),
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
            ];
            let Some(page) = self
                .get_json::<CitationsPage>(
                    self.paper_url(work_id, "/citations"),
                    &params,
                    "fetch_cited_by",
                )
                .await?
            else {
                break;
            };

            let entries = page.data.unwrap_or_default();
            let returned = entries.len();
            ids.extend(
                entries
                    .into_iter()
                    .filter_map(|e| e.citing_paper.and_then(|p| p.openalex_id())),
            );

            if returned < limit || page.next.is_none() {
                break;
            }
            offset += returned;
        }

        ids.truncate(self.config.cited_by_max);
        debug!(
            subsystem = "provider",
            component = PROVIDER,
            op = "fetch_cited_by",
            work_id,
            result_count = ids.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Citing works fetched"
        );
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paper_ref_without_openalex_id_is_dropped() {
        let r: PaperRef = serde_json::from_value(serde_json::json!({
            "externalIds": { "DOI": "10.1/x" }
        }))
        .unwrap();
        assert_eq!(r.openalex_id(), None);

        let r: PaperRef = serde_json::from_value(serde_json::json!({ "externalIds": null })).unwrap();
        assert_eq!(r.openalex_id(), None);
    }

    #[test]
    fn test_paper_ref_id_is_normalized() {
        let r: PaperRef = serde_json::from_value(serde_json::json!({
            "externalIds": { "OpenAlex": "https://openalex.org/W77" }
        }))
        .unwrap();
        assert_eq!(r.openalex_id().as_deref(), Some("W77"));
    }

    #[test]
    fn test_paper_url_uses_openalex_namespace() {
        let client = SemanticScholarClient::new(
            SemanticScholarConfig::default().with_base_url("http://s2.test/"),
        )
        .unwrap();
        assert_eq!(
            client.paper_url("https://openalex.org/W1", "/citations"),
            "http://s2.test/graph/v1/paper/openalex:W1/citations"
        );
    }
}
