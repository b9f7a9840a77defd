//! One-time citation enrichment from the secondary provider.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use litgraph_core::{
    normalize_id, CitationEdge, CitationProvider, ClaimOutcome, EnrichOutcome, EnrichStatus,
    Error, Result, WorkStore,
};

use crate::config::PipelineConfig;
use crate::ingest::dedup_by_key;

fn clean_ids(ids: Vec<String>) -> Vec<String> {
    dedup_by_key(
        ids.iter()
            .map(|id| normalize_id(id))
            .filter(|id| !id.is_empty())
            .collect(),
        |id| id.clone(),
    )
}

/// Materializes a work's forward and backward citation edges.
///
/// Each work is enriched at most once: callers race on an atomic claim in
/// the store, and only the winner calls the provider.
#[derive(Clone)]
pub struct CitationEnricher {
    store: Arc<dyn WorkStore>,
    provider: Arc<dyn CitationProvider>,
    config: PipelineConfig,
}

impl CitationEnricher {
    pub fn new(
        store: Arc<dyn WorkStore>,
        provider: Arc<dyn CitationProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            provider,
            config,
        }
    }

    #[instrument(
        skip(self),
        fields(subsystem = "pipeline", component = "enricher", op = "enrich_citations")
    )]
    pub async fn enrich_citations(&self, id: &str) -> Result<EnrichOutcome> {
        let id = normalize_id(id);
        if id.is_empty() {
            return Err(Error::InvalidInput("empty work id".to_string()));
        }

        let claimed_at = Utc::now();
        let claim = self
            .store
            .claim_citation_fetch(&id, self.config.enrich_claim_lease(), claimed_at)
            .await?;
        let skipped = match claim {
            ClaimOutcome::Claimed => None,
            ClaimOutcome::AlreadyFetched => Some(EnrichStatus::AlreadyFetched),
            ClaimOutcome::InProgress => Some(EnrichStatus::InProgress),
            ClaimOutcome::NotFound => Some(EnrichStatus::NotFound),
        };
        if let Some(status) = skipped {
            debug!(work_id = %id, ?status, "Enrichment skipped");
            return Ok(EnrichOutcome::skipped(status));
        }

        match self.fetch_and_write(&id).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                warn!(work_id = %id, error = %e, "Enrichment failed, releasing claim");
                if let Err(release_err) = self.store.release_citation_claim(&id, claimed_at).await {
                    warn!(work_id = %id, error = %release_err, "Failed to release enrichment claim");
                }
                Err(e)
            }
        }
    }

    async fn fetch_and_write(&self, id: &str) -> Result<EnrichOutcome> {
        let start = Instant::now();
        let (references, cited_by) = tokio::try_join!(
            self.provider.fetch_references(id),
            self.provider.fetch_cited_by(id),
        )?;
        let references = clean_ids(references);
        let cited_by = clean_ids(cited_by);

        let endpoints = dedup_by_key(
            references.iter().chain(cited_by.iter()).cloned().collect(),
            |id| id.clone(),
        );
        let edges: Vec<CitationEdge> = references
            .iter()
            .map(|cited| CitationEdge::new(id, cited.as_str()))
            .chain(
                cited_by
                    .iter()
                    .map(|citing| CitationEdge::new(citing.as_str(), id)),
            )
            .collect();

        let mut session = self.store.begin().await?;
        let stubs = session.insert_stub_works(&endpoints).await?;
        let created = session.insert_citation_edges(&edges).await?;
        session.mark_citations_fetched(id).await?;
        session.commit().await?;

        info!(
            work_id = %id,
            provider = self.provider.name(),
            references = references.len(),
            cited_by = cited_by.len(),
            stubs,
            edges = created,
            duration_ms = start.elapsed().as_millis() as u64,
            "Citations enriched"
        );
        Ok(EnrichOutcome {
            status: EnrichStatus::Enriched,
            references: references.len(),
            cited_by: cited_by.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_ids_normalizes_and_dedups() {
        let ids = vec![
            "https://openalex.org/W1".to_string(),
            "W1".to_string(),
            " ".to_string(),
            "W2".to_string(),
        ];
        assert_eq!(clean_ids(ids), vec!["W1", "W2"]);
    }
}
