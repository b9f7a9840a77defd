//! Stub hydration: upgrade stub works to full records in provider batches.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument, warn};

use litgraph_core::{normalize_id, PrimaryProvider, Result, WorkStore};

use crate::config::PipelineConfig;
use crate::ingest::{dedup_by_key, Ingestor};

/// Batch-fetches stub works from the primary provider and ingests them.
#[derive(Clone)]
pub struct Hydrator {
    store: Arc<dyn WorkStore>,
    provider: Arc<dyn PrimaryProvider>,
    ingestor: Ingestor,
    config: PipelineConfig,
}

impl Hydrator {
    pub fn new(
        store: Arc<dyn WorkStore>,
        provider: Arc<dyn PrimaryProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            ingestor: Ingestor::new(store.clone()),
            store,
            provider,
            config,
        }
    }

    /// Hydrate whichever of `ids` are stubs. Returns the number of records
    /// fetched and ingested.
    ///
    /// Ids that are unknown or already full are ignored; when none are stubs
    /// no provider call is made. A failing batch is logged and skipped.
    #[instrument(
        skip(self, ids),
        fields(subsystem = "pipeline", component = "hydrator", op = "hydrate_stubs", requested = ids.len())
    )]
    pub async fn hydrate_stubs(&self, ids: &[String]) -> Result<usize> {
        let start = Instant::now();
        let ids = dedup_by_key(
            ids.iter()
                .map(|id| normalize_id(id))
                .filter(|id| !id.is_empty())
                .collect(),
            |id| id.clone(),
        );
        if ids.is_empty() {
            return Ok(0);
        }

        let mut stubs = Vec::new();
        for chunk in ids.chunks(self.config.store_in_chunk.max(1)) {
            stubs.extend(self.store.filter_stub_ids(chunk).await?);
        }
        if stubs.is_empty() {
            debug!("No stubs among requested ids");
            return Ok(0);
        }

        let batch_size = self.provider.max_batch_size().max(1);
        let batches: Vec<Vec<String>> = stubs.chunks(batch_size).map(<[String]>::to_vec).collect();
        let batch_count = batches.len();

        let hydrated: usize = stream::iter(batches)
            .map(|batch| async move { self.hydrate_batch(batch).await })
            .buffer_unordered(self.config.hydrate_concurrency.max(1))
            .fold(0usize, |acc, n| async move { acc + n })
            .await;

        info!(
            stubs = stubs.len(),
            batches = batch_count,
            hydrated,
            duration_ms = start.elapsed().as_millis() as u64,
            "Stub hydration complete"
        );
        Ok(hydrated)
    }

    /// Fetch and ingest one provider batch. A failed fetch counts as zero; an
    /// ingestion failure abandons the rest of the batch, keeping the works
    /// already committed. Ids still stubs afterwards get an attempt recorded.
    async fn hydrate_batch(&self, batch: Vec<String>) -> usize {
        let ingested = self.fetch_and_ingest(&batch).await;
        match self.store.record_hydration_attempts(&batch, Utc::now()).await {
            Ok(0) => {}
            Ok(missed) => debug!(requested = batch.len(), missed, "Stubs left unhydrated"),
            Err(e) => warn!(error = %e, "Failed to record hydration attempts"),
        }
        ingested
    }

    async fn fetch_and_ingest(&self, batch: &[String]) -> usize {
        let works = match self.provider.batch_get_works(batch).await {
            Ok(works) => works,
            Err(e) => {
                warn!(
                    provider = self.provider.name(),
                    requested = batch.len(),
                    error = %e,
                    "Hydration batch fetch failed, skipping"
                );
                return 0;
            }
        };
        let mut ingested = 0;
        for raw in &works {
            if let Err(e) = self.ingestor.ingest_work(raw).await {
                warn!(
                    work_id = %raw.id,
                    fetched = works.len(),
                    ingested,
                    error = %e,
                    "Hydration batch ingestion failed, skipping remainder"
                );
                break;
            }
            ingested += 1;
        }
        ingested
    }

    /// Hydrate up to `limit` stubs taken from the store.
    ///
    /// Never-attempted stubs go first, then the least recently attempted.
    /// Stubs that reached `hydrate_max_attempts` are no longer selected.
    #[instrument(
        skip(self),
        fields(subsystem = "pipeline", component = "hydrator", op = "hydrate_pending")
    )]
    pub async fn hydrate_pending(&self, limit: Option<i64>) -> Result<usize> {
        let limit = limit.unwrap_or(self.config.hydrate_batch_limit).max(1);
        let ids = self
            .store
            .list_stub_ids(limit, self.config.hydrate_max_attempts)
            .await?;
        debug!(limit, pending = ids.len(), "Selected stubs for hydration");
        self.hydrate_stubs(&ids).await
    }
}
