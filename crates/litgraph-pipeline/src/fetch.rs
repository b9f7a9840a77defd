//! Cache-first single work lookup.

use std::sync::Arc;

use tracing::{debug, instrument};

use litgraph_core::{normalize_id, Error, PrimaryProvider, Result, WorkStore, WorkWithRelations};

use crate::ingest::Ingestor;

/// Serves full works from the store, fetching and ingesting on a miss.
#[derive(Clone)]
pub struct WorkFetcher {
    store: Arc<dyn WorkStore>,
    provider: Arc<dyn PrimaryProvider>,
    ingestor: Ingestor,
}

impl WorkFetcher {
    pub fn new(store: Arc<dyn WorkStore>, provider: Arc<dyn PrimaryProvider>) -> Self {
        Self {
            ingestor: Ingestor::new(store.clone()),
            store,
            provider,
        }
    }

    /// Return the full work, with authors by position and topics by score.
    ///
    /// Stubs and unknown ids go to the primary provider. `None` means the
    /// provider has no such record either.
    #[instrument(
        skip(self),
        fields(subsystem = "pipeline", component = "fetcher", op = "get_or_fetch_work")
    )]
    pub async fn get_or_fetch_work(&self, id: &str) -> Result<Option<WorkWithRelations>> {
        let id = normalize_id(id);
        if id.is_empty() {
            return Err(Error::InvalidInput("empty work id".to_string()));
        }

        if let Some(found) = self.store.get_work_with_relations(&id).await? {
            if !found.work.is_stub {
                debug!(work_id = %id, "Served from store");
                return Ok(Some(found));
            }
        }

        let Some(raw) = self.provider.get_work(&id).await? else {
            debug!(work_id = %id, provider = self.provider.name(), "Provider has no such work");
            return Ok(None);
        };
        let ingested = self.ingestor.ingest_work(&raw).await?;
        debug!(work_id = %ingested.id, "Fetched and ingested");

        self.store.get_work_with_relations(&ingested.id).await
    }
}
