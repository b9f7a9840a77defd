//! Work lookup, citation neighbors and on-demand enrichment.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::{debug, warn};

use litgraph_core::{normalize_id, EnrichOutcome, EnrichStatus, WorkWithRelations};
use litgraph_jobs::JobKind;

use crate::{ApiError, AppState};

/// Citation neighbors of one work.
#[derive(Debug, Serialize)]
pub struct CitationsResponse {
    pub work_id: String,
    /// Whether the citation provider has been consulted for this work.
    pub citations_fetched: bool,
    pub references: Vec<String>,
    pub cited_by: Vec<String>,
}

/// Queue citation enrichment unless it already ran. Queue errors are logged only.
fn queue_enrichment(state: &AppState, work_id: &str, citations_fetched: bool) {
    if citations_fetched {
        return;
    }
    let Some(jobs) = state.jobs.as_ref() else {
        return;
    };
    match jobs.submit(JobKind::EnrichCitations {
        work_id: work_id.to_string(),
    }) {
        Ok(job_id) => debug!(
            subsystem = "api",
            op = "queue_enrichment",
            work_id,
            %job_id,
            "Queued citation enrichment"
        ),
        Err(e) => warn!(
            subsystem = "api",
            op = "queue_enrichment",
            work_id,
            error = %e,
            "Failed to queue citation enrichment"
        ),
    }
}

/// Return one work, fetching it from the primary provider when only a stub
/// (or nothing) is stored.
///
/// # Returns
/// - 200 OK with the work, its authors and topics
/// - 404 Not Found if the provider has no such work
/// - 502 Bad Gateway if the provider fails
pub async fn get_work(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkWithRelations>, ApiError> {
    let work = state
        .pipeline
        .fetcher
        .get_or_fetch_work(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Work {} not found", normalize_id(&id))))?;

    queue_enrichment(&state, &work.work.id, work.work.citations_fetched);
    Ok(Json(work))
}

/// Return stored citation edges around a work.
pub async fn get_citations(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CitationsResponse>, ApiError> {
    let id = normalize_id(&id);
    if id.is_empty() {
        return Err(ApiError::BadRequest("empty work id".into()));
    }
    let store = &state.pipeline.store;
    let work = store
        .get_work(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Work {id} not found")))?;
    let neighbors = store.citation_neighbors(&id).await?;

    queue_enrichment(&state, &id, work.citations_fetched);
    Ok(Json(CitationsResponse {
        work_id: id,
        citations_fetched: work.citations_fetched,
        references: neighbors.references,
        cited_by: neighbors.cited_by,
    }))
}

/// Run citation enrichment inline.
///
/// Already-enriched and in-progress works answer 200 with the matching status
/// and zero counts.
pub async fn enrich_work(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<EnrichOutcome>, ApiError> {
    let outcome = state.pipeline.enricher.enrich_citations(&id).await?;
    if outcome.status == EnrichStatus::NotFound {
        return Err(ApiError::NotFound(format!(
            "Work {} not found",
            normalize_id(&id)
        )));
    }
    Ok(Json(outcome))
}
