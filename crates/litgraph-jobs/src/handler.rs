//! Job types and handlers.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tracing::debug;
use uuid::Uuid;

use litgraph_core::new_v7;
use litgraph_pipeline::{CitationEnricher, Hydrator};

/// Kind of background job, used as the handler registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    HydrateStubs,
    EnrichCitations,
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobType::HydrateStubs => f.write_str("hydrate_stubs"),
            JobType::EnrichCitations => f.write_str("enrich_citations"),
        }
    }
}

/// What a job should do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobKind {
    /// Hydrate the given ids, or up to `limit` pending stubs when `ids` is empty.
    HydrateStubs {
        #[serde(default)]
        ids: Vec<String>,
        limit: Option<i64>,
    },
    /// Fetch citation edges for one work.
    EnrichCitations { work_id: String },
}

impl JobKind {
    pub fn job_type(&self) -> JobType {
        match self {
            JobKind::HydrateStubs { .. } => JobType::HydrateStubs,
            JobKind::EnrichCitations { .. } => JobType::EnrichCitations,
        }
    }
}

/// A submitted job.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: Uuid,
    pub kind: JobKind,
}

impl Job {
    pub fn new(kind: JobKind) -> Self {
        Self { id: new_v7(), kind }
    }

    pub fn job_type(&self) -> JobType {
        self.kind.job_type()
    }
}

/// Context provided to job handlers.
pub struct JobContext {
    pub job: Job,
}

impl JobContext {
    pub fn new(job: Job) -> Self {
        Self { job }
    }

    pub fn kind(&self) -> &JobKind {
        &self.job.kind
    }
}

/// Result of job execution.
#[derive(Debug)]
pub enum JobResult {
    /// Job completed successfully with optional result data.
    Success(Option<JsonValue>),
    /// Job failed with an error message.
    Failed(String),
}

#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The job type this handler processes.
    fn job_type(&self) -> JobType;

    async fn execute(&self, ctx: JobContext) -> JobResult;
}

fn mismatched(expected: JobType, kind: &JobKind) -> JobResult {
    JobResult::Failed(format!(
        "{expected} handler received {} job",
        kind.job_type()
    ))
}

/// Runs stub hydration, either for explicit ids or for pending stubs.
pub struct HydrateStubsHandler {
    hydrator: Hydrator,
}

impl HydrateStubsHandler {
    pub fn new(hydrator: Hydrator) -> Self {
        Self { hydrator }
    }
}

#[async_trait]
impl JobHandler for HydrateStubsHandler {
    fn job_type(&self) -> JobType {
        JobType::HydrateStubs
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let JobKind::HydrateStubs { ids, limit } = ctx.kind() else {
            return mismatched(self.job_type(), ctx.kind());
        };
        let result = if ids.is_empty() {
            self.hydrator.hydrate_pending(*limit).await
        } else {
            self.hydrator.hydrate_stubs(ids).await
        };
        match result {
            Ok(hydrated) => {
                debug!(job_id = %ctx.job.id, hydrated, "Hydration job finished");
                JobResult::Success(Some(json!({ "hydrated": hydrated })))
            }
            Err(e) => JobResult::Failed(e.to_string()),
        }
    }
}

/// Runs citation enrichment for one work.
pub struct EnrichCitationsHandler {
    enricher: CitationEnricher,
}

impl EnrichCitationsHandler {
    pub fn new(enricher: CitationEnricher) -> Self {
        Self { enricher }
    }
}

#[async_trait]
impl JobHandler for EnrichCitationsHandler {
    fn job_type(&self) -> JobType {
        JobType::EnrichCitations
    }

    async fn execute(&self, ctx: JobContext) -> JobResult {
        let JobKind::EnrichCitations { work_id } = ctx.kind() else {
            return mismatched(self.job_type(), ctx.kind());
        };
        match self.enricher.enrich_citations(work_id).await {
            Ok(outcome) => match serde_json::to_value(outcome) {
                Ok(value) => JobResult::Success(Some(value)),
                Err(e) => JobResult::Failed(e.to_string()),
            },
            Err(e) => JobResult::Failed(e.to_string()),
        }
    }
}
