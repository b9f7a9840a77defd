//! # litgraph-api
//!
//! HTTP surface over the litgraph pipeline: cache-first work lookup,
//! citation neighbors, cached search, saved-search replay and a
//! secret-guarded maintenance trigger for stub hydration.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use litgraph_jobs::JobSubmitter;
use litgraph_pipeline::Pipeline;

pub mod handlers;

/// Shared state for every handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    /// Background queue for fire-and-forget enrichment. `None` disables queuing.
    pub jobs: Option<JobSubmitter>,
    /// Bearer token guarding maintenance routes. `None` disables them.
    pub cron_secret: Option<String>,
}

impl AppState {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            jobs: None,
            cron_secret: None,
        }
    }

    pub fn with_jobs(mut self, jobs: JobSubmitter) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn with_cron_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        self.cron_secret = (!secret.is_empty()).then_some(secret);
        self
    }
}

/// Build the application router. Middleware is layered on by the binary.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/works/:id", get(handlers::works::get_work))
        .route(
            "/api/works/:id/citations",
            get(handlers::works::get_citations),
        )
        .route(
            "/api/works/:id/enrich",
            post(handlers::works::enrich_work),
        )
        .route("/api/search", get(handlers::search::search_works))
        .route(
            "/api/search/cache/:id",
            get(handlers::search::replay_search),
        )
        .route(
            "/api/maintenance/hydrate",
            post(handlers::maintenance::hydrate_stubs),
        )
        .with_state(state)
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{0}")]
    BadGateway(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl From<litgraph_core::Error> for ApiError {
    fn from(err: litgraph_core::Error) -> Self {
        use litgraph_core::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            e if e.is_upstream() => ApiError::BadGateway(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(msg) => {
                tracing::error!(subsystem = "api", error = %msg, "Internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
