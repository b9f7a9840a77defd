//! Scheduled maintenance triggers, guarded by `CRON_SECRET`.

use axum::{
    extract::State,
    http::{header, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{ApiError, AppState};

/// Optional body for `POST /api/maintenance/hydrate`.
#[derive(Debug, Default, Deserialize)]
pub struct HydrateRequest {
    /// Explicit ids to hydrate. Empty means "pending stubs".
    #[serde(default)]
    pub ids: Vec<String>,
    /// Cap on pending stubs picked up when `ids` is empty.
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HydrateResponse {
    pub hydrated: usize,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::trim)
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let secret = state
        .cron_secret
        .as_deref()
        .ok_or_else(|| ApiError::ServiceUnavailable("Maintenance is not configured".into()))?;
    match bearer_token(headers) {
        Some(token) if token == secret => Ok(()),
        _ => Err(ApiError::Unauthorized),
    }
}

/// Hydrate stub works inline.
///
/// # Returns
/// - 200 OK with the number of stubs upgraded
/// - 401 Unauthorized on a missing or wrong bearer token
/// - 503 Service Unavailable when `CRON_SECRET` is unset
pub async fn hydrate_stubs(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<HydrateRequest>>,
) -> Result<Json<HydrateResponse>, ApiError> {
    authorize(&state, &headers)?;
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let hydrator = &state.pipeline.hydrator;
    let hydrated = if req.ids.is_empty() {
        hydrator.hydrate_pending(req.limit).await?
    } else {
        hydrator.hydrate_stubs(&req.ids).await?
    };
    info!(
        subsystem = "api",
        op = "hydrate_stubs",
        requested = req.ids.len(),
        hydrated,
        "Maintenance hydration finished"
    );
    Ok(Json(HydrateResponse { hydrated }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer s3cret"));
        assert_eq!(bearer_token(&headers), Some("s3cret"));
    }
}
