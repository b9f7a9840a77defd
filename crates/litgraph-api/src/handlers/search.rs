//! Cached search and saved-search replay.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use litgraph_core::{defaults, SearchRequest, SearchResults, SearchSort};

use crate::{ApiError, AppState};

/// Query parameters for `GET /api/search`.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub from_year: Option<i32>,
    pub to_year: Option<i32>,
    pub sort: Option<String>,
}

impl SearchQuery {
    fn into_request(self) -> Result<SearchRequest, ApiError> {
        let sort = match self.sort.as_deref() {
            Some(s) => Some(s.parse::<SearchSort>()?),
            None => None,
        };
        Ok(SearchRequest {
            query: self.q,
            page: self.page.unwrap_or(1),
            per_page: self.per_page.unwrap_or(defaults::SEARCH_PER_PAGE),
            from_year: self.from_year,
            to_year: self.to_year,
            sort,
        })
    }
}

/// Search works. Page 1 is served from the query cache while fresh.
///
/// # Returns
/// - 200 OK with results, total count and `from_cache`
/// - 400 Bad Request on a blank query, unknown sort or inverted year range
/// - 502 Bad Gateway if the provider fails
pub async fn search_works(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResults>, ApiError> {
    let req = query.into_request()?;
    let results = state.pipeline.search.search(&req).await?;
    Ok(Json(results))
}

/// Replay a cached search by its entry id.
pub async fn replay_search(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SearchResults>, ApiError> {
    let results = state.pipeline.search.replay(id).await?;
    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_request() {
        let req = SearchQuery {
            q: "graph theory".into(),
            ..Default::default()
        }
        .into_request()
        .unwrap();
        assert_eq!(req, SearchRequest::new("graph theory"));
    }

    #[test]
    fn test_unknown_sort_is_bad_request() {
        let err = SearchQuery {
            q: "x".into(),
            sort: Some("random".into()),
            ..Default::default()
        }
        .into_request()
        .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_sort_is_parsed() {
        let req = SearchQuery {
            q: "x".into(),
            sort: Some("newest".into()),
            page: Some(3),
            ..Default::default()
        }
        .into_request()
        .unwrap();
        assert_eq!(req.sort, Some(SearchSort::Newest));
        assert_eq!(req.page, 3);
    }
}
