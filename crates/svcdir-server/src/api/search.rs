use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use svcdir_search::{SearchRequest, SearchResponse, Suggestion};

use crate::middleware::RequestId;

use super::{map_search_error, ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct SuggestParams {
    pub q: Option<String>,
}

/// `POST /api/v1/search`
pub(super) async fn search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Json(request) = body.map_err(|rejection| {
        ApiError::new("validation_error", "request body must be a JSON object with a string `query`")
            .with_details(rejection.body_text())
    })?;

    let outcome = state
        .pipeline
        .search(&request)
        .await
        .map_err(|e| map_search_error(&req_id.0, &e))?;

    tracing::debug!(request_id = %req_id.0, path = %outcome.path, "search served");
    Ok(Json(outcome.response))
}

/// `GET /api/v1/search?q=` autocomplete.
pub(super) async fn suggest(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<SuggestParams>,
) -> Result<Json<Vec<Suggestion>>, ApiError> {
    let term = params.q.unwrap_or_default();
    let suggestions = state
        .pipeline
        .suggest(&term)
        .await
        .map_err(|e| map_search_error(&req_id.0, &e))?;
    Ok(Json(suggestions))
}
