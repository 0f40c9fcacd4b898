use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use tracing::{debug, error};

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    middleware_layer::request_id::request_id,
    routes::rag::search_request::{SearchRequest, SearchResponse},
};

/// `POST /api/rag`: raw similarity search over the knowledge base.
pub async fn search_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> AppResult<Json<SearchResponse>> {
    let Json(p) = payload?;
    let request_id = request_id(&headers);

    debug!(
        request_id = %request_id,
        query = %p.query,
        limit = ?p.limit,
        threshold = ?p.threshold,
        "search_route: start"
    );

    if let Some(t) = p.threshold {
        if !t.is_finite() {
            return Err(AppError::BadRequest("threshold must be a finite number".into()));
        }
    }

    let results = state
        .rag
        .search(&p.query, p.limit, p.threshold)
        .await
        .map_err(|err| {
            error!(request_id = %request_id, error = %err, "search_route: search failed");
            AppError::from_rag("Search failed", err)
        })?;

    debug!(request_id = %request_id, hits = results.len(), "search_route: success");
    Ok(Json(SearchResponse { results }))
}
