//! Search API handlers.
//!
//! A search is driven by the pager for its term: `POST /search` starts it,
//! `POST /search/next` loads one more page, `POST /search/refresh` fetches the
//! first page again. Every call answers with the pager's full state.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use pokeprice_core::PagingState;
use serde::Deserialize;
use tracing::info;

use super::handlers::{api_error, paging_error, ApiError};
use crate::state::AppState;

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub term: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub term: String,
}

fn require_term(term: &str) -> Result<&str, ApiError> {
    let term = term.trim();
    if term.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "search term cannot be empty",
        ));
    }
    Ok(term)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/search
///
/// Start (or restart) the search for a term and return its first page.
pub async fn start_search(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<PagingState>, ApiError> {
    let term = require_term(&body.term)?;
    info!(term, "Search requested");

    state
        .pager(term)
        .start()
        .await
        .map(Json)
        .map_err(|e| paging_error(&e))
}

/// GET /api/v1/search?term=
///
/// Current state of a started search.
pub async fn get_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<PagingState>, ApiError> {
    let term = require_term(&params.term)?;

    match state.existing_pager(term) {
        Some(pager) => Ok(Json(pager.snapshot())),
        None => Err(api_error(
            StatusCode::NOT_FOUND,
            format!("No active search for: {}", term),
        )),
    }
}

/// POST /api/v1/search/next
pub async fn load_next(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<PagingState>, ApiError> {
    let term = require_term(&body.term)?;

    state
        .pager(term)
        .load_next()
        .await
        .map(Json)
        .map_err(|e| paging_error(&e))
}

/// POST /api/v1/search/refresh
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<PagingState>, ApiError> {
    let term = require_term(&body.term)?;
    info!(term, "Refresh requested");

    state
        .pager(term)
        .refresh()
        .await
        .map(Json)
        .map_err(|e| paging_error(&e))
}
