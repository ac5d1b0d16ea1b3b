//! Search history API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use pokeprice_core::{normalize_term, with_store, Search};
use serde::Serialize;
use tracing::info;

use super::handlers::{api_error, cache_error, ApiError, SuccessResponse};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub searches: Vec<Search>,
    pub total: usize,
}

/// GET /api/v1/history
///
/// Past searches, most recent first.
pub async fn list_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let searches = with_store(state.cache(), |store| store.history())
        .await
        .map_err(|e| cache_error(&e))?;
    let total = searches.len();
    Ok(Json(HistoryResponse { searches, total }))
}

/// DELETE /api/v1/history/{term}
///
/// Forget a term: its cached results, its search row and the remote key.
pub async fn clear_history(
    State(state): State<Arc<AppState>>,
    Path(term): Path<String>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let term = normalize_term(&term);
    if term.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "search term cannot be empty",
        ));
    }

    let query = term.clone();
    let removed = with_store(state.cache(), move |store| store.clear_history(&query))
        .await
        .map_err(|e| cache_error(&e))?;
    if !removed {
        return Err(api_error(
            StatusCode::NOT_FOUND,
            format!("Search not found: {}", term),
        ));
    }

    state.remove_pager(&term);
    info!(term = %term, "Cleared search history");
    Ok(Json(SuccessResponse {
        message: format!("Cleared search: {}", term),
    }))
}
