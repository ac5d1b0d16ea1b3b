use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use pokeprice_core::{CacheError, FetchError, PagingError, SanitizedConfig};
use serde::Serialize;
use std::sync::Arc;

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

/// Error half of every handler result.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

/// Map a marketplace failure onto a response status.
pub fn fetch_error(error: &FetchError) -> ApiError {
    let status = match error {
        FetchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        FetchError::Http { status: 404, .. } => StatusCode::NOT_FOUND,
        FetchError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    };
    api_error(status, error.to_string())
}

pub fn cache_error(error: &CacheError) -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
}

pub fn paging_error(error: &PagingError) -> ApiError {
    match error {
        PagingError::Fetch(e) => fetch_error(e),
        PagingError::Cache(e) => cache_error(e),
    }
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// GET /api/v1/metrics
///
/// Prometheus text exposition.
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
