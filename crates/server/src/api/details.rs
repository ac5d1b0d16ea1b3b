//! Product details API handler.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use pokeprice_core::{with_store, DetailsResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::handlers::{api_error, cache_error, fetch_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DetailsParams {
    pub link: String,
}

#[derive(Debug, Serialize)]
pub struct DetailsResponse {
    #[serde(flatten)]
    pub details: DetailsResult,
    /// Cached result rows whose price was updated.
    pub updated_rows: u32,
}

/// GET /api/v1/details?link=
///
/// Fetch a product's details and write its current price back to every
/// cached row for the same link.
pub async fn get_details(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DetailsParams>,
) -> Result<Json<DetailsResponse>, ApiError> {
    let link = params.link.trim().to_string();
    if link.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "link cannot be empty"));
    }

    let details = state
        .marketplace()
        .details(&link)
        .await
        .map_err(|e| fetch_error(&e))?;

    let price = details.price.clone();
    let price_trend = details.price_trend.clone();
    let updated_rows = with_store(state.cache(), move |store| {
        store.update_prices(&link, &price, price_trend.as_deref())
    })
    .await
    .map_err(|e| cache_error(&e))?;
    debug!(link = %details.link, updated_rows, "Updated cached prices");

    Ok(Json(DetailsResponse {
        details,
        updated_rows,
    }))
}
