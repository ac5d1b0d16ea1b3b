//! Settings API handlers.
//!
//! Changing the language or engine is checked against the configured engines
//! in the same transaction that stores it. The marketplace client is then
//! rebuilt from the stored settings whenever they differ from the ones the
//! running client was built from.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use pokeprice_core::{
    create_marketplace_client, engine_config, ConfigError, Engine, Language, Settings,
    SettingsError,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::handlers::{api_error, ApiError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub language: Option<String>,
    pub engine: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SettingsResponse {
    #[serde(flatten)]
    pub settings: Settings,
    /// Name of the marketplace client in use.
    pub marketplace: String,
}

/// GET /api/v1/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let store = Arc::clone(state.settings());
    let settings = tokio::task::spawn_blocking(move || store.load())
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(SettingsResponse {
        settings,
        marketplace: state.marketplace().name().to_string(),
    }))
}

/// PUT /api/v1/settings
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(body): Json<UpdateSettingsRequest>,
) -> Result<Json<SettingsResponse>, ApiError> {
    let language = body
        .language
        .as_deref()
        .map(str::parse::<Language>)
        .transpose()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;
    let engine = body
        .engine
        .as_deref()
        .map(str::parse::<Engine>)
        .transpose()
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e.to_string()))?;

    // The engine is checked against the stored row inside the update, so a
    // rejected change leaves it untouched.
    let store = Arc::clone(state.settings());
    let tx_state = Arc::clone(&state);
    let (settings, rejected) = tokio::task::spawn_blocking(move || {
        let mut rejected = None;
        let settings = store.update(&mut |settings| {
            let mut candidate = *settings;
            apply_update(&mut candidate, language, engine);
            match engine_config(&candidate, tx_state.config()) {
                Ok(_) => *settings = candidate,
                Err(e) => rejected = Some(e),
            }
        })?;
        Ok::<_, SettingsError>((settings, rejected))
    })
    .await
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
    .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    if let Some(e) = rejected {
        return Err(config_error(e));
    }

    if settings != state.marketplace_settings() {
        let engine_config = engine_config(&settings, state.config()).map_err(config_error)?;
        let client = create_marketplace_client(&engine_config)
            .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
        if state.set_marketplace(settings, client) {
            info!(
                language = %settings.language,
                engine = %settings.engine,
                "Settings changed, marketplace client replaced"
            );
        }
    }

    Ok(Json(SettingsResponse {
        settings,
        marketplace: state.marketplace().name().to_string(),
    }))
}

fn config_error(e: ConfigError) -> ApiError {
    match e {
        ConfigError::EngineNotConfigured(_) => api_error(StatusCode::BAD_REQUEST, e.to_string()),
        _ => api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn apply_update(settings: &mut Settings, language: Option<Language>, engine: Option<Engine>) {
    if let Some(language) = language {
        settings.language = language;
    }
    if let Some(engine) = engine {
        settings.engine = engine;
    }
}
