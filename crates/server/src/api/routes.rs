use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::{details, handlers, history, middleware::metrics_middleware, search, settings};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Paginated search
        .route("/search", post(search::start_search))
        .route("/search", get(search::get_search))
        .route("/search/next", post(search::load_next))
        .route("/search/refresh", post(search::refresh))
        // Product details
        .route("/details", get(details::get_details))
        // History
        .route("/history", get(history::list_history))
        .route("/history/{term}", delete(history::clear_history))
        // Settings
        .route(
            "/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
