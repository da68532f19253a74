//! Route configuration for the API.

use std::sync::Arc;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{
    get_dead_letter, get_errors, get_event, get_events, get_function, get_functions, get_logs,
    health_check,
};
use crate::ingest::{post_event, post_webhook};
use crate::state::ApiState;

/// Create the API router.
pub fn create_router(state: Arc<ApiState>) -> Router {
    let cors = build_cors_layer(state.config());

    Router::new()
        .route("/health", get(health_check))
        // Log queries
        .route("/logs", get(get_logs))
        .route("/logs/events", get(get_events))
        .route("/logs/events/{event_id}", get(get_event))
        .route("/logs/functions", get(get_functions))
        .route("/logs/functions/{func_id}", get(get_function))
        .route("/logs/errors", get(get_errors))
        .route("/logs/dead-letter", get(get_dead_letter))
        // Ingestion
        .route("/events", post(post_event))
        .route("/webhooks", post(post_webhook))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.cors_origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(origins)
    }
}
