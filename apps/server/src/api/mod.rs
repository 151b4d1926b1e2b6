//! API layer - routes, handlers, and middleware

pub mod extractors;
pub mod handlers;
pub mod middleware;

use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let max_body_size = state.config.server.max_request_body_size;
    let cors_origins = state.config.server.cors_origins.clone();

    Router::new()
        .route("/health", get(health_check))
        .route("/v1.0.M1/dataPoints", get(handlers::search_data_points))
        .route("/v1.0.M2/dataPoints", get(handlers::search_data_points_by_filter))
        .route(
            "/v1.0.M2/dataPointsByParticipant",
            get(handlers::find_participants),
        )
        .with_state(state)
        // Applied in reverse order
        .layer(middleware::propagate_request_id())
        .layer(middleware::cors(&cors_origins))
        .layer(middleware::trace())
        .layer(middleware::set_request_id())
        .layer(DefaultBodyLimit::max(max_body_size))
}

async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "dsu-server"
    }))
}
