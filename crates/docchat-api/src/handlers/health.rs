//! Liveness endpoints.

use axum::{extract::State, response::IntoResponse, Json};

use crate::AppState;

/// Service banner.
#[utoipa::path(get, path = "/", tag = "System",
    responses((status = 200, description = "Service banner")))]
pub async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "message": format!("{} API", state.config.assistant_name),
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

#[utoipa::path(get, path = "/health", tag = "System",
    responses((status = 200, description = "Service is healthy")))]
pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
