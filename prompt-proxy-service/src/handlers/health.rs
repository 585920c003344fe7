use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::startup::AppState;

/// Liveness probe. 200 as long as the process serves.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "prompt-proxy-service",
            "version": env!("CARGO_PKG_VERSION"),
            "provider": state.text_provider.name(),
        })),
    )
}

/// Readiness probe: the configured provider must be usable.
pub async fn readiness_check(State(state): State<AppState>) -> StatusCode {
    match state.text_provider.health_check().await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
