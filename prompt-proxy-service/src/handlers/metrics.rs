use axum::http::{header, StatusCode};
use axum::response::IntoResponse;

use crate::services::metrics;

/// Prometheus text exposition.
pub async fn metrics_exposition() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::get_metrics(),
    )
}
