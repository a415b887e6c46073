//! Health and metrics endpoints

use axum::{extract::State, http::header, response::IntoResponse, Json};
use wellgate_core::MetricsSnapshot;

use crate::dto::HealthResponse;
use crate::error::ApiResult;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let stats = state.storage.get_stats().await.ok();

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        storage: stats.map(Into::into),
    }))
}

/// Prometheus text exposition endpoint
pub async fn metrics_export(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.prometheus_export(),
    )
}

/// JSON metrics snapshot
pub async fn metrics_snapshot(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
