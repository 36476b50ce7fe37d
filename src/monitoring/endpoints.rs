use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tracing::error;

use crate::observability::metrics_handler;
use crate::state::AppState;

/// Health, readiness and metrics endpoints. None of them require a token.
pub fn monitoring_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics_handler))
}

/// Liveness: the process is up and serving.
async fn health_check() -> impl IntoResponse {
    let health = serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    });

    (StatusCode::OK, Json(health))
}

/// Readiness: the voucher store answers.
async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let start = std::time::Instant::now();

    match state.vouchers.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "database": {
                    "status": "healthy",
                    "response_time_ms": start.elapsed().as_millis() as u64,
                },
            })),
        ),
        Err(e) => {
            error!("❌ Readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "not_ready",
                    "database": {
                        "status": "unhealthy",
                        "error": e.public_message(),
                    },
                })),
            )
        }
    }
}
