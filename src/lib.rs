use axum::{extract::DefaultBodyLimit, Router};
use std::sync::Arc;
use tower_http::compression::{predicate::SizeAbove, CompressionLayer};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod middleware;
pub mod monitoring;
pub mod observability;
pub mod security;
pub mod services;
pub mod state;

use api::create_api_router;
use middleware::request_id_middleware;
use monitoring::monitoring_router;
use observability::metrics_middleware;
use security::{get_cors_layer, security_headers_middleware};
use state::AppState;

use axum::middleware as axum_middleware;

/// Builds the full application: report API, monitoring endpoints and the
/// shared middleware stack.
pub fn create_app_router(app_state: Arc<AppState>) -> Router {
    let body_limit = (app_state.config.app.max_request_size_mb as usize) * 1024 * 1024;
    let cors = get_cors_layer(&app_state.config.app.cors_allowed_origins);

    Router::new()
        // Monitoring endpoints (no authentication) - includes Prometheus /metrics
        .merge(monitoring_router())
        .merge(create_api_router(app_state.clone()))
        .with_state(app_state)
        .layer(axum_middleware::from_fn(metrics_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            CompressionLayer::new()
                .gzip(true)
                .deflate(true)
                .compress_when(SizeAbove::new(1024)),
        )
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(security_headers_middleware))
}
