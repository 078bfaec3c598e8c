use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: ServiceHealth,
}

#[derive(Serialize)]
pub struct ServiceHealth {
    pub upstream: String,
}

/// Health check endpoint - public
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthResponse>) {
    let upstream_result = state.upstream.health_check().await;

    if let Err(e) = &upstream_result {
        tracing::warn!(error = %e, "Upstream health check failed");
    }

    // Reads still work from snapshots while the upstream is down, so this
    // never reports 503
    let status = if upstream_result.is_ok() { "healthy" } else { "degraded" };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            services: ServiceHealth {
                upstream: if upstream_result.is_ok() { "ok" } else { "error" }.to_string(),
            },
        }),
    )
}
