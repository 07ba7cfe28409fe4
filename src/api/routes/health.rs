//! Health Routes
//!
//! - GET /api/health - Database round-trip check
//! - GET /health/live - Liveness probe (process is alive)
//! - GET /health/ready - Readiness probe (ready to serve traffic)
//! - GET /health - Full health status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::{ApiHealthResponse, HealthResponse};
use crate::api::state::AppState;

/// GET /api/health
///
/// Runs a trivial read against the profiles table.
pub async fn api_health(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<ApiHealthResponse>) {
    match state.store.ping().await {
        Ok(_) => (
            StatusCode::OK,
            Json(ApiHealthResponse {
                status: "ok".to_string(),
                message: "Database connection is healthy".to_string(),
                error: None,
            }),
        ),
        Err(e) => {
            tracing::error!(error = %e, "Health check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiHealthResponse {
                    status: "error".to_string(),
                    message: "Database connection failed".to_string(),
                    error: Some(e.to_string()),
                }),
            )
        }
    }
}

/// GET /health/live
///
/// Returns 200 if the process is alive, no dependency checks.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// GET /health/ready
///
/// Returns 200 once the database answers.
pub async fn readiness(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.store.ping().await.is_ok() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health
pub async fn full_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let storage_ok = state.store.ping().await.is_ok();

    Json(HealthResponse {
        status: if storage_ok { "healthy" } else { "unhealthy" }.to_string(),
        storage: if storage_ok { "ok" } else { "error" }.to_string(),
        uptime_seconds: state.uptime_seconds(),
        ws_connections: state.ws_connection_count().await,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_liveness() {
        let status = liveness().await;
        assert_eq!(status, StatusCode::OK);
    }
}
