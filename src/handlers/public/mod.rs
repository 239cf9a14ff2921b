// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Liveness checks and token acquisition.
pub mod auth;

use axum::extract::State;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::AppState;
use crate::error::{ApiError, MSG_SERVICE_UNAVAILABLE};
use crate::middleware::{ApiResponse, ApiResult};

const MSG_PONG: &str = "api.msg.success.pong";
const MSG_HEALTH: &str = "api.msg.success.health";

/// GET /ping
pub async fn ping() -> ApiResponse<&'static str> {
    ApiResponse::success(MSG_PONG, "pong")
}

#[derive(Debug, Serialize)]
pub struct HealthData {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub database: &'static str,
}

/// GET /health - storage connectivity check
pub async fn health(State(state): State<AppState>) -> ApiResult<HealthData> {
    state.store.health_check().await.map_err(|e| {
        tracing::error!("Health check failed: {}", e);
        ApiError::service_unavailable(MSG_SERVICE_UNAVAILABLE)
    })?;

    Ok(ApiResponse::success(
        MSG_HEALTH,
        HealthData {
            status: "ok",
            timestamp: Utc::now(),
            database: "ok",
        },
    ))
}
