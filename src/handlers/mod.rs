// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (JWT access token)
pub mod protected;
pub mod public;

use crate::error::{ApiError, MSG_INTERNAL_SERVER_ERROR, MSG_NOT_FOUND};

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::not_found(MSG_NOT_FOUND)
}

/// Run CPU-bound work such as bcrypt off the async executor
pub(crate) async fn run_blocking<F, R>(task: F) -> Result<R, ApiError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(task).await.map_err(|e| {
        tracing::error!("Blocking task failed: {}", e);
        ApiError::internal_server_error(MSG_INTERNAL_SERVER_ERROR)
    })
}
