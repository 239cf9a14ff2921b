use axum::extract::State;
use axum::Extension;
use serde_json::Value;

use crate::app::AppState;
use crate::entity::{Projectable, Projection};
use crate::error::{ApiError, MSG_INTERNAL_SERVER_ERROR};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

use super::user_not_found;

const MSG_GET_PROFILE: &str = "api.msg.success.user.get_profile";

/// GET /profile - the caller's detail view with its avatar URL
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Value> {
    let user = state.store.get_user(auth.uuid).await.map_err(user_not_found)?;
    let avatar = state.asset_url(user.avatar_uuid);

    let data = user.project(Projection::DetailWithAsset(avatar)).map_err(|e| {
        tracing::error!("Failed to project profile: {}", e);
        ApiError::internal_server_error(MSG_INTERNAL_SERVER_ERROR)
    })?;

    Ok(ApiResponse::success(MSG_GET_PROFILE, data))
}
