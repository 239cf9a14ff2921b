// handlers/public/auth/refresh.rs - POST /refresh handler

use axum::extract::{rejection::JsonRejection, State};
use axum::Json;

use crate::app::AppState;
use crate::auth::{TokenKind, TokenPair};
use crate::database::DatabaseError;
use crate::entity::{Operation, UserRefreshToken, Validated};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

const MSG_REFRESH: &str = "api.msg.success.auth.refresh";
pub const MSG_INVALID_REFRESH_TOKEN: &str = "api.msg.error.invalid_refresh_token";

fn invalid_refresh_token() -> ApiError {
    ApiError::unauthorized(MSG_INVALID_REFRESH_TOKEN)
}

/// POST /refresh - trade a refresh token for a new token pair
///
/// The session language travels with the new pair. Tokens of deleted users
/// are refused.
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<UserRefreshToken>, JsonRejection>,
) -> ApiResult<TokenPair> {
    let Json(request) = payload?;
    let request = Validated::check(request, Operation::Refresh)?;

    let claims = state
        .jwt
        .validate(&request.entity().refresh_token, TokenKind::Refresh)
        .map_err(|e| {
            tracing::debug!("Rejected refresh token: {}", e);
            invalid_refresh_token()
        })?;

    match state.store.get_user(claims.sub).await {
        Ok(_) => {}
        Err(DatabaseError::NotFound(_)) => return Err(invalid_refresh_token()),
        Err(e) => return Err(e.into()),
    }

    let tokens = state.jwt.issue_pair(claims.sub, claims.lang)?;
    tracing::info!(user = %claims.sub, "Refreshed session");
    Ok(ApiResponse::success(MSG_REFRESH, tokens))
}
