// handlers/public/auth/login.rs - POST /login handler

use axum::extract::{rejection::JsonRejection, State};
use axum::Json;
use serde::Serialize;

use crate::app::AppState;
use crate::auth::TokenPair;
use crate::entity::lifecycle::sanitize;
use crate::entity::user::UserDetail;
use crate::entity::{Operation, Projectable, User, Validated};
use crate::error::{ApiError, MSG_INTERNAL_SERVER_ERROR};
use crate::handlers::run_blocking;
use crate::middleware::{ApiResponse, ApiResult};

const MSG_LOGIN: &str = "api.msg.success.auth.login";
pub const MSG_INVALID_CREDENTIALS: &str = "api.msg.error.invalid_email_or_password";

#[derive(Debug, Serialize)]
pub struct LoginData {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: UserDetail,
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized(MSG_INVALID_CREDENTIALS)
}

/// POST /login - exchange email and password for an access and refresh token
///
/// Unknown email and wrong password are reported identically.
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<User>, JsonRejection>,
) -> ApiResult<LoginData> {
    let Json(credentials) = payload?;
    let credentials = Validated::check(credentials, Operation::Login)?;
    let email = sanitize(&credentials.entity().email);

    let user = state
        .store
        .get_user_by_email(&email)
        .await?
        .ok_or_else(invalid_credentials)?;

    let hasher = state.hasher.clone();
    let plaintext = credentials.entity().password.clone();
    let hashed = user.password.clone();
    let verified = run_blocking(move || hasher.verify(&plaintext, &hashed)).await??;
    if !verified {
        tracing::debug!("Password mismatch for {}", email);
        return Err(invalid_credentials());
    }

    let Some(uuid) = user.uuid else {
        tracing::error!("Stored user without uuid: {}", email);
        return Err(ApiError::internal_server_error(MSG_INTERNAL_SERVER_ERROR));
    };
    let tokens = state.jwt.issue_pair(uuid, None)?;
    let user = state.store.get_user(uuid).await?;
    tracing::info!(user = %uuid, "User logged in");

    Ok(ApiResponse::success(
        MSG_LOGIN,
        LoginData {
            tokens,
            user: user.detail_view(),
        },
    ))
}
