// handlers/public/auth/password.rs - password recovery handlers

use axum::extract::{
    rejection::{JsonRejection, PathRejection},
    Path, State,
};
use axum::Json;
use serde::Serialize;

use crate::app::AppState;
use crate::auth::TokenKind;
use crate::entity::lifecycle::sanitize;
use crate::entity::{BeforeSave, Operation, PrepareError, User, UserResetPassword, Validated};
use crate::error::{ApiError, MSG_INTERNAL_SERVER_ERROR};
use crate::handlers::protected::{user_not_found, MSG_USER_NOT_FOUND};
use crate::handlers::run_blocking;
use crate::middleware::{ApiResponse, ApiResult};

const MSG_FORGOT_PASSWORD: &str = "api.msg.success.auth.forgot_password";
const MSG_RESET_PASSWORD: &str = "api.msg.success.auth.reset_password";
pub const MSG_INVALID_RESET_TOKEN: &str = "api.msg.error.invalid_reset_token";

#[derive(Debug, Serialize)]
pub struct ForgotPasswordData {
    /// Only exposed outside production; delivery is otherwise out of band
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_token: Option<String>,
    pub expires_in: i64,
}

/// POST /password/forgot - issue a short-lived reset token
pub async fn forgot_password(
    State(state): State<AppState>,
    payload: Result<Json<User>, JsonRejection>,
) -> ApiResult<ForgotPasswordData> {
    let Json(request) = payload?;
    let request = Validated::check(request, Operation::ForgotPassword)?;
    let email = sanitize(&request.entity().email);

    let user = state
        .store
        .get_user_by_email(&email)
        .await?
        .ok_or_else(|| ApiError::not_found(MSG_USER_NOT_FOUND))?;
    let Some(uuid) = user.uuid else {
        return Err(ApiError::internal_server_error(MSG_INTERNAL_SERVER_ERROR));
    };

    let token = state.jwt.generate_reset(uuid, &user.password)?;
    tracing::info!(user = %uuid, "Issued password reset token");
    tracing::debug!("Password reset token for {}: {}", uuid, token);

    Ok(ApiResponse::success(
        MSG_FORGOT_PASSWORD,
        ForgotPasswordData {
            reset_token: state.config.app.debug_mode.then_some(token),
            expires_in: state.jwt.ttl(TokenKind::PasswordReset).num_seconds(),
        },
    ))
}

fn invalid_reset_token(err: impl std::fmt::Display) -> ApiError {
    tracing::debug!("Rejected reset token: {}", err);
    ApiError::unauthorized(MSG_INVALID_RESET_TOKEN)
}

/// POST /password/reset/:token - set a new password with a reset token
///
/// The token is bound to the password hash it was issued against, so it
/// stops working once any reset succeeds.
pub async fn reset_password(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<UserResetPassword>, JsonRejection>,
) -> ApiResult<()> {
    let Path(token) = path?;
    let Json(form) = payload?;
    let form = Validated::check(form, Operation::ResetPassword)?;

    let subject = state.jwt.reset_subject(&token).map_err(invalid_reset_token)?;
    let mut user = state.store.get_user(subject).await.map_err(user_not_found)?;
    let claims = state
        .jwt
        .validate_reset(&token, &user.password)
        .map_err(invalid_reset_token)?;

    user.password = form.entity().new_password.clone();

    let hasher = state.hasher.clone();
    let user = run_blocking(move || {
        let mut user = user;
        user.before_save(hasher.as_ref())?;
        Ok::<_, PrepareError>(user)
    })
    .await??;

    state.store.update_user_password(claims.sub, &user.password).await?;
    tracing::info!(user = %claims.sub, "Password reset");

    Ok(ApiResponse::success(MSG_RESET_PASSWORD, ()))
}
