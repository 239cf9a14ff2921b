use axum::extract::{rejection::JsonRejection, State};
use axum::{Extension, Json};
use serde::Serialize;

use crate::app::AppState;
use crate::auth::TokenPair;
use crate::entity::user::MSG_LANGUAGE_UNSUPPORTED;
use crate::entity::{FieldError, Operation, UserLanguage, Validated};
use crate::error::ApiError;
use crate::i18n::Language;
use crate::middleware::{ApiResponse, AuthUser, SessionLanguage};

const MSG_SWITCH_LANGUAGE: &str = "api.msg.success.auth.switch_language";

#[derive(Debug, Serialize)]
pub struct LanguageData {
    pub language: Language,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// POST /language - switch the session language
///
/// The choice lives in the session tokens, so a new pair is returned and the
/// old one keeps its language until it expires. This response is already
/// rendered in the new language.
pub async fn switch_language(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    payload: Result<Json<UserLanguage>, JsonRejection>,
) -> Result<(Extension<SessionLanguage>, ApiResponse<LanguageData>), ApiError> {
    let Json(request) = payload?;
    let request = Validated::check(request, Operation::SwitchLanguage)?;
    let language = Language::from_tag(&request.entity().language).ok_or_else(|| {
        ApiError::from(vec![
            FieldError::new("language", MSG_LANGUAGE_UNSUPPORTED).with_field_context(),
        ])
    })?;

    let tokens = state.jwt.issue_pair(auth.uuid, Some(language))?;
    tracing::info!(user = %auth.uuid, language = language.code(), "Switched session language");

    Ok((
        Extension(SessionLanguage(language)),
        ApiResponse::success(MSG_SWITCH_LANGUAGE, LanguageData { language, tokens }),
    ))
}
