use axum::{
    body::Body,
    extract::{Request, State},
    http::header::{ACCEPT_LANGUAGE, CONTENT_LENGTH},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;

use crate::i18n::{Language, Translator};
use crate::middleware::response::Envelope;

/// Language carried by the caller's session token, set on the response by
/// the auth layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLanguage(pub Language);

/// Translate the message keys of the response envelope. `Accept-Language`
/// wins, then the session language, then the configured default.
pub async fn localize_middleware(
    State(translator): State<Arc<Translator>>,
    request: Request,
    next: Next,
) -> Response {
    let requested = request
        .headers()
        .get(ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .and_then(Language::from_accept_language);

    let mut response = next.run(request).await;
    let language = requested
        .or_else(|| response.extensions().get::<SessionLanguage>().map(|session| session.0))
        .unwrap_or_else(|| translator.default_language());
    match response.extensions_mut().remove::<Envelope>() {
        Some(envelope) => localize(&translator, language, envelope, response),
        None => response,
    }
}

fn localize(translator: &Translator, language: Language, mut envelope: Envelope, response: Response) -> Response {
    envelope.message = translator.translate(language, &envelope.message);
    if !envelope.field_errors.is_empty() {
        envelope.data = Some(json!(translator.translate_errors(language, &envelope.field_errors)));
    }

    let body = match serde_json::to_vec(&envelope) {
        Ok(body) => body,
        Err(e) => {
            tracing::error!("Failed to serialize localized envelope: {}", e);
            return response;
        }
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(body)).into_response()
}
