use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::database::PageMeta;
use crate::entity::FieldError;

/// The JSON body shared by every response. `message` holds a catalogue key
/// until the localization layer resolves it.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
    /// Raw field errors, rendered into `data` once translated
    #[serde(skip)]
    pub field_errors: Vec<FieldError>,
}

impl Envelope {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Render the body and keep a copy in the response extensions
    pub fn render(self) -> Response {
        let mut response = (self.status(), Json(&self)).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// Wrapper for successful handler results
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub message: &'static str,
    pub status_code: StatusCode,
    pub meta: Option<PageMeta>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK with a catalogue message key
    pub fn success(message: &'static str, data: T) -> Self {
        Self::with_status(message, data, StatusCode::OK)
    }

    pub fn with_status(message: &'static str, data: T, status_code: StatusCode) -> Self {
        Self {
            data,
            message,
            status_code,
            meta: None,
        }
    }

    /// 201 Created
    pub fn created(message: &'static str, data: T) -> Self {
        Self::with_status(message, data, StatusCode::CREATED)
    }

    pub fn with_meta(mut self, meta: PageMeta) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let data = match serde_json::to_value(&self.data) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Failed to serialize response data: {}", e);
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "code": 500,
                        "error": "INTERNAL_SERVER_ERROR",
                        "message": "Failed to serialize response data"
                    })),
                )
                    .into_response();
            }
        };

        Envelope {
            code: self.status_code.as_u16(),
            error: None,
            message: self.message.to_string(),
            data: Some(data),
            meta: self.meta,
            field_errors: Vec::new(),
        }
        .render()
    }
}

pub type ApiResult<T> = Result<ApiResponse<T>, crate::error::ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Page;

    #[test]
    fn test_success_envelope_keeps_meta_and_null_data() {
        let response = ApiResponse::success("api.msg.success.pong", ())
            .with_meta(PageMeta::new(Page::default(), 0))
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let envelope = response.extensions().get::<Envelope>().unwrap();
        let body = serde_json::to_value(envelope).unwrap();
        assert_eq!(body["code"], 200);
        assert_eq!(body["data"], Value::Null);
        assert_eq!(body["meta"]["total_page"], 0);
        assert!(body.get("error").is_none());
    }

    #[test]
    fn test_created_status() {
        let response = ApiResponse::created("api.msg.success.role.create_role", json!({"name": "Admin"}))
            .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
    }
}
