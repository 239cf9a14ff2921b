// HTTP API Error Types
use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::auth::AuthError;
use crate::database::DatabaseError;
use crate::entity::{FieldError, PrepareError, ValidationResult};
use crate::middleware::response::Envelope;

pub const MSG_BAD_REQUEST: &str = "api.msg.error.bad_request";
pub const MSG_UNAUTHORIZED: &str = "api.msg.error.unauthorized";
pub const MSG_NOT_FOUND: &str = "api.msg.error.not_found";
pub const MSG_CONFLICT: &str = "api.msg.error.conflict";
pub const MSG_UNPROCESSABLE_ENTITY: &str = "api.msg.error.unprocessable_entity";
pub const MSG_INTERNAL_SERVER_ERROR: &str = "api.msg.error.internal_server_error";
pub const MSG_SERVICE_UNAVAILABLE: &str = "api.msg.error.service_unavailable";

/// HTTP API error. Messages are catalogue keys, resolved per request
/// language by the localization layer.
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict
    Conflict(String),

    // 422 Unprocessable Entity
    UnprocessableEntity {
        message: String,
        field_errors: Vec<FieldError>,
    },

    // 500 Internal Server Error
    InternalServerError(String),

    // 503 Service Unavailable
    ServiceUnavailable(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Unauthorized(_) => 401,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::Conflict(_) => 409,
            ApiError::UnprocessableEntity { .. } => 422,
            ApiError::InternalServerError(_) => 500,
            ApiError::ServiceUnavailable(_) => 503,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::Conflict(msg) => msg,
            ApiError::UnprocessableEntity { message, .. } => message,
            ApiError::InternalServerError(msg) => msg,
            ApiError::ServiceUnavailable(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::UnprocessableEntity { .. } => "UNPROCESSABLE_ENTITY",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Build the response envelope; field errors are rendered untranslated
    /// until the localization layer replaces them.
    pub fn to_envelope(&self) -> Envelope {
        let field_errors = match self {
            ApiError::UnprocessableEntity { field_errors, .. } => field_errors.clone(),
            _ => Vec::new(),
        };
        let data = (!field_errors.is_empty()).then(|| {
            json!(field_errors
                .iter()
                .map(|e| json!({ "field": e.field, "message": e.message }))
                .collect::<Vec<_>>())
        });

        Envelope {
            code: self.status_code(),
            error: Some(self.error_code()),
            message: self.message().to_string(),
            data,
            meta: None,
            field_errors,
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn unprocessable_entity(message: impl Into<String>, field_errors: Vec<FieldError>) -> Self {
        ApiError::UnprocessableEntity {
            message: message.into(),
            field_errors,
        }
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        ApiError::ServiceUnavailable(message.into())
    }
}

impl From<ValidationResult> for ApiError {
    fn from(errors: ValidationResult) -> Self {
        ApiError::unprocessable_entity(MSG_UNPROCESSABLE_ENTITY, errors)
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(what) => {
                tracing::debug!("Not found: {}", what);
                ApiError::not_found(MSG_NOT_FOUND)
            }
            DatabaseError::Conflict(what) => {
                tracing::debug!("Conflict: {}", what);
                ApiError::conflict(MSG_CONFLICT)
            }
            DatabaseError::QueryError(msg) => {
                // Don't expose internal SQL errors to clients
                tracing::error!("Database query error: {}", msg);
                ApiError::internal_server_error(MSG_INTERNAL_SERVER_ERROR)
            }
            DatabaseError::Sqlx(sqlx_err) => {
                tracing::error!("SQLx error: {}", sqlx_err);
                ApiError::internal_server_error(MSG_INTERNAL_SERVER_ERROR)
            }
            DatabaseError::InvalidDatabaseUrl(e) => {
                tracing::error!("Invalid database URL: {}", e);
                ApiError::service_unavailable(MSG_SERVICE_UNAVAILABLE)
            }
            DatabaseError::MigrationError(e) => {
                tracing::error!("Migration error: {}", e);
                ApiError::service_unavailable(MSG_SERVICE_UNAVAILABLE)
            }
        }
    }
}

impl From<PrepareError> for ApiError {
    fn from(err: PrepareError) -> Self {
        tracing::error!("Failed to prepare entity: {}", err);
        ApiError::internal_server_error(MSG_INTERNAL_SERVER_ERROR)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken(_) | AuthError::WrongTokenKind(_) => {
                tracing::debug!("Rejected token: {}", err);
                ApiError::unauthorized(MSG_UNAUTHORIZED)
            }
            AuthError::InvalidSecret | AuthError::TokenGeneration(_) => {
                tracing::error!("Token error: {}", err);
                ApiError::internal_server_error(MSG_INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("Rejected JSON body: {}", rejection.body_text());
        ApiError::bad_request(MSG_BAD_REQUEST)
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!("Rejected path: {}", rejection.body_text());
        ApiError::not_found(MSG_NOT_FOUND)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!("Rejected query: {}", rejection.body_text());
        ApiError::bad_request(MSG_BAD_REQUEST)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.to_envelope().render()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::user::MSG_FIRST_NAME_REQUIRED;

    #[test]
    fn test_validation_errors_become_unprocessable_entity() {
        let err = ApiError::from(vec![FieldError::new("first_name", MSG_FIRST_NAME_REQUIRED)]);
        assert_eq!(err.status_code(), 422);

        let body = serde_json::to_value(err.to_envelope()).unwrap();
        assert_eq!(body["error"], "UNPROCESSABLE_ENTITY");
        assert_eq!(body["message"], MSG_UNPROCESSABLE_ENTITY);
        assert_eq!(body["data"][0]["field"], "first_name");
    }

    #[test]
    fn test_database_errors_are_not_leaked() {
        let err = ApiError::from(DatabaseError::QueryError("syntax error at or near".to_string()));
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.message(), MSG_INTERNAL_SERVER_ERROR);

        let err = ApiError::from(DatabaseError::Conflict("user email already exists".to_string()));
        assert_eq!(err.status_code(), 409);
    }

    #[test]
    fn test_plain_errors_have_no_data() {
        let body = serde_json::to_value(ApiError::not_found(MSG_NOT_FOUND).to_envelope()).unwrap();
        assert_eq!(body["code"], 404);
        assert!(body.get("data").is_none());
    }
}
