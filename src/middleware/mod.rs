pub mod auth;
pub mod language;
pub mod logger;
pub mod request_id;
pub mod response;

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

pub use auth::{jwt_auth_middleware, AuthUser};
pub use language::{localize_middleware, SessionLanguage};
pub use logger::request_logger_middleware;
pub use request_id::{request_id_middleware, RequestId, SET_REQUEST_ID, X_REQUEST_ID};
pub use response::{ApiResponse, ApiResult, Envelope};

/// CORS for the configured origins; `*` allows any origin
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
