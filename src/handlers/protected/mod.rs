// handlers/protected/mod.rs - Protected handlers (JWT access token required)
//
// The auth middleware injects `AuthUser` before any handler here runs.
pub mod language;
pub mod permissions;
pub mod profile;
pub mod roles;
pub mod users;

use crate::database::DatabaseError;
use crate::error::ApiError;

pub const MSG_USER_NOT_FOUND: &str = "api.msg.error.user.not_found";
pub const MSG_ROLE_NOT_FOUND: &str = "api.msg.error.role.not_found";

/// Report a missing record as an unknown user
pub(crate) fn user_not_found(err: DatabaseError) -> ApiError {
    match err {
        DatabaseError::NotFound(_) => ApiError::not_found(MSG_USER_NOT_FOUND),
        other => other.into(),
    }
}

/// Report a missing record as an unknown role
pub(crate) fn role_not_found(err: DatabaseError) -> ApiError {
    match err {
        DatabaseError::NotFound(_) => ApiError::not_found(MSG_ROLE_NOT_FOUND),
        other => other.into(),
    }
}
