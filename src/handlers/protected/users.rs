use axum::extract::{
    rejection::{JsonRejection, PathRejection, QueryRejection},
    Path, Query, State,
};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::{dedup_uuids, Page, PageMeta};
use crate::entity::user::{UserDetail, UserListItem};
use crate::entity::{list_item_views, Operation, Projectable, User, Validated};
use crate::error::{ApiError, MSG_INTERNAL_SERVER_ERROR};
use crate::handlers::run_blocking;
use crate::middleware::{ApiResponse, ApiResult};

use super::{role_not_found, user_not_found};

const MSG_GET_USER_LIST: &str = "api.msg.success.user.get_user_list";
const MSG_GET_USER_DETAIL: &str = "api.msg.success.user.get_user_detail";
const MSG_CREATE_USER: &str = "api.msg.success.user.create_user";
const MSG_UPDATE_USER: &str = "api.msg.success.user.update_user";
const MSG_DELETE_USER: &str = "api.msg.success.user.delete_user";

/// User attributes plus an optional replacement role list. Repeated role ids
/// are assigned once.
#[derive(Debug, Deserialize)]
pub struct UserPayload {
    #[serde(flatten)]
    pub user: User,
    #[serde(default)]
    pub roles: Option<Vec<Uuid>>,
}

async fn ensure_roles_exist(state: &AppState, roles: &[Uuid]) -> Result<(), ApiError> {
    for role in roles {
        state.store.get_role(*role).await.map_err(role_not_found)?;
    }
    Ok(())
}

/// GET /users
pub async fn list_users(
    State(state): State<AppState>,
    query: Result<Query<Page>, QueryRejection>,
) -> ApiResult<Vec<UserListItem>> {
    let Query(page) = query?;
    let page = page.normalized();
    let (users, total) = state.store.list_users(page).await?;

    Ok(ApiResponse::success(MSG_GET_USER_LIST, list_item_views(&users)).with_meta(PageMeta::new(page, total)))
}

/// GET /users/:uuid
pub async fn get_user(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<UserDetail> {
    let Path(uuid) = path?;
    let user = state.store.get_user(uuid).await.map_err(user_not_found)?;
    Ok(ApiResponse::success(MSG_GET_USER_DETAIL, user.detail_view()))
}

/// POST /users - validate, prepare, hash and persist a new user
pub async fn create_user(
    State(state): State<AppState>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<UserDetail> {
    let Json(payload) = payload?;
    let prepared = Validated::check(payload.user, Operation::Create)?.prepare();
    let roles = payload.roles.as_deref().map(dedup_uuids);
    if let Some(roles) = &roles {
        ensure_roles_exist(&state, roles).await?;
    }

    let hasher = state.hasher.clone();
    let user = run_blocking(move || prepared.before_save(hasher.as_ref()))
        .await??
        .into_inner();

    let created = state.store.create_user(&user).await?;
    let Some(uuid) = created.uuid else {
        return Err(ApiError::internal_server_error(MSG_INTERNAL_SERVER_ERROR));
    };
    if let Some(roles) = &roles {
        state.store.set_user_roles(uuid, roles).await.map_err(role_not_found)?;
    }
    tracing::info!(user = %uuid, "Created user");

    let user = state.store.get_user(uuid).await?;
    Ok(ApiResponse::created(MSG_CREATE_USER, user.detail_view()))
}

/// PUT /users/:uuid - update attributes; the stored password is untouched
pub async fn update_user(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UserPayload>, JsonRejection>,
) -> ApiResult<UserDetail> {
    let Path(uuid) = path?;
    let Json(payload) = payload?;
    let user = Validated::check(payload.user, Operation::Update)?
        .prepare()
        .into_inner();
    let roles = payload.roles.as_deref().map(dedup_uuids);
    if let Some(roles) = &roles {
        ensure_roles_exist(&state, roles).await?;
    }

    state.store.update_user(uuid, &user).await.map_err(user_not_found)?;
    if let Some(roles) = &roles {
        state.store.set_user_roles(uuid, roles).await.map_err(role_not_found)?;
    }
    tracing::info!(user = %uuid, "Updated user");

    let user = state.store.get_user(uuid).await.map_err(user_not_found)?;
    Ok(ApiResponse::success(MSG_UPDATE_USER, user.detail_view()))
}

/// DELETE /users/:uuid - soft delete
pub async fn delete_user(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<()> {
    let Path(uuid) = path?;
    state.store.delete_user(uuid).await.map_err(user_not_found)?;
    tracing::info!(user = %uuid, "Deleted user");
    Ok(ApiResponse::success(MSG_DELETE_USER, ()))
}
