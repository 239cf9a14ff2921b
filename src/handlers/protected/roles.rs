use axum::extract::{
    rejection::{JsonRejection, PathRejection, QueryRejection},
    Path, Query, State,
};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::database::{dedup_uuids, Page, PageMeta};
use crate::entity::role::{RoleDetail, RoleListItem};
use crate::entity::{list_item_views, Operation, Projectable, Role, Validated};
use crate::error::{ApiError, MSG_INTERNAL_SERVER_ERROR};
use crate::middleware::{ApiResponse, ApiResult};

use super::role_not_found;

const MSG_GET_ROLE_LIST: &str = "api.msg.success.role.get_role_list";
const MSG_GET_ROLE_DETAIL: &str = "api.msg.success.role.get_role_detail";
const MSG_CREATE_ROLE: &str = "api.msg.success.role.create_role";
const MSG_UPDATE_ROLE: &str = "api.msg.success.role.update_role";
const MSG_DELETE_ROLE: &str = "api.msg.success.role.delete_role";

/// Role attributes plus an optional replacement permission list. Repeated
/// permission ids are assigned once.
#[derive(Debug, Deserialize)]
pub struct RolePayload {
    #[serde(flatten)]
    pub role: Role,
    #[serde(default)]
    pub permissions: Option<Vec<Uuid>>,
}

async fn ensure_permissions_exist(state: &AppState, permissions: &[Uuid]) -> Result<(), ApiError> {
    for permission in permissions {
        state.store.get_permission(*permission).await?;
    }
    Ok(())
}

/// GET /roles
pub async fn list_roles(
    State(state): State<AppState>,
    query: Result<Query<Page>, QueryRejection>,
) -> ApiResult<Vec<RoleListItem>> {
    let Query(page) = query?;
    let page = page.normalized();
    let (roles, total) = state.store.list_roles(page).await?;

    Ok(ApiResponse::success(MSG_GET_ROLE_LIST, list_item_views(&roles)).with_meta(PageMeta::new(page, total)))
}

/// GET /roles/:uuid
pub async fn get_role(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<RoleDetail> {
    let Path(uuid) = path?;
    let role = state.store.get_role(uuid).await.map_err(role_not_found)?;
    Ok(ApiResponse::success(MSG_GET_ROLE_DETAIL, role.detail_view()))
}

/// POST /roles
pub async fn create_role(
    State(state): State<AppState>,
    payload: Result<Json<RolePayload>, JsonRejection>,
) -> ApiResult<RoleDetail> {
    let Json(payload) = payload?;
    let role = Validated::check(payload.role, Operation::Create)?
        .prepare()
        .before_save(state.hasher.as_ref())?
        .into_inner();
    let permissions = payload.permissions.as_deref().map(dedup_uuids);
    if let Some(permissions) = &permissions {
        ensure_permissions_exist(&state, permissions).await?;
    }

    let created = state.store.create_role(&role).await?;
    let Some(uuid) = created.uuid else {
        return Err(ApiError::internal_server_error(MSG_INTERNAL_SERVER_ERROR));
    };
    if let Some(permissions) = &permissions {
        state.store.set_role_permissions(uuid, permissions).await?;
    }
    tracing::info!(role = %uuid, name = %created.name, "Created role");

    let role = state.store.get_role(uuid).await?;
    Ok(ApiResponse::created(MSG_CREATE_ROLE, role.detail_view()))
}

/// PUT /roles/:uuid
pub async fn update_role(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<RolePayload>, JsonRejection>,
) -> ApiResult<RoleDetail> {
    let Path(uuid) = path?;
    let Json(payload) = payload?;
    let role = Validated::check(payload.role, Operation::Update)?
        .prepare()
        .into_inner();
    let permissions = payload.permissions.as_deref().map(dedup_uuids);
    if let Some(permissions) = &permissions {
        ensure_permissions_exist(&state, permissions).await?;
    }

    state.store.update_role(uuid, &role).await.map_err(role_not_found)?;
    if let Some(permissions) = &permissions {
        state.store.set_role_permissions(uuid, permissions).await?;
    }
    tracing::info!(role = %uuid, "Updated role");

    let role = state.store.get_role(uuid).await.map_err(role_not_found)?;
    Ok(ApiResponse::success(MSG_UPDATE_ROLE, role.detail_view()))
}

/// DELETE /roles/:uuid - soft delete
pub async fn delete_role(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<()> {
    let Path(uuid) = path?;
    state.store.delete_role(uuid).await.map_err(role_not_found)?;
    tracing::info!(role = %uuid, "Deleted role");
    Ok(ApiResponse::success(MSG_DELETE_ROLE, ()))
}
