use axum::extract::{rejection::QueryRejection, Query, State};

use crate::app::AppState;
use crate::database::{Page, PageMeta};
use crate::entity::list_item_views;
use crate::entity::permission::PermissionListItem;
use crate::middleware::{ApiResponse, ApiResult};

const MSG_GET_PERMISSION_LIST: &str = "api.msg.success.permission.get_permission_list";

/// GET /permissions - ordered by module then permission key
pub async fn list_permissions(
    State(state): State<AppState>,
    query: Result<Query<Page>, QueryRejection>,
) -> ApiResult<Vec<PermissionListItem>> {
    let Query(page) = query?;
    let page = page.normalized();
    let (permissions, total) = state.store.list_permissions(page).await?;

    Ok(ApiResponse::success(MSG_GET_PERMISSION_LIST, list_item_views(&permissions))
        .with_meta(PageMeta::new(page, total)))
}
