use axum::Json;
use axum::extract::{Path, State};
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::files::{FileNodeResponse, LifecycleResponse, TrashListResponse};
use crate::services::trash;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/files/trash",
    tag = "Trash",
    operation_id = "listTrash",
    summary = "List the trash",
    description = "Returns only the highest deleted ancestors: descendants of a trashed \
        folder ride the cascade and are not listed separately.",
    responses(
        (status = 200, description = "Trash contents", body = TrashListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn list_trash(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<TrashListResponse>, AppError> {
    auth_user.require_permission("file:read")?;

    let entries = trash::list_trash(&state.db, auth_user.user_id).await?;
    Ok(Json(TrashListResponse {
        total: entries.len() as u64,
        data: entries.into_iter().map(FileNodeResponse::from).collect(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/files/trash/restore/{id}",
    tag = "Trash",
    operation_id = "restoreNode",
    summary = "Restore a trashed file or folder",
    description = "All-or-nothing: the name-collision and capacity checks run before \
        anything is restored; on failure the whole subtree stays in the trash.",
    params(("id" = Uuid, Path, description = "Trashed node ID")),
    responses(
        (status = 200, description = "Restored", body = FileNodeResponse),
        (status = 404, description = "Not in trash (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Restore target occupied (CONFLICT)", body = ErrorBody),
        (status = 413, description = "Quota exceeded (QUOTA_EXCEEDED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, node_id = %id))]
pub async fn restore_node(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FileNodeResponse>, AppError> {
    auth_user.require_permission("file:write")?;

    let outcome = trash::restore(
        &state.db,
        auth_user.user_id,
        id,
        state.config.quota.default_quota_bytes,
    )
    .await?;

    Ok(Json(FileNodeResponse::from(outcome.root)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/files/trash/{id}",
    tag = "Trash",
    operation_id = "purgeNode",
    summary = "Permanently delete a trashed file or folder",
    params(("id" = Uuid, Path, description = "Trashed node ID")),
    responses(
        (status = 200, description = "Deleted", body = LifecycleResponse),
        (status = 404, description = "Not in trash (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, node_id = %id))]
pub async fn purge_node(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LifecycleResponse>, AppError> {
    auth_user.require_permission("file:delete")?;

    let outcome = trash::permanent_delete(
        &state.db,
        auth_user.user_id,
        id,
        state.config.quota.default_quota_bytes,
    )
    .await?;

    Ok(Json(LifecycleResponse {
        id: outcome.root.id,
        nodes_affected: outcome.nodes_affected,
        total_bytes: outcome.total_bytes,
    }))
}
