use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect};
use sea_orm::EntityTrait;
use tracing::instrument;
use uuid::Uuid;

use crate::entity::blob;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::files::{
    BreadcrumbsResponse, CreateFolderRequest, FileListQuery, FileListResponse, FileNodeResponse,
    LifecycleResponse, NodeIdRequest, RenameRequest,
};
use crate::services::quota::{self, UsageAction};
use crate::services::{trash, tree};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/files",
    tag = "Files",
    operation_id = "listFiles",
    summary = "List the active children of a folder",
    description = "Lists the contents of `parent_id`, or of the root when omitted. \
        Trashed nodes are invisible here.",
    params(("parent_id" = Option<Uuid>, Query, description = "Folder to list; omit for the root")),
    responses(
        (status = 200, description = "Folder contents", body = FileListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Parent folder not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id))]
pub async fn list_files(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<FileListQuery>,
) -> Result<Json<FileListResponse>, AppError> {
    auth_user.require_permission("file:read")?;

    if query.parent_id.is_some() {
        tree::assert_parent_folder(&state.db, query.parent_id, auth_user.user_id).await?;
    }

    let children = tree::list_children(&state.db, auth_user.user_id, query.parent_id).await?;

    Ok(Json(FileListResponse {
        total: children.len() as u64,
        data: children.into_iter().map(FileNodeResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/files/{id}",
    tag = "Files",
    operation_id = "getFile",
    summary = "Fetch a single file or folder",
    params(("id" = Uuid, Path, description = "Node ID")),
    responses(
        (status = 200, description = "Node info", body = FileNodeResponse),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, node_id = %id))]
pub async fn get_file(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FileNodeResponse>, AppError> {
    auth_user.require_permission("file:read")?;

    let found = tree::find_active_node(&state.db, id, auth_user.user_id).await?;
    Ok(Json(FileNodeResponse::from(found)))
}

#[utoipa::path(
    post,
    path = "/api/v1/files/folder/create",
    tag = "Files",
    operation_id = "createFolder",
    summary = "Create a folder",
    description = "Creates a folder under `parent_id` (or the root). Fails with CONFLICT \
        when an active folder of the same name already exists there. Folders are free: \
        the ledger records a zero-size entry and usage is unchanged.",
    request_body = CreateFolderRequest,
    responses(
        (status = 201, description = "Folder created", body = FileNodeResponse),
        (status = 404, description = "Parent folder not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Name collision (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_folder(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateFolderRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("file:write")?;

    let folder =
        tree::create_folder(&state.db, auth_user.user_id, &payload.name, payload.parent_id).await?;

    quota::apply(
        &state.db,
        auth_user.user_id,
        UsageAction::CreateFolder,
        None,
        0,
        serde_json::json!({ "node_id": folder.id, "name": folder.name }),
        state.config.quota.default_quota_bytes,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(FileNodeResponse::from(folder))))
}

#[utoipa::path(
    post,
    path = "/api/v1/files/rename",
    tag = "Files",
    operation_id = "renameNode",
    summary = "Rename a file or folder",
    request_body = RenameRequest,
    responses(
        (status = 200, description = "Renamed", body = FileNodeResponse),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "Name collision (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, node_id = %payload.id))]
pub async fn rename_node(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<RenameRequest>,
) -> Result<Json<FileNodeResponse>, AppError> {
    auth_user.require_permission("file:write")?;

    let renamed = tree::rename(&state.db, payload.id, auth_user.user_id, &payload.name).await?;
    Ok(Json(FileNodeResponse::from(renamed)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/files/delete",
    tag = "Files",
    operation_id = "deleteNode",
    summary = "Move a file or folder to the trash",
    description = "Soft delete. For folders the whole subtree is stamped in one operation. \
        Usage is unchanged; trashed content still counts against quota.",
    request_body = NodeIdRequest,
    responses(
        (status = 200, description = "Trashed", body = LifecycleResponse),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, node_id = %payload.id))]
pub async fn delete_node(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<NodeIdRequest>,
) -> Result<Json<LifecycleResponse>, AppError> {
    auth_user.require_permission("file:delete")?;

    let outcome = trash::soft_delete(
        &state.db,
        auth_user.user_id,
        payload.id,
        state.config.quota.default_quota_bytes,
    )
    .await?;

    Ok(Json(LifecycleResponse {
        id: outcome.root.id,
        nodes_affected: outcome.nodes_affected,
        total_bytes: outcome.total_bytes,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/files/permanent-delete",
    tag = "Files",
    operation_id = "permanentDeleteNode",
    summary = "Permanently delete a trashed file or folder",
    description = "The node must already be in the trash. The only operation that \
        reduces `used_bytes`. Blob content is retained (no GC).",
    request_body = NodeIdRequest,
    responses(
        (status = 200, description = "Deleted", body = LifecycleResponse),
        (status = 404, description = "Not found or not in trash (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id, node_id = %payload.id))]
pub async fn permanent_delete_node(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<NodeIdRequest>,
) -> Result<Json<LifecycleResponse>, AppError> {
    auth_user.require_permission("file:delete")?;

    let outcome = trash::permanent_delete(
        &state.db,
        auth_user.user_id,
        payload.id,
        state.config.quota.default_quota_bytes,
    )
    .await?;

    Ok(Json(LifecycleResponse {
        id: outcome.root.id,
        nodes_affected: outcome.nodes_affected,
        total_bytes: outcome.total_bytes,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/files/breadcrumbs/{parent_id}",
    tag = "Files",
    operation_id = "breadcrumbs",
    summary = "Breadcrumb chain from the root to a folder",
    params(("parent_id" = Uuid, Path, description = "Node to build the chain for")),
    responses(
        (status = 200, description = "Breadcrumbs, root first", body = BreadcrumbsResponse),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, node_id = %parent_id))]
pub async fn breadcrumbs(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(parent_id): Path<Uuid>,
) -> Result<Json<BreadcrumbsResponse>, AppError> {
    auth_user.require_permission("file:read")?;

    let chain = tree::breadcrumbs(&state.db, parent_id, auth_user.user_id).await?;
    Ok(Json(BreadcrumbsResponse {
        breadcrumbs: chain.into_iter().map(Into::into).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/files/{id}/download",
    tag = "Files",
    operation_id = "downloadFile",
    summary = "Download a file",
    description = "Responds with a 307 redirect to a time-limited presigned GET URL; \
        the bytes flow directly from the object store to the client.",
    params(("id" = Uuid, Path, description = "File node ID")),
    responses(
        (status = 307, description = "Redirect to presigned URL"),
        (status = 400, description = "Node is a folder (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "Not found (NOT_FOUND)", body = ErrorBody),
        (status = 502, description = "Backend signing failure (STORAGE_BACKEND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id, node_id = %id))]
pub async fn download(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Redirect, AppError> {
    auth_user.require_permission("file:read")?;

    let found = tree::find_active_node(&state.db, id, auth_user.user_id).await?;
    if found.is_dir {
        return Err(AppError::Validation("Folders cannot be downloaded".into()));
    }

    let blob_id = found
        .blob_id
        .ok_or_else(|| AppError::Internal(format!("file node {} has no blob", found.id)))?;
    let stored = blob::Entity::find_by_id(blob_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal(format!("blob row {blob_id} missing")))?;

    let url = state
        .store
        .presign_get(
            &stored.storage_path,
            state.config.storage.download_ttl_secs,
            Some(&found.name),
        )
        .await?;

    Ok(Redirect::temporary(&url))
}
