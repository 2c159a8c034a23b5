use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use common::storage::{CompletedPart, ContentHash, StorageError};
use common::thumbnail::{self, ThumbnailJob};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::entity::{blob, node};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::files::FileNodeResponse;
use crate::models::upload::{
    CompleteUploadRequest, MultipartCreateResponse, PartSignQuery, PartSignResponse,
    SignedUploadResponse, UploadCheckResponse, UploadIntentRequest, UploadKeyQuery,
    validate_upload_intent,
};
use crate::services::quota::{self, UsageAction};
use crate::services::session::{self, UploadSession};
use crate::services::{content, tree};
use crate::state::AppState;
use crate::utils::filename::validate_node_name;

/// S3 caps multipart uploads at 10,000 parts.
const MAX_PART_NUMBER: u32 = 10_000;

pub fn upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(128 * 1024 * 1024) // 128 MB
}

/// Validate the declared intent shared by all upload entry points:
/// hash/size bounds, target name, parent folder, and quota pre-flight.
async fn validate_intent(
    state: &AppState,
    owner_id: i32,
    payload: &UploadIntentRequest,
) -> Result<(ContentHash, String), AppError> {
    let hash = validate_upload_intent(
        &payload.hash,
        payload.size,
        state.config.storage.max_blob_size,
    )?;
    let name = validate_node_name(&payload.name)
        .map_err(|e| AppError::Validation(e.message().into()))?
        .to_string();

    tree::assert_parent_folder(&state.db, payload.parent_id, owner_id).await?;

    // Pre-flight only; not re-checked at commit (a long upload can
    // finish even if other activity has consumed the headroom since).
    quota::check_capacity(
        &state.db,
        owner_id,
        payload.size,
        state.config.quota.default_quota_bytes,
    )
    .await?;

    Ok((hash, name))
}

/// Commit an upload: upsert the blob row, link the tree node, record
/// the ledger entry, and enqueue a thumbnail job for images.
#[allow(clippy::too_many_arguments)]
async fn commit_file(
    state: &AppState,
    owner_id: i32,
    hash: &ContentHash,
    size: i64,
    content_type: Option<String>,
    name: &str,
    parent_id: Option<Uuid>,
    dedup: bool,
) -> Result<node::Model, AppError> {
    let stored = content::get_or_create_blob(
        &state.db,
        hash,
        size,
        content_type,
        state.store.provider(),
    )
    .await?;

    let created = tree::create_file(&state.db, owner_id, &stored, name, parent_id).await?;

    quota::apply(
        &state.db,
        owner_id,
        UsageAction::Upload,
        Some(stored.id),
        size,
        serde_json::json!({ "node_id": created.id, "name": created.name, "dedup": dedup }),
        state.config.quota.default_quota_bytes,
    )
    .await?;

    enqueue_thumbnail(state, &stored, owner_id).await;

    Ok(created)
}

/// Fire-and-forget thumbnail job for image uploads.
async fn enqueue_thumbnail(state: &AppState, stored: &blob::Model, owner_id: i32) {
    let Some(ref mq) = state.mq else {
        debug!("MQ unavailable, skipping thumbnail enqueue");
        return;
    };
    let Some(content_type) = stored.content_type.clone() else {
        return;
    };
    if !thumbnail::is_image(&content_type) {
        return;
    }

    let job = ThumbnailJob::new(stored.id, owner_id, content_type);
    match mq
        .publish(&state.config.mq.thumbnail_queue, None, &job, None)
        .await
    {
        Ok(_) => {
            info!(job_id = %job.job_id, blob_id = %stored.id, "Thumbnail job enqueued");
        }
        Err(e) => {
            warn!(error = %e, "Failed to enqueue thumbnail job");
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/upload/check",
    tag = "Upload",
    operation_id = "checkUpload",
    summary = "Dedup pre-check",
    description = "Checks whether content with the declared (hash, size) is already \
        stored. On a hit a new node is linked to the existing blob and no bytes need \
        to travel; the response carries the created node. On a miss the client \
        proceeds to a signed flow.",
    request_body = UploadIntentRequest,
    responses(
        (status = 200, description = "Check result", body = UploadCheckResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Name collision (CONFLICT)", body = ErrorBody),
        (status = 413, description = "Quota exceeded (QUOTA_EXCEEDED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn check_upload(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UploadIntentRequest>,
) -> Result<Json<UploadCheckResponse>, AppError> {
    auth_user.require_permission("file:write")?;

    let (hash, name) = validate_intent(&state, auth_user.user_id, &payload).await?;

    match content::find_blob(&state.db, &hash, payload.size).await? {
        Some(existing) => {
            let linked =
                tree::create_file(&state.db, auth_user.user_id, &existing, &name, payload.parent_id)
                    .await?;

            quota::apply(
                &state.db,
                auth_user.user_id,
                UsageAction::Upload,
                Some(existing.id),
                existing.size,
                serde_json::json!({ "node_id": linked.id, "name": linked.name, "dedup": true }),
                state.config.quota.default_quota_bytes,
            )
            .await?;

            enqueue_thumbnail(&state, &existing, auth_user.user_id).await;

            Ok(Json(UploadCheckResponse {
                exists: true,
                data: Some(FileNodeResponse::from(linked)),
            }))
        }
        None => Ok(Json(UploadCheckResponse {
            exists: false,
            data: None,
        })),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/upload/signed",
    tag = "Upload",
    operation_id = "signedUpload",
    summary = "Request a single-PUT presigned URL",
    description = "Creates a 1-hour upload session and returns a presigned PUT URL. \
        The URL pins the declared content hash as signed metadata, so completion can \
        verify what the client actually uploaded.",
    request_body = UploadIntentRequest,
    responses(
        (status = 200, description = "Presigned URL issued", body = SignedUploadResponse),
        (status = 413, description = "Quota exceeded (QUOTA_EXCEEDED)", body = ErrorBody),
        (status = 502, description = "Backend signing failure (STORAGE_BACKEND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn signed_upload(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UploadIntentRequest>,
) -> Result<Json<SignedUploadResponse>, AppError> {
    auth_user.require_permission("file:write")?;

    let (hash, name) = validate_intent(&state, auth_user.user_id, &payload).await?;
    let ttl = state.config.storage.signed_url_ttl_secs;

    let upload_id = Uuid::new_v4().to_string();
    let key = hash.object_key();

    let url = state.store.presign_put(&key, ttl, Some(&hash)).await?;

    let upload = UploadSession {
        upload_id: upload_id.clone(),
        owner_id: auth_user.user_id,
        content_hash: hash.to_hex(),
        size: payload.size,
        content_type: payload.content_type.clone(),
        name,
        parent_id: payload.parent_id,
        key: key.clone(),
        multipart: false,
        backend_upload_id: None,
        created_at: Utc::now(),
    };
    session::save(&*state.sessions, &upload, ttl as u64).await?;

    Ok(Json(SignedUploadResponse {
        upload_id,
        key,
        url,
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/upload/multipart/signed",
    tag = "Upload",
    operation_id = "createMultipartUpload",
    summary = "Create a multipart upload session",
    description = "Starts a backend multipart upload and a 24-hour upload session. \
        Sign individual parts with the GET endpoint, then finalize with complete.",
    request_body = UploadIntentRequest,
    responses(
        (status = 200, description = "Multipart session created", body = MultipartCreateResponse),
        (status = 413, description = "Quota exceeded (QUOTA_EXCEEDED)", body = ErrorBody),
        (status = 502, description = "Backend failure (STORAGE_BACKEND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(user_id = auth_user.user_id))]
pub async fn create_multipart_upload(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UploadIntentRequest>,
) -> Result<Json<MultipartCreateResponse>, AppError> {
    auth_user.require_permission("file:write")?;

    let (hash, name) = validate_intent(&state, auth_user.user_id, &payload).await?;

    let upload_id = Uuid::new_v4().to_string();
    let key = hash.object_key();
    let content_type = payload
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let backend_upload_id = state.store.create_multipart(&key, &content_type).await?;

    let upload = UploadSession {
        upload_id: upload_id.clone(),
        owner_id: auth_user.user_id,
        content_hash: hash.to_hex(),
        size: payload.size,
        content_type: payload.content_type.clone(),
        name,
        parent_id: payload.parent_id,
        key: key.clone(),
        multipart: true,
        backend_upload_id: Some(backend_upload_id),
        created_at: Utc::now(),
    };
    session::save(
        &*state.sessions,
        &upload,
        state.config.storage.multipart_ttl_secs as u64,
    )
    .await?;

    Ok(Json(MultipartCreateResponse { upload_id, key }))
}

/// Load a session and verify the caller owns it and the key matches.
async fn load_owned_session(
    state: &AppState,
    upload_id: &str,
    owner_id: i32,
    key: &str,
) -> Result<UploadSession, AppError> {
    let upload = session::load(&*state.sessions, upload_id).await?;
    if upload.owner_id != owner_id {
        return Err(AppError::NotFound("Upload session not found".into()));
    }
    if upload.key != key {
        return Err(AppError::Validation(
            "Key does not match the upload session".into(),
        ));
    }
    Ok(upload)
}

#[utoipa::path(
    get,
    path = "/api/v1/upload/multipart/{upload_id}",
    tag = "Upload",
    operation_id = "signPart",
    summary = "Presign one part of a multipart upload",
    params(
        ("upload_id" = String, Path, description = "Upload session ID"),
        ("key" = String, Query, description = "Object key from session creation"),
        ("part_number" = u32, Query, description = "1-based part number"),
    ),
    responses(
        (status = 200, description = "Part URL issued", body = PartSignResponse),
        (status = 410, description = "Session expired (SESSION_EXPIRED)", body = ErrorBody),
        (status = 502, description = "Backend signing failure (STORAGE_BACKEND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id, upload_id = %upload_id))]
pub async fn sign_part(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
    Query(query): Query<PartSignQuery>,
) -> Result<Json<PartSignResponse>, AppError> {
    auth_user.require_permission("file:write")?;

    if query.part_number == 0 || query.part_number > MAX_PART_NUMBER {
        return Err(AppError::Validation(format!(
            "Part number must be between 1 and {MAX_PART_NUMBER}"
        )));
    }

    let upload = load_owned_session(&state, &upload_id, auth_user.user_id, &query.key).await?;
    if !upload.multipart {
        return Err(AppError::Validation(
            "Not a multipart upload session".into(),
        ));
    }
    let backend_id = upload
        .backend_upload_id
        .as_deref()
        .ok_or_else(|| AppError::Internal("multipart session has no backend id".into()))?;

    let url = state
        .store
        .presign_part(
            &upload.key,
            backend_id,
            query.part_number,
            state.config.storage.signed_url_ttl_secs,
        )
        .await?;

    Ok(Json(PartSignResponse {
        url,
        part_number: query.part_number,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/v1/upload/multipart/{upload_id}",
    tag = "Upload",
    operation_id = "abortMultipartUpload",
    summary = "Abort a multipart upload",
    description = "Discards the backend multipart state and the upload session. \
        Sessions that are never aborted simply expire.",
    params(
        ("upload_id" = String, Path, description = "Upload session ID"),
        ("key" = String, Query, description = "Object key from session creation"),
    ),
    responses(
        (status = 204, description = "Aborted"),
        (status = 410, description = "Session expired (SESSION_EXPIRED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query), fields(user_id = auth_user.user_id, upload_id = %upload_id))]
pub async fn abort_multipart_upload(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
    Query(query): Query<UploadKeyQuery>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("file:write")?;

    let upload = load_owned_session(&state, &upload_id, auth_user.user_id, &query.key).await?;

    if let Some(backend_id) = upload.backend_upload_id.as_deref() {
        state.store.abort_multipart(&upload.key, backend_id).await?;
    }
    session::remove(&*state.sessions, &upload_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/upload/{upload_id}/complete",
    tag = "Upload",
    operation_id = "completeUpload",
    summary = "Finalize an upload",
    description = "For multipart sessions, assembles the reported parts at the backend \
        first. Then verifies the backend-reported size (and content hash, when the \
        backend attests to it) against the session; divergence aborts the commit with \
        CONFLICT and the uploaded bytes are orphaned. On success the blob row is \
        upserted, the node created, the ledger entry recorded, and the session dropped.",
    params(
        ("upload_id" = String, Path, description = "Upload session ID"),
        ("key" = String, Query, description = "Object key from session creation"),
    ),
    request_body = CompleteUploadRequest,
    responses(
        (status = 201, description = "Upload committed", body = FileNodeResponse),
        (status = 409, description = "Integrity or name conflict (CONFLICT)", body = ErrorBody),
        (status = 410, description = "Session expired (SESSION_EXPIRED)", body = ErrorBody),
        (status = 413, description = "Quota exceeded (QUOTA_EXCEEDED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query, payload), fields(user_id = auth_user.user_id, upload_id = %upload_id))]
pub async fn complete_upload(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(upload_id): Path<String>,
    Query(query): Query<UploadKeyQuery>,
    AppJson(payload): AppJson<CompleteUploadRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("file:write")?;

    let upload = load_owned_session(&state, &upload_id, auth_user.user_id, &query.key).await?;

    let expected_hash = ContentHash::from_hex(&upload.content_hash)
        .map_err(|e| AppError::Internal(format!("corrupt session hash: {e}")))?;

    if upload.multipart {
        let backend_id = upload
            .backend_upload_id
            .as_deref()
            .ok_or_else(|| AppError::Internal("multipart session has no backend id".into()))?;
        if payload.parts.is_empty() {
            return Err(AppError::Validation(
                "Parts are required to complete a multipart upload".into(),
            ));
        }

        let parts: Vec<CompletedPart> = payload
            .parts
            .iter()
            .map(|p| CompletedPart {
                part_number: p.part_number,
                etag: p.etag.clone(),
            })
            .collect();

        state
            .store
            .complete_multipart(&upload.key, backend_id, &parts)
            .await?;
    }

    // Integrity check against what the backend actually holds.
    let meta = state.store.head(&upload.key).await.map_err(|e| match e {
        StorageError::NotFound(_) => {
            AppError::Conflict("No uploaded object found for this session".into())
        }
        other => AppError::from(other),
    })?;

    if meta.size != upload.size as u64 {
        return Err(AppError::Conflict(format!(
            "Uploaded size {} does not match declared size {}",
            meta.size, upload.size
        )));
    }
    if let Some(reported) = &meta.content_sha256
        && !reported.eq_ignore_ascii_case(&upload.content_hash)
    {
        return Err(AppError::Conflict(
            "Uploaded content hash does not match declared hash".into(),
        ));
    }

    let created = commit_file(
        &state,
        auth_user.user_id,
        &expected_hash,
        upload.size,
        upload.content_type.clone(),
        &upload.name,
        upload.parent_id,
        false,
    )
    .await?;

    session::remove(&*state.sessions, &upload_id).await?;

    Ok((StatusCode::CREATED, Json(FileNodeResponse::from(created))))
}

#[utoipa::path(
    put,
    path = "/api/v1/upload",
    tag = "Upload",
    operation_id = "singleShotUpload",
    summary = "Single-shot upload",
    description = "multipart/form-data upload routed through the server. The `file` \
        field is required; an optional `parent_id` field targets a folder. The content \
        hash is computed server-side from the bytes, dedup applies as usual.",
    request_body(content_type = "multipart/form-data", description = "File plus optional parent_id"),
    responses(
        (status = 201, description = "Upload committed", body = FileNodeResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 409, description = "Name collision (CONFLICT)", body = ErrorBody),
        (status = 413, description = "Quota exceeded (QUOTA_EXCEEDED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(user_id = auth_user.user_id))]
pub async fn single_shot_upload(
    auth_user: AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("file:write")?;

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut parent_id: Option<Uuid> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| {
                        AppError::Validation("File field must have a filename".into())
                    })?;
                let data =
                    read_field_limited(field, state.config.storage.max_blob_size).await?;
                file = Some((filename, data));
            }
            Some("parent_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read parent_id: {e}")))?;
                let text = text.trim();
                if !text.is_empty() {
                    parent_id = Some(
                        Uuid::parse_str(text)
                            .map_err(|_| AppError::Validation("Invalid parent_id".into()))?,
                    );
                }
            }
            _ => {} // Ignore unknown fields.
        }
    }

    let (filename, data) =
        file.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;
    let name = validate_node_name(&filename)
        .map_err(|e| AppError::Validation(e.message().into()))?
        .to_string();

    if data.is_empty() {
        return Err(AppError::Validation("File is empty".into()));
    }
    let size = data.len() as i64;

    tree::assert_parent_folder(&state.db, parent_id, auth_user.user_id).await?;
    quota::check_capacity(
        &state.db,
        auth_user.user_id,
        size,
        state.config.quota.default_quota_bytes,
    )
    .await?;

    let hash = ContentHash::compute(&data);
    let content_type = mime_guess::from_path(&name)
        .first()
        .map(|m| m.to_string());

    let dedup = content::find_blob(&state.db, &hash, size).await?.is_some();
    if !dedup {
        state
            .store
            .put(
                &hash.object_key(),
                &data,
                content_type.as_deref().unwrap_or("application/octet-stream"),
            )
            .await?;
    }

    let created = commit_file(
        &state,
        auth_user.user_id,
        &hash,
        size,
        content_type,
        &name,
        parent_id,
        dedup,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(FileNodeResponse::from(created))))
}

/// Drain a multipart field into memory, enforcing the size cap.
async fn read_field_limited(
    mut field: axum::extract::multipart::Field<'_>,
    max_size: u64,
) -> Result<Vec<u8>, AppError> {
    let mut data = Vec::new();

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
    {
        if (data.len() + chunk.len()) as u64 > max_size {
            return Err(AppError::Validation(format!(
                "File exceeds maximum size of {max_size} bytes"
            )));
        }
        data.extend_from_slice(&chunk);
    }

    Ok(data)
}
