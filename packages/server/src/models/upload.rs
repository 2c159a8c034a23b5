use common::storage::ContentHash;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::files::FileNodeResponse;
use crate::error::AppError;

/// Declared metadata of an upload; shared by the dedup pre-check and
/// both signed-URL flows.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct UploadIntentRequest {
    /// Client-computed SHA-256 of the content (64 hex chars).
    #[schema(example = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08")]
    pub hash: String,
    /// Content size in bytes.
    #[schema(example = 142857)]
    pub size: i64,
    /// MIME type declared by the client.
    #[serde(rename = "type")]
    #[schema(example = "image/png")]
    pub content_type: Option<String>,
    /// Target filename.
    #[schema(example = "photo.png")]
    pub name: String,
    /// Target parent folder; `null` for the root.
    pub parent_id: Option<Uuid>,
}

/// Validate the declared hash and size of an upload intent.
pub fn validate_upload_intent(
    hash: &str,
    size: i64,
    max_blob_size: u64,
) -> Result<ContentHash, AppError> {
    if size <= 0 {
        return Err(AppError::Validation("Size must be positive".into()));
    }
    if size as u64 > max_blob_size {
        return Err(AppError::Validation(format!(
            "File exceeds maximum size of {max_blob_size} bytes"
        )));
    }
    Ok(ContentHash::from_hex(hash)?)
}

/// Response of the dedup pre-check. `exists == true` means the content
/// was already stored: a node was linked and no bytes need to travel.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadCheckResponse {
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<FileNodeResponse>,
}

/// Response of the single-PUT signed flow.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SignedUploadResponse {
    /// Upload session ID; pass to the completion endpoint.
    pub upload_id: String,
    /// Object key the presigned URL writes to.
    pub key: String,
    /// Presigned PUT URL; upload the bytes directly to the backend.
    pub url: String,
}

/// Response of multipart session creation.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MultipartCreateResponse {
    pub upload_id: String,
    pub key: String,
}

/// Query parameters when signing one part.
#[derive(Deserialize)]
pub struct PartSignQuery {
    pub key: String,
    pub part_number: u32,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct PartSignResponse {
    pub url: String,
    pub part_number: u32,
}

/// Query parameter carried by the completion and abort endpoints.
#[derive(Deserialize)]
pub struct UploadKeyQuery {
    pub key: String,
}

/// One client-uploaded part, echoed back at completion.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CompletedPartDto {
    #[serde(rename = "ETag", alias = "etag")]
    pub etag: String,
    #[serde(rename = "PartNumber", alias = "part_number")]
    pub part_number: u32,
}

/// Request body for upload completion. `parts` is required for the
/// multipart flow and ignored for the single-PUT flow.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CompleteUploadRequest {
    #[serde(default)]
    pub parts: Vec<CompletedPartDto>,
}
