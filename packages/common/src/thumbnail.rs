use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A thumbnail job message published to the worker queue after an image
/// upload commits. Publishing is fire-and-forget; the worker owns
/// rendering and failure handling.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ThumbnailJob {
    /// Job identifier (UUID).
    pub job_id: String,
    /// Blob to render a thumbnail for.
    pub blob_id: Uuid,
    /// Owner of the uploaded file.
    pub owner_id: i32,
    /// MIME type of the source image.
    pub content_type: String,
}

impl ThumbnailJob {
    /// Create a new thumbnail job with a generated UUID.
    pub fn new(blob_id: Uuid, owner_id: i32, content_type: String) -> Self {
        Self {
            job_id: Uuid::new_v4().to_string(),
            blob_id,
            owner_id,
            content_type,
        }
    }
}

/// Whether a MIME type should trigger thumbnail generation.
pub fn is_image(content_type: &str) -> bool {
    content_type.starts_with("image/")
}
