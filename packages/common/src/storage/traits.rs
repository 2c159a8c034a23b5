use async_trait::async_trait;

use super::error::StorageError;
use super::hash::ContentHash;

/// Metadata reported by the backend for a stored object.
#[derive(Debug, Clone)]
pub struct ObjectMeta {
    /// Object size in bytes as reported by the backend.
    pub size: u64,
    /// Backend entity tag, when available.
    pub e_tag: Option<String>,
    /// SHA-256 hex digest reported by the backend (user metadata for S3,
    /// computed on the fly by the in-memory store). `None` when the
    /// backend cannot attest to it.
    pub content_sha256: Option<String>,
}

/// One finished part of a multipart upload, as reported by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    pub part_number: u32,
    pub etag: String,
}

/// S3-compatible object storage.
///
/// Bulk byte transfers are expected to bypass the application: clients
/// receive presigned URLs and talk to the backend directly. The server
/// itself only uses `put`/`get` for the single-shot upload path and for
/// tests.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Identifier recorded on blob rows (e.g. "s3", "memory").
    fn provider(&self) -> &'static str;

    /// Store bytes under the given key.
    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// Fetch all bytes for a key.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Fetch backend metadata for a key.
    async fn head(&self, key: &str) -> Result<ObjectMeta, StorageError>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Presign a single-object PUT URL.
    ///
    /// When `content_sha256` is given it is pinned as a signed
    /// `x-amz-meta-content-sha256` header, so the client cannot complete
    /// the PUT without echoing the hash it originally declared.
    async fn presign_put(
        &self,
        key: &str,
        expires_secs: u32,
        content_sha256: Option<&ContentHash>,
    ) -> Result<String, StorageError>;

    /// Presign a GET URL, optionally forcing a download filename via
    /// `response-content-disposition`.
    async fn presign_get(
        &self,
        key: &str,
        expires_secs: u32,
        filename: Option<&str>,
    ) -> Result<String, StorageError>;

    /// Start a multipart upload; returns the backend upload id.
    async fn create_multipart(&self, key: &str, content_type: &str)
    -> Result<String, StorageError>;

    /// Presign the PUT URL for one part of a multipart upload.
    async fn presign_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        expires_secs: u32,
    ) -> Result<String, StorageError>;

    /// Assemble a multipart upload from the client-reported parts.
    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<(), StorageError>;

    /// Abort a multipart upload, discarding any uploaded parts.
    async fn abort_multipart(&self, key: &str, upload_id: &str) -> Result<(), StorageError>;
}
