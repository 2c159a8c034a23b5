use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use super::error::StorageError;
use super::hash::ContentHash;
use super::traits::{CompletedPart, ObjectMeta, ObjectStore};

struct StoredObject {
    data: Vec<u8>,
    content_type: String,
}

struct PartData {
    etag: String,
    data: Vec<u8>,
}

struct MultipartUpload {
    key: String,
    content_type: String,
    parts: BTreeMap<u32, PartData>,
}

/// In-memory object store used by tests and local development.
///
/// Presigned URLs use a synthetic `memory://` scheme; tests play the
/// client's role through [`MemoryObjectStore::client_put`] and
/// [`MemoryObjectStore::client_put_part`] instead of issuing real HTTP
/// PUTs. `head` computes the SHA-256 of the stored bytes, so hash
/// verification at upload completion is exercised for real.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, StoredObject>,
    uploads: DashMap<String, MultipartUpload>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the client uploading bytes to a presigned PUT URL.
    pub fn client_put(&self, key: &str, data: &[u8]) {
        self.objects.insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: "application/octet-stream".to_string(),
            },
        );
    }

    /// Simulate the client uploading one part to a presigned part URL.
    /// Returns the part's etag, which the client reports at completion.
    pub fn client_put_part(
        &self,
        upload_id: &str,
        part_number: u32,
        data: &[u8],
    ) -> Result<String, StorageError> {
        let mut upload = self
            .uploads
            .get_mut(upload_id)
            .ok_or_else(|| StorageError::NotFound(format!("upload {upload_id}")))?;

        let etag = ContentHash::compute(data).to_hex();
        upload.parts.insert(
            part_number,
            PartData {
                etag: etag.clone(),
                data: data.to_vec(),
            },
        );
        Ok(etag)
    }

    /// Number of stored objects; used by tests asserting dedup.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn provider(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        self.objects.insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .get(key)
            .map(|obj| obj.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn head(&self, key: &str) -> Result<ObjectMeta, StorageError> {
        let obj = self
            .objects
            .get(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        let sha256 = ContentHash::compute(&obj.data).to_hex();
        Ok(ObjectMeta {
            size: obj.data.len() as u64,
            e_tag: Some(format!("\"{sha256}\"")),
            content_sha256: Some(sha256),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.objects.remove(key);
        Ok(())
    }

    async fn presign_put(
        &self,
        key: &str,
        expires_secs: u32,
        _content_sha256: Option<&ContentHash>,
    ) -> Result<String, StorageError> {
        Ok(format!("memory://{key}?X-Amz-Expires={expires_secs}"))
    }

    async fn presign_get(
        &self,
        key: &str,
        expires_secs: u32,
        _filename: Option<&str>,
    ) -> Result<String, StorageError> {
        if !self.objects.contains_key(key) {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(format!("memory://{key}?X-Amz-Expires={expires_secs}"))
    }

    async fn create_multipart(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let upload_id = Uuid::new_v4().to_string();
        self.uploads.insert(
            upload_id.clone(),
            MultipartUpload {
                key: key.to_string(),
                content_type: content_type.to_string(),
                parts: BTreeMap::new(),
            },
        );
        Ok(upload_id)
    }

    async fn presign_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        expires_secs: u32,
    ) -> Result<String, StorageError> {
        if !self.uploads.contains_key(upload_id) {
            return Err(StorageError::NotFound(format!("upload {upload_id}")));
        }
        Ok(format!(
            "memory://{key}?uploadId={upload_id}&partNumber={part_number}&X-Amz-Expires={expires_secs}"
        ))
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<(), StorageError> {
        let (_, upload) = self
            .uploads
            .remove(upload_id)
            .ok_or_else(|| StorageError::NotFound(format!("upload {upload_id}")))?;

        if upload.key != key {
            return Err(StorageError::Backend(format!(
                "upload {upload_id} does not belong to key {key}"
            )));
        }
        if parts.is_empty() {
            return Err(StorageError::Backend("no parts to assemble".into()));
        }

        let mut data = Vec::new();
        for reported in parts {
            let stored = upload.parts.get(&reported.part_number).ok_or_else(|| {
                StorageError::Backend(format!("part {} was never uploaded", reported.part_number))
            })?;
            if stored.etag != reported.etag {
                return Err(StorageError::Backend(format!(
                    "etag mismatch on part {}",
                    reported.part_number
                )));
            }
            data.extend_from_slice(&stored.data);
        }

        self.objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: upload.content_type,
            },
        );
        Ok(())
    }

    async fn abort_multipart(&self, _key: &str, upload_id: &str) -> Result<(), StorageError> {
        self.uploads.remove(upload_id);
        Ok(())
    }
}
