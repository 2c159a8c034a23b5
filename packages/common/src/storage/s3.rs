use std::collections::HashMap;

use async_trait::async_trait;
use http::HeaderMap;
use http::header::HeaderValue;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::serde_types::Part;
use s3::{Bucket, Region};

use super::error::StorageError;
use super::hash::ContentHash;
use super::traits::{CompletedPart, ObjectMeta, ObjectStore};

/// User-metadata key carrying the declared content hash. S3 exposes it
/// back (lowercased, without the `x-amz-meta-` prefix) on HEAD.
const SHA256_META_HEADER: &str = "x-amz-meta-content-sha256";
const SHA256_META_KEY: &str = "content-sha256";

/// Connection settings for an S3-compatible backend.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible stores (MinIO, R2, ...).
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Path-style addressing; required by MinIO.
    pub path_style: bool,
}

/// Object storage backed by an S3-compatible bucket.
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
}

impl S3ObjectStore {
    pub fn new(cfg: &S3Config) -> Result<Self, StorageError> {
        let region = match &cfg.endpoint {
            Some(endpoint) => Region::Custom {
                region: cfg.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => cfg
                .region
                .parse()
                .map_err(|_| StorageError::Backend(format!("invalid region: {}", cfg.region)))?,
        };

        let credentials = Credentials::new(
            cfg.access_key.as_deref(),
            cfg.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("credentials: {e}")))?;

        let mut bucket = Bucket::new(&cfg.bucket, region, credentials)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        if cfg.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self { bucket })
    }
}

fn map_s3_err(key: &str, err: S3Error) -> StorageError {
    match err {
        S3Error::HttpFailWithBody(404, _) => StorageError::NotFound(key.to_string()),
        other => StorageError::Backend(other.to_string()),
    }
}

/// Build a `Content-Disposition` value safe to embed in a presigned query.
fn disposition_value(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let name = if safe.is_empty() { "download" } else { &safe };
    format!("attachment; filename=\"{name}\"")
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn provider(&self) -> &'static str {
        "s3"
    }

    async fn put(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        self.bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(|e| map_s3_err(key, e))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let response = self
            .bucket
            .get_object(key)
            .await
            .map_err(|e| map_s3_err(key, e))?;
        Ok(response.bytes().to_vec())
    }

    async fn head(&self, key: &str) -> Result<ObjectMeta, StorageError> {
        let (head, status) = self
            .bucket
            .head_object(key)
            .await
            .map_err(|e| map_s3_err(key, e))?;
        if status == 404 {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let size = head
            .content_length
            .and_then(|n| u64::try_from(n).ok())
            .unwrap_or(0);
        let content_sha256 = head
            .metadata
            .as_ref()
            .and_then(|m| m.get(SHA256_META_KEY).cloned());

        Ok(ObjectMeta {
            size,
            e_tag: head.e_tag,
            content_sha256,
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        match self.bucket.delete_object(key).await {
            Ok(_) => Ok(()),
            Err(S3Error::HttpFailWithBody(404, _)) => Ok(()),
            Err(e) => Err(StorageError::Backend(e.to_string())),
        }
    }

    async fn presign_put(
        &self,
        key: &str,
        expires_secs: u32,
        content_sha256: Option<&ContentHash>,
    ) -> Result<String, StorageError> {
        let custom_headers = match content_sha256 {
            Some(hash) => {
                let mut headers = HeaderMap::new();
                let value = HeaderValue::from_str(&hash.to_hex())
                    .map_err(|e| StorageError::Backend(format!("metadata header: {e}")))?;
                headers.insert(SHA256_META_HEADER, value);
                Some(headers)
            }
            None => None,
        };

        self.bucket
            .presign_put(key, expires_secs, custom_headers, None)
            .await
            .map_err(|e| map_s3_err(key, e))
    }

    async fn presign_get(
        &self,
        key: &str,
        expires_secs: u32,
        filename: Option<&str>,
    ) -> Result<String, StorageError> {
        let custom_queries = filename.map(|name| {
            let mut queries = HashMap::new();
            queries.insert(
                "response-content-disposition".to_string(),
                disposition_value(name),
            );
            queries
        });

        self.bucket
            .presign_get(key, expires_secs, custom_queries)
            .await
            .map_err(|e| map_s3_err(key, e))
    }

    async fn create_multipart(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let response = self
            .bucket
            .initiate_multipart_upload(key, content_type)
            .await
            .map_err(|e| map_s3_err(key, e))?;
        Ok(response.upload_id)
    }

    async fn presign_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        expires_secs: u32,
    ) -> Result<String, StorageError> {
        let mut queries = HashMap::new();
        queries.insert("partNumber".to_string(), part_number.to_string());
        queries.insert("uploadId".to_string(), upload_id.to_string());

        self.bucket
            .presign_put(key, expires_secs, None, Some(queries))
            .await
            .map_err(|e| map_s3_err(key, e))
    }

    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[CompletedPart],
    ) -> Result<(), StorageError> {
        let parts: Vec<Part> = parts
            .iter()
            .map(|p| Part {
                part_number: p.part_number,
                etag: p.etag.clone(),
            })
            .collect();

        self.bucket
            .complete_multipart_upload(key, upload_id, parts)
            .await
            .map_err(|e| map_s3_err(key, e))?;
        Ok(())
    }

    async fn abort_multipart(&self, key: &str, upload_id: &str) -> Result<(), StorageError> {
        self.bucket
            .abort_upload(key, upload_id)
            .await
            .map_err(|e| map_s3_err(key, e))
    }
}
