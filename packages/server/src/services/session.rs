use chrono::{DateTime, Utc};
use common::kv::SessionStore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

const KEY_PREFIX: &str = "upload:";

/// Ephemeral state of an in-flight upload, persisted in the KV store
/// between protocol phases.
///
/// Each phase may be served by a different stateless process; this
/// record is what lets completion reconstruct the node/blob metadata
/// without the client re-sending it. Presence in the KV store is the
/// single source of truth for "upload in progress".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UploadSession {
    pub upload_id: String,
    pub owner_id: i32,
    /// Client-declared SHA-256, verified at completion.
    pub content_hash: String,
    /// Client-declared size in bytes, verified at completion.
    pub size: i64,
    pub content_type: Option<String>,
    /// Target filename in the tree.
    pub name: String,
    /// Target parent folder.
    pub parent_id: Option<Uuid>,
    /// Object key the client uploads to.
    pub key: String,
    pub multipart: bool,
    /// Backend multipart upload id (multipart flow only).
    pub backend_upload_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub fn session_key(upload_id: &str) -> String {
    format!("{KEY_PREFIX}{upload_id}")
}

/// Persist a session with the given TTL.
pub async fn save(
    kv: &dyn SessionStore,
    session: &UploadSession,
    ttl_secs: u64,
) -> Result<(), AppError> {
    let value = serde_json::to_string(session)
        .map_err(|e| AppError::Internal(format!("serialize upload session: {e}")))?;
    kv.put(&session_key(&session.upload_id), &value, ttl_secs)
        .await?;
    Ok(())
}

/// Load a session; absence (never created, expired, or already
/// committed) surfaces as `SessionExpired`.
pub async fn load(kv: &dyn SessionStore, upload_id: &str) -> Result<UploadSession, AppError> {
    let raw = kv
        .get(&session_key(upload_id))
        .await?
        .ok_or(AppError::SessionExpired)?;

    serde_json::from_str(&raw)
        .map_err(|e| AppError::Internal(format!("corrupt upload session: {e}")))
}

/// Drop a session (on commit or abort).
pub async fn remove(kv: &dyn SessionStore, upload_id: &str) -> Result<(), AppError> {
    kv.delete(&session_key(upload_id)).await?;
    Ok(())
}
