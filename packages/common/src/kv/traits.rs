use async_trait::async_trait;

use super::error::KvError;

/// Key/value store with per-entry expiry.
///
/// The durable bridge between stateless request handlers during
/// multi-step uploads: entry presence is the single source of truth for
/// "upload in progress", and expiry is the only cancellation mechanism.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a value under `key`, expiring after `ttl_secs`.
    async fn put(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), KvError>;

    /// Fetch a value; `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Remove a key. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), KvError>;
}
