use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::error::KvError;
use super::traits::SessionStore;

/// In-memory session store for tests and local development.
///
/// Expiry is evaluated lazily on read; a `ttl_secs` of 0 expires the
/// entry immediately, which tests use to simulate TTL lapse.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: DashMap<String, (String, Instant)>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, key: &str, value: &str, ttl_secs: u64) -> Result<(), KvError> {
        let deadline = Instant::now() + Duration::from_secs(ttl_secs);
        self.entries
            .insert(key.to_string(), (value.to_string(), deadline));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let expired = match self.entries.get(key) {
            Some(entry) => {
                if Instant::now() < entry.1 {
                    return Ok(Some(entry.0.clone()));
                }
                true
            }
            None => false,
        };

        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.entries.remove(key);
        Ok(())
    }
}
