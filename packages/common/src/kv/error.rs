use thiserror::Error;

/// Errors from the key/value session store.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("session store backend error: {0}")]
    Backend(String),
}

impl From<::redis::RedisError> for KvError {
    fn from(err: ::redis::RedisError) -> Self {
        Self::Backend(err.to_string())
    }
}
