pub mod config;
pub mod kv;
pub mod mq;
pub mod storage;
pub mod thumbnail;

pub use storage::{ContentHash, ObjectStore, StorageError};
