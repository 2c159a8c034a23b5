use std::sync::Arc;

use common::kv::SessionStore;
use common::mq::Mq;
use common::storage::ObjectStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    /// Object-storage backend; bulk bytes flow client → backend via
    /// presigned URLs, not through this process.
    pub store: Arc<dyn ObjectStore>,
    /// KV store holding ephemeral upload sessions.
    pub sessions: Arc<dyn SessionStore>,
    /// Thumbnail job queue; `None` when MQ is disabled.
    pub mq: Option<Arc<Mq>>,
}
