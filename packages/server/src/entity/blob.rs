use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "blob")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// SHA-256 content hash (64 hex chars).
    ///
    /// Dedup identity is (content_hash, size); the composite unique
    /// index is created by `seed::ensure_indexes`, so concurrent first
    /// uploads of identical content cannot produce duplicate rows.
    pub content_hash: String,

    /// Size of the content in bytes.
    pub size: i64,

    /// MIME content type, when the uploader declared one.
    pub content_type: Option<String>,

    /// Object key within the storage backend.
    pub storage_path: String,

    /// Storage backend identifier (e.g. "s3").
    pub provider: String,

    pub created_at: DateTimeUtc,

    #[sea_orm(has_many)]
    pub nodes: HasMany<super::node::Entity>,
}

impl ActiveModelBehavior for ActiveModel {}
