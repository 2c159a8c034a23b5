use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "storage_account")]
pub struct Model {
    /// Owning user; one account per owner, created lazily on first use.
    #[sea_orm(primary_key, auto_increment = false)]
    pub owner_id: i32,

    /// Capacity in bytes.
    pub quota_bytes: i64,

    /// Running usage total. Maintained exclusively by the quota
    /// ledger's `apply`; never recomputed from node state, so it can
    /// drift from ground truth under concurrent requests.
    pub used_bytes: i64,

    /// Account status (e.g. "active").
    pub status: String,

    pub metadata: Json,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
