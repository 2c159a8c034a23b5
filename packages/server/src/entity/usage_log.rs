use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Append-only audit trail of quota-affecting actions.
///
/// Rows are written once by the quota ledger and never mutated or
/// deleted, independent of the account's running total.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "usage_log")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub owner_id: i32,

    /// Blob the action concerned, when one was involved.
    pub blob_id: Option<Uuid>,

    /// One of: "upload", "delete", "restore", "create_folder",
    /// "permanent_delete".
    pub action: String,

    /// Bytes the action concerned (Σ of file sizes for subtree
    /// operations; 0 for folder creation).
    pub size_delta: i64,

    pub old_usage: i64,
    pub new_usage: i64,

    pub metadata: Json,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
