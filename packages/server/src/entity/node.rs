use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "node")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning user. Every tree is scoped to one owner.
    pub owner_id: i32,

    #[sea_orm(belongs_to, from = "owner_id", to = "id")]
    pub owner: Option<super::user::Entity>,

    /// Backing blob; `None` for folders.
    pub blob_id: Option<Uuid>,

    #[sea_orm(belongs_to, from = "blob_id", to = "id")]
    pub blob: Option<super::blob::Entity>,

    /// Parent folder; `None` at the root of the owner's tree.
    pub parent_id: Option<Uuid>,

    pub name: String,

    pub is_dir: bool,

    /// Purposefully denormalized blob size (0 for folders) to avoid
    /// JOINs on list and subtree-size queries.
    pub size: i64,

    pub is_latest_version: bool,

    /// Soft-delete stamp. A set value hides the node from normal
    /// listings; clearing it restores the node.
    pub deleted_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
