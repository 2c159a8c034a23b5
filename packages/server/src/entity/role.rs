use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Role assigned to newly registered users.
pub const DEFAULT_ROLE: &str = "member";

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "role")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub name: String,
}

impl ActiveModelBehavior for ActiveModel {}
