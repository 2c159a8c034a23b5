use chrono::Utc;
use common::storage::ContentHash;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entity::blob;
use crate::error::AppError;

/// Look up the canonical blob for a (content_hash, size) pair.
pub async fn find_blob<C: ConnectionTrait>(
    db: &C,
    hash: &ContentHash,
    size: i64,
) -> Result<Option<blob::Model>, AppError> {
    Ok(blob::Entity::find()
        .filter(blob::Column::ContentHash.eq(hash.to_hex()))
        .filter(blob::Column::Size.eq(size))
        .one(db)
        .await?)
}

/// Fetch or create the canonical blob row for a (content_hash, size) pair.
///
/// Insert with `ON CONFLICT DO NOTHING` on the unique (content_hash,
/// size) index, then reselect: concurrent first uploads of identical
/// content converge on a single row instead of racing lookup-then-create.
pub async fn get_or_create_blob<C: ConnectionTrait>(
    db: &C,
    hash: &ContentHash,
    size: i64,
    content_type: Option<String>,
    provider: &str,
) -> Result<blob::Model, AppError> {
    let model = blob::ActiveModel {
        id: Set(Uuid::now_v7()),
        content_hash: Set(hash.to_hex()),
        size: Set(size),
        content_type: Set(content_type),
        storage_path: Set(hash.object_key()),
        provider: Set(provider.to_string()),
        created_at: Set(Utc::now()),
    };

    let result = blob::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([blob::Column::ContentHash, blob::Column::Size])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await;

    match result {
        Ok(_) => {}
        Err(DbErr::RecordNotInserted) => {}
        Err(e) => return Err(e.into()),
    }

    find_blob(db, hash, size)
        .await?
        .ok_or_else(|| AppError::Internal("blob missing after upsert".into()))
}
