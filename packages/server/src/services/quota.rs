use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Set};
use uuid::Uuid;

use crate::entity::{storage_account, usage_log};
use crate::error::AppError;

/// A quota-affecting action, recorded verbatim in the usage log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsageAction {
    Upload,
    Delete,
    Restore,
    CreateFolder,
    PermanentDelete,
}

impl UsageAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Delete => "delete",
            Self::Restore => "restore",
            Self::CreateFolder => "create_folder",
            Self::PermanentDelete => "permanent_delete",
        }
    }

    /// Usage total after applying this action.
    ///
    /// Only uploads grow usage and only permanent deletes shrink it;
    /// soft delete and restore are log-only because trashed content
    /// still occupies quota until permanently deleted.
    fn next_usage(self, old: i64, delta: i64) -> i64 {
        match self {
            Self::Upload => old + delta,
            Self::PermanentDelete => (old - delta).max(0),
            Self::Delete | Self::Restore | Self::CreateFolder => old,
        }
    }
}

/// Result of applying a ledger action.
#[derive(Debug, Clone, Copy)]
pub struct UsageChange {
    pub old_usage: i64,
    pub new_usage: i64,
}

/// Fetch the owner's storage account, creating it lazily on first use.
pub async fn get_or_create_account<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    default_quota: i64,
) -> Result<storage_account::Model, AppError> {
    let now = Utc::now();
    let model = storage_account::ActiveModel {
        owner_id: Set(owner_id),
        quota_bytes: Set(default_quota),
        used_bytes: Set(0),
        status: Set("active".to_string()),
        metadata: Set(serde_json::json!({})),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let result = storage_account::Entity::insert(model)
        .on_conflict(
            OnConflict::column(storage_account::Column::OwnerId)
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

    storage_account::Entity::find_by_id(owner_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::Internal("storage account missing after upsert".into()))
}

/// Pre-flight capacity check for a size-increasing operation.
///
/// Read-only; a later `apply` is a separate write with no transaction
/// spanning the two, so concurrent requests can both pass and jointly
/// overshoot the quota. Accepted as a best-effort control.
pub async fn check_capacity<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    delta_bytes: i64,
    default_quota: i64,
) -> Result<(), AppError> {
    let account = get_or_create_account(db, owner_id, default_quota).await?;

    if delta_bytes > 0 && account.used_bytes + delta_bytes > account.quota_bytes {
        return Err(AppError::QuotaExceeded {
            needed: delta_bytes,
            available: (account.quota_bytes - account.used_bytes).max(0),
        });
    }
    Ok(())
}

/// Apply a ledger action: adjust the running total per the action's
/// semantics and append exactly one usage_log row.
///
/// This is the only writer of `storage_account.used_bytes`.
pub async fn apply<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    action: UsageAction,
    blob_id: Option<Uuid>,
    size_delta: i64,
    metadata: serde_json::Value,
    default_quota: i64,
) -> Result<UsageChange, AppError> {
    let account = get_or_create_account(db, owner_id, default_quota).await?;

    let old_usage = account.used_bytes;
    let new_usage = action.next_usage(old_usage, size_delta);

    if new_usage != old_usage {
        let mut active: storage_account::ActiveModel = account.into();
        active.used_bytes = Set(new_usage);
        active.updated_at = Set(Utc::now());
        storage_account::Entity::update(active).exec(db).await?;
    }

    let entry = usage_log::ActiveModel {
        id: Set(Uuid::now_v7()),
        owner_id: Set(owner_id),
        blob_id: Set(blob_id),
        action: Set(action.as_str().to_string()),
        size_delta: Set(size_delta),
        old_usage: Set(old_usage),
        new_usage: Set(new_usage),
        metadata: Set(metadata),
        created_at: Set(Utc::now()),
    };
    usage_log::Entity::insert(entry)
        .exec_without_returning(db)
        .await?;

    Ok(UsageChange {
        old_usage,
        new_usage,
    })
}
