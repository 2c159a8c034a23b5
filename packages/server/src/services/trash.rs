use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::entity::node;
use crate::error::AppError;
use crate::services::quota::{self, UsageAction};
use crate::services::tree;

/// Outcome of a subtree lifecycle operation.
#[derive(Debug)]
pub struct LifecycleOutcome {
    /// The operation's root node, in its post-operation state.
    pub root: node::Model,
    /// Number of nodes touched (root included).
    pub nodes_affected: u64,
    /// Σ of file blob sizes across the subtree (folders contribute 0).
    pub total_bytes: i64,
}

fn subtree_file_bytes(nodes: &[node::Model]) -> i64 {
    nodes.iter().filter(|n| !n.is_dir).map(|n| n.size).sum()
}

/// Move a node (and, for folders, its whole subtree) to the trash.
///
/// Subtree discovery happens before any mutation; all `deleted_at`
/// stamps land in one `UPDATE ... WHERE id IN (...)`. Usage is not
/// reduced (trashed content still counts against quota), so the ledger
/// entry is log-only.
pub async fn soft_delete<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    node_id: Uuid,
    default_quota: i64,
) -> Result<LifecycleOutcome, AppError> {
    let root = tree::find_active_node(db, node_id, owner_id).await?;
    let blob_id = root.blob_id;

    let nodes = tree::subtree(db, root, owner_id).await?;
    let ids: Vec<Uuid> = nodes.iter().map(|n| n.id).collect();
    let total_bytes = subtree_file_bytes(&nodes);
    let now = Utc::now();

    let result = node::Entity::update_many()
        .col_expr(node::Column::DeletedAt, Expr::value(Some(now)))
        .filter(node::Column::Id.is_in(ids.clone()))
        .exec(db)
        .await?;

    quota::apply(
        db,
        owner_id,
        UsageAction::Delete,
        blob_id,
        total_bytes,
        serde_json::json!({ "node_id": node_id, "nodes": ids.len() }),
        default_quota,
    )
    .await?;

    let mut root = nodes.into_iter().next().expect("subtree includes root");
    root.deleted_at = Some(now);

    Ok(LifecycleOutcome {
        root,
        nodes_affected: result.rows_affected,
        total_bytes,
    })
}

/// Restore a trashed node (and its subtree) back into the namespace.
///
/// All-or-nothing: the name-collision re-check and the capacity check
/// both run before any `deleted_at` is cleared, so a failure leaves the
/// whole subtree in the trash.
pub async fn restore<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    node_id: Uuid,
    default_quota: i64,
) -> Result<LifecycleOutcome, AppError> {
    let root = tree::find_owned_node(db, node_id, owner_id).await?;
    if root.deleted_at.is_none() {
        return Err(AppError::NotFound("Trash item not found".into()));
    }
    let blob_id = root.blob_id;

    if tree::active_sibling_exists(db, owner_id, root.parent_id, &root.name, false, Some(root.id))
        .await?
    {
        return Err(AppError::Conflict(format!(
            "An item named '{}' already occupies the restore target",
            root.name
        )));
    }

    let nodes = tree::subtree(db, root, owner_id).await?;
    let ids: Vec<Uuid> = nodes.iter().map(|n| n.id).collect();
    let total_bytes = subtree_file_bytes(&nodes);

    quota::check_capacity(db, owner_id, total_bytes, default_quota).await?;

    let result = node::Entity::update_many()
        .col_expr(
            node::Column::DeletedAt,
            Expr::value(None::<chrono::DateTime<chrono::Utc>>),
        )
        .filter(node::Column::Id.is_in(ids.clone()))
        .exec(db)
        .await?;

    quota::apply(
        db,
        owner_id,
        UsageAction::Restore,
        blob_id,
        total_bytes,
        serde_json::json!({ "node_id": node_id, "nodes": ids.len() }),
        default_quota,
    )
    .await?;

    let mut root = nodes.into_iter().next().expect("subtree includes root");
    root.deleted_at = None;

    Ok(LifecycleOutcome {
        root,
        nodes_affected: result.rows_affected,
        total_bytes,
    })
}

/// Hard-delete a trashed node (and its subtree) from the namespace.
///
/// The only action that reduces `used_bytes`. Blob rows and backend
/// bytes are retained; no garbage collection in scope.
pub async fn permanent_delete<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    node_id: Uuid,
    default_quota: i64,
) -> Result<LifecycleOutcome, AppError> {
    let root = tree::find_owned_node(db, node_id, owner_id).await?;
    if root.deleted_at.is_none() {
        return Err(AppError::NotFound("Trash item not found".into()));
    }
    let blob_id = root.blob_id;

    let nodes = tree::subtree(db, root, owner_id).await?;
    let ids: Vec<Uuid> = nodes.iter().map(|n| n.id).collect();
    let total_bytes = subtree_file_bytes(&nodes);

    let result = node::Entity::delete_many()
        .filter(node::Column::Id.is_in(ids.clone()))
        .exec(db)
        .await?;

    quota::apply(
        db,
        owner_id,
        UsageAction::PermanentDelete,
        blob_id,
        total_bytes,
        serde_json::json!({ "node_id": node_id, "nodes": ids.len() }),
        default_quota,
    )
    .await?;

    let root = nodes.into_iter().next().expect("subtree includes root");

    Ok(LifecycleOutcome {
        root,
        nodes_affected: result.rows_affected,
        total_bytes,
    })
}

/// Top-level trash listing: only the highest deleted ancestors.
pub async fn list_trash<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
) -> Result<Vec<node::Model>, AppError> {
    let deleted = tree::list_deleted(db, owner_id).await?;
    let pairs: Vec<(Uuid, Option<Uuid>)> =
        deleted.iter().map(|n| (n.id, n.parent_id)).collect();
    let top = tree::top_level_trash_ids(&pairs);

    Ok(deleted.into_iter().filter(|n| top.contains(&n.id)).collect())
}
