use sea_orm::sea_query::{Index, OnConflict, PostgresQueryBuilder};
use sea_orm::*;
use tracing::info;

use crate::entity::{blob, node, role, role_permission, usage_log};

/// Default roles seeded on startup.
const DEFAULT_ROLES: &[&str] = &["admin", "member"];

/// Default role-permission mappings seeded on startup.
const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    // Admin: all permissions
    ("admin", "file:read"),
    ("admin", "file:write"),
    ("admin", "file:delete"),
    ("admin", "user:manage"),
    // Member: full control over their own tree
    ("member", "file:read"),
    ("member", "file:write"),
    ("member", "file:delete"),
];

/// Seed the `role` and `role_permission` tables with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut roles_inserted = 0u32;
    for &name in DEFAULT_ROLES {
        let model = role::ActiveModel {
            name: Set(name.to_string()),
        };

        let result = role::Entity::insert(model)
            .on_conflict(
                OnConflict::column(role::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => roles_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if roles_inserted > 0 {
        info!("Seeded {} new roles", roles_inserted);
    }

    let mut perms_inserted = 0u32;
    for &(role, permission) in DEFAULT_MAPPINGS {
        let model = role_permission::ActiveModel {
            role: Set(role.to_string()),
            permission: Set(permission.to_string()),
        };

        let result = role_permission::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    role_permission::Column::Role,
                    role_permission::Column::Permission,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => perms_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if perms_inserted > 0 {
        info!("Seeded {} new role-permission mappings", perms_inserted);
    }

    Ok(())
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite indexes, so they are
/// created manually on startup. The unique blob index is load-bearing:
/// it is what makes the dedup create path an atomic
/// insert-on-conflict-reselect instead of a racy lookup-then-create.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Dedup identity: one blob row per (content_hash, size).
    let unique_blob = Index::create()
        .if_not_exists()
        .unique()
        .name("idx_blob_content_hash_size")
        .table(blob::Entity)
        .col(blob::Column::ContentHash)
        .col(blob::Column::Size)
        .to_string(PostgresQueryBuilder);

    // Listing children of a folder:
    // SELECT * FROM node WHERE owner_id = ? AND parent_id = ? AND deleted_at IS NULL
    let node_listing = Index::create()
        .if_not_exists()
        .name("idx_node_owner_parent")
        .table(node::Entity)
        .col(node::Column::OwnerId)
        .col(node::Column::ParentId)
        .to_string(PostgresQueryBuilder);

    // Ledger queries by owner, newest first.
    let ledger = Index::create()
        .if_not_exists()
        .name("idx_usage_log_owner_created")
        .table(usage_log::Entity)
        .col(usage_log::Column::OwnerId)
        .col(usage_log::Column::CreatedAt)
        .to_string(PostgresQueryBuilder);

    for stmt in [unique_blob, node_listing, ledger] {
        db.execute_unprepared(&stmt).await?;
    }
    info!("Ensured storage indexes exist");

    Ok(())
}
