use std::collections::HashSet;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::{blob, node};
use crate::error::AppError;
use crate::utils::filename::validate_node_name;

/// One entry of a breadcrumb chain. `id == None` is the synthetic root.
#[derive(Debug, Clone)]
pub struct Crumb {
    pub id: Option<Uuid>,
    pub name: String,
    pub parent_id: Option<Uuid>,
}

/// Find a node owned by `owner_id`, in any lifecycle state.
///
/// Foreign nodes surface as `NotFound`, never as a permission error, so
/// existence is not leaked across owners.
pub async fn find_owned_node<C: ConnectionTrait>(
    db: &C,
    node_id: Uuid,
    owner_id: i32,
) -> Result<node::Model, AppError> {
    node::Entity::find_by_id(node_id)
        .one(db)
        .await?
        .filter(|n| n.owner_id == owner_id)
        .ok_or_else(|| AppError::NotFound("File or folder not found".into()))
}

/// Find an owned node that is not in the trash.
pub async fn find_active_node<C: ConnectionTrait>(
    db: &C,
    node_id: Uuid,
    owner_id: i32,
) -> Result<node::Model, AppError> {
    let found = find_owned_node(db, node_id, owner_id).await?;
    if found.deleted_at.is_some() {
        return Err(AppError::NotFound("File or folder not found".into()));
    }
    Ok(found)
}

/// Verify that `parent_id`, when set, is an owned active folder.
pub async fn assert_parent_folder<C: ConnectionTrait>(
    db: &C,
    parent_id: Option<Uuid>,
    owner_id: i32,
) -> Result<(), AppError> {
    let Some(parent_id) = parent_id else {
        return Ok(());
    };

    let parent = find_active_node(db, parent_id, owner_id)
        .await
        .map_err(|_| AppError::NotFound("Parent folder not found".into()))?;
    if !parent.is_dir {
        return Err(AppError::NotFound("Parent folder not found".into()));
    }
    Ok(())
}

/// Whether an active sibling with the given name exists under `parent_id`.
///
/// `folders_only` restricts the collision check to folders (used by
/// folder creation, where a file and a folder may share a name).
pub async fn active_sibling_exists<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    parent_id: Option<Uuid>,
    name: &str,
    folders_only: bool,
    exclude: Option<Uuid>,
) -> Result<bool, AppError> {
    let mut query = node::Entity::find()
        .filter(node::Column::OwnerId.eq(owner_id))
        .filter(node::Column::Name.eq(name))
        .filter(node::Column::DeletedAt.is_null());

    query = match parent_id {
        Some(parent) => query.filter(node::Column::ParentId.eq(parent)),
        None => query.filter(node::Column::ParentId.is_null()),
    };
    if folders_only {
        query = query.filter(node::Column::IsDir.eq(true));
    }
    if let Some(exclude_id) = exclude {
        query = query.filter(node::Column::Id.ne(exclude_id));
    }

    Ok(query.one(db).await?.is_some())
}

/// Create a folder node.
pub async fn create_folder<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    name: &str,
    parent_id: Option<Uuid>,
) -> Result<node::Model, AppError> {
    let name = validate_node_name(name)
        .map_err(|e| AppError::Validation(e.message().into()))?
        .to_string();

    assert_parent_folder(db, parent_id, owner_id).await?;

    if active_sibling_exists(db, owner_id, parent_id, &name, true, None).await? {
        return Err(AppError::Conflict(format!(
            "A folder named '{name}' already exists here"
        )));
    }

    let model = node::ActiveModel {
        id: Set(Uuid::now_v7()),
        owner_id: Set(owner_id),
        blob_id: Set(None),
        parent_id: Set(parent_id),
        name: Set(name),
        is_dir: Set(true),
        size: Set(0),
        is_latest_version: Set(true),
        deleted_at: Set(None),
        created_at: Set(Utc::now()),
    };

    Ok(model.insert(db).await?)
}

/// Create a file node linked to an existing blob.
pub async fn create_file<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    blob: &blob::Model,
    name: &str,
    parent_id: Option<Uuid>,
) -> Result<node::Model, AppError> {
    let name = validate_node_name(name)
        .map_err(|e| AppError::Validation(e.message().into()))?
        .to_string();

    assert_parent_folder(db, parent_id, owner_id).await?;

    if active_sibling_exists(db, owner_id, parent_id, &name, false, None).await? {
        return Err(AppError::Conflict(format!(
            "An item named '{name}' already exists here"
        )));
    }

    let model = node::ActiveModel {
        id: Set(Uuid::now_v7()),
        owner_id: Set(owner_id),
        blob_id: Set(Some(blob.id)),
        parent_id: Set(parent_id),
        name: Set(name),
        is_dir: Set(false),
        size: Set(blob.size),
        is_latest_version: Set(true),
        deleted_at: Set(None),
        created_at: Set(Utc::now()),
    };

    Ok(model.insert(db).await?)
}

/// Rename an active node, re-checking the sibling collision under the
/// same parent (excluding the node itself).
pub async fn rename<C: ConnectionTrait>(
    db: &C,
    node_id: Uuid,
    owner_id: i32,
    new_name: &str,
) -> Result<node::Model, AppError> {
    let new_name = validate_node_name(new_name)
        .map_err(|e| AppError::Validation(e.message().into()))?
        .to_string();

    let found = find_active_node(db, node_id, owner_id).await?;

    if active_sibling_exists(db, owner_id, found.parent_id, &new_name, false, Some(found.id))
        .await?
    {
        return Err(AppError::Conflict(format!(
            "An item named '{new_name}' already exists here"
        )));
    }

    let mut active: node::ActiveModel = found.into();
    active.name = Set(new_name);
    Ok(node::Entity::update(active).exec(db).await?)
}

/// List the active children of a folder (or of the root when
/// `parent_id` is `None`), folders first.
pub async fn list_children<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
    parent_id: Option<Uuid>,
) -> Result<Vec<node::Model>, AppError> {
    let mut query = node::Entity::find()
        .filter(node::Column::OwnerId.eq(owner_id))
        .filter(node::Column::DeletedAt.is_null());

    query = match parent_id {
        Some(parent) => query.filter(node::Column::ParentId.eq(parent)),
        None => query.filter(node::Column::ParentId.is_null()),
    };

    Ok(query
        .order_by_desc(node::Column::IsDir)
        .order_by_asc(node::Column::Name)
        .all(db)
        .await?)
}

/// The full transitive closure of `root`, root included.
///
/// Iterative BFS over parent pointers, one query per level, with a
/// visited set as a cycle guard. No recursive SQL, so the walk is
/// independent of the backend's query dialect. Lifecycle state is not
/// filtered: the same walk serves deletion of active subtrees and
/// restore/purge of trashed ones.
pub async fn subtree<C: ConnectionTrait>(
    db: &C,
    root: node::Model,
    owner_id: i32,
) -> Result<Vec<node::Model>, AppError> {
    if !root.is_dir {
        return Ok(vec![root]);
    }

    let mut visited: HashSet<Uuid> = HashSet::from([root.id]);
    let mut frontier: Vec<Uuid> = vec![root.id];
    let mut all = vec![root];

    while !frontier.is_empty() {
        let children = node::Entity::find()
            .filter(node::Column::OwnerId.eq(owner_id))
            .filter(node::Column::ParentId.is_in(frontier.clone()))
            .all(db)
            .await?;

        frontier = Vec::new();
        for child in children {
            if visited.insert(child.id) {
                frontier.push(child.id);
                all.push(child);
            }
        }
    }

    Ok(all)
}

/// Walk parent pointers from `node_id` to the root, returning the chain
/// root-first and prefixed with the synthetic Root entry.
pub async fn breadcrumbs<C: ConnectionTrait>(
    db: &C,
    node_id: Uuid,
    owner_id: i32,
) -> Result<Vec<Crumb>, AppError> {
    let mut chain = Vec::new();
    let mut visited: HashSet<Uuid> = HashSet::new();
    let mut current = Some(node_id);

    while let Some(id) = current {
        if !visited.insert(id) {
            return Err(AppError::Internal(format!("parent cycle at node {id}")));
        }
        let entry = find_active_node(db, id, owner_id).await?;
        current = entry.parent_id;
        chain.push(Crumb {
            id: Some(entry.id),
            name: entry.name,
            parent_id: entry.parent_id,
        });
    }

    chain.push(Crumb {
        id: None,
        name: "Root".to_string(),
        parent_id: None,
    });
    chain.reverse();
    Ok(chain)
}

/// All deleted nodes of an owner, newest first.
pub async fn list_deleted<C: ConnectionTrait>(
    db: &C,
    owner_id: i32,
) -> Result<Vec<node::Model>, AppError> {
    Ok(node::Entity::find()
        .filter(node::Column::OwnerId.eq(owner_id))
        .filter(node::Column::DeletedAt.is_not_null())
        .order_by_desc(node::Column::DeletedAt)
        .all(db)
        .await?)
}

/// Ids of trash entries that belong in the top-level trash listing.
///
/// An item surfaces iff it is deleted and its parent is not: only the
/// highest deleted ancestor appears, since descendants already ride the
/// cascade. Input pairs are (id, parent_id) of every deleted node.
pub fn top_level_trash_ids(deleted: &[(Uuid, Option<Uuid>)]) -> HashSet<Uuid> {
    let deleted_ids: HashSet<Uuid> = deleted.iter().map(|(id, _)| *id).collect();

    deleted
        .iter()
        .filter(|(_, parent)| match parent {
            Some(parent_id) => !deleted_ids.contains(parent_id),
            None => true,
        })
        .map(|(id, _)| *id)
        .collect()
}
