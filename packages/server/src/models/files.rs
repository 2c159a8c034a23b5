use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::node;
use crate::services::tree::Crumb;

/// Response DTO for a single file or folder.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FileNodeResponse {
    /// Node ID (UUIDv7).
    pub id: Uuid,
    /// Display name.
    #[schema(example = "report.pdf")]
    pub name: String,
    /// Whether this node is a folder.
    pub is_dir: bool,
    /// File size in bytes; 0 for folders.
    #[schema(example = 142857)]
    pub size: i64,
    /// Parent folder; `null` at the root.
    pub parent_id: Option<Uuid>,
    /// Set when the node is in the trash.
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<node::Model> for FileNodeResponse {
    fn from(model: node::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            is_dir: model.is_dir,
            size: model.size,
            parent_id: model.parent_id,
            deleted_at: model.deleted_at,
            created_at: model.created_at,
        }
    }
}

/// Response DTO for listing a folder's children.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FileListResponse {
    pub data: Vec<FileNodeResponse>,
    pub total: u64,
}

/// Query parameters for the file listing endpoint.
#[derive(Deserialize)]
pub struct FileListQuery {
    pub parent_id: Option<Uuid>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateFolderRequest {
    #[schema(example = "Holiday Photos")]
    pub name: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct RenameRequest {
    pub id: Uuid,
    #[schema(example = "renamed.pdf")]
    pub name: String,
}

/// Request body naming a single node (delete / permanent delete).
#[derive(Deserialize, utoipa::ToSchema)]
pub struct NodeIdRequest {
    pub id: Uuid,
}

/// One entry of a breadcrumb chain; `id == null` is the synthetic root.
#[derive(Serialize, utoipa::ToSchema)]
pub struct BreadcrumbItem {
    pub id: Option<Uuid>,
    #[schema(example = "Root")]
    pub name: String,
    pub parent_id: Option<Uuid>,
}

impl From<Crumb> for BreadcrumbItem {
    fn from(crumb: Crumb) -> Self {
        Self {
            id: crumb.id,
            name: crumb.name,
            parent_id: crumb.parent_id,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct BreadcrumbsResponse {
    pub breadcrumbs: Vec<BreadcrumbItem>,
}

/// Response DTO for the top-level trash listing.
#[derive(Serialize, utoipa::ToSchema)]
pub struct TrashListResponse {
    pub data: Vec<FileNodeResponse>,
    pub total: u64,
}

/// Outcome of a subtree lifecycle operation (delete / permanent delete).
#[derive(Serialize, utoipa::ToSchema)]
pub struct LifecycleResponse {
    /// Root node of the operation.
    pub id: Uuid,
    /// Number of nodes touched (root included).
    pub nodes_affected: u64,
    /// Σ of file sizes across the subtree in bytes.
    pub total_bytes: i64,
}
