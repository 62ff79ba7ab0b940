//! Folder entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use cabinet_core::types::{FolderId, NodeRef, ProjectId, UserId};

/// A folder in a project tree.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Folder {
    /// Unique folder identifier.
    pub id: FolderId,
    /// The project this folder belongs to.
    pub project_id: ProjectId,
    /// Parent folder ID (None when the folder sits at the project root).
    pub parent_id: Option<FolderId>,
    /// Folder name, unique among its siblings.
    pub name: String,
    /// Public-link token.
    pub slug: Option<String>,
    /// The folder owner.
    pub owner_id: Option<UserId>,
    /// Whether any descendant is public.
    pub is_public: bool,
    /// Sum of direct child file and folder sizes.
    pub size_bytes: i64,
    /// Who last touched the folder.
    pub updated_by: Option<UserId>,
    /// When the folder was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    /// Check if this folder sits directly under its project.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// The node that contains this folder.
    pub fn container(&self) -> NodeRef {
        NodeRef::container(self.project_id, self.parent_id)
    }
}

/// Data required to create a new folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFolder {
    /// The project.
    pub project_id: ProjectId,
    /// Parent folder (None for project root).
    pub parent_id: Option<FolderId>,
    /// Folder name.
    pub name: String,
    /// The folder owner.
    pub owner_id: Option<UserId>,
}
