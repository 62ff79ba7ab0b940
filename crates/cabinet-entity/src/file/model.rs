//! File entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use cabinet_core::types::{FileId, FolderId, NodeRef, ProjectId, UserId};

/// A file stored in a project tree.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct File {
    /// Unique file identifier.
    pub id: FileId,
    /// The project this file belongs to.
    pub project_id: ProjectId,
    /// The containing folder (None when directly under the project).
    pub folder_id: Option<FolderId>,
    /// The file name (including extension).
    pub name: String,
    /// Key of the backing blob in the object store.
    pub remote_key: String,
    /// Byte length of the backing blob.
    pub size_bytes: i64,
    /// Whether the file is reachable without authentication.
    pub is_public: bool,
    /// Public-link token.
    pub slug: Option<String>,
    /// The file owner.
    pub owner_id: Option<UserId>,
    /// Who last touched the file.
    pub updated_by: Option<UserId>,
    /// When the file was last updated.
    pub updated_at: DateTime<Utc>,
}

impl File {
    /// The node that contains this file.
    pub fn container(&self) -> NodeRef {
        NodeRef::container(self.project_id, self.folder_id)
    }

    /// The last segment of the object key, kept across moves.
    pub fn leaf_segment(&self) -> &str {
        self.remote_key
            .rsplit('/')
            .next()
            .filter(|seg| !seg.is_empty())
            .unwrap_or(self.remote_key.as_str())
    }
}

/// Data required to create a new file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFile {
    /// The project.
    pub project_id: ProjectId,
    /// The folder to place the file in.
    pub folder_id: Option<FolderId>,
    /// The file name.
    pub name: String,
    /// Key of an already uploaded blob. When None a key is minted from the
    /// destination's identity path.
    pub remote_key: Option<String>,
    /// Initial visibility.
    pub is_public: bool,
    /// The file owner.
    pub owner_id: Option<UserId>,
}
