//! Tree mutation events.

use serde::{Deserialize, Serialize};

use crate::types::{FileId, FolderId, NodeRef, ProjectId};

/// Events related to changes of the project forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TreeEvent {
    /// A file's blob was relocated and its pointers committed.
    FileMoved {
        /// The file ID.
        file_id: FileId,
        /// Project before the move.
        from_project: ProjectId,
        /// Folder before the move.
        from_folder: Option<FolderId>,
        /// Project after the move.
        to_project: ProjectId,
        /// Folder after the move.
        to_folder: Option<FolderId>,
        /// Object key after the move.
        remote_key: String,
    },
    /// A folder was reparented.
    FolderMoved {
        /// The folder ID.
        folder_id: FolderId,
        /// Project before the move.
        from_project: ProjectId,
        /// Parent before the move.
        from_parent: Option<FolderId>,
        /// Project after the move.
        to_project: ProjectId,
        /// Parent after the move.
        to_parent: Option<FolderId>,
    },
    /// A node's display name changed.
    Renamed {
        /// The renamed node.
        node: NodeRef,
        /// Previous name.
        old_name: String,
        /// New name.
        new_name: String,
    },
    /// An aggregate (size or visibility) changed.
    AggregateChanged {
        /// The node whose cached aggregate changed.
        node: NodeRef,
        /// New size in bytes.
        size: u64,
        /// New visibility.
        is_public: bool,
    },
}
