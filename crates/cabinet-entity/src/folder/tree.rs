//! Folder tree structures for hierarchical display.

use serde::{Deserialize, Serialize};

use cabinet_core::types::FolderId;

/// A node in a rendered folder tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderNode {
    /// Folder ID (None for the project root).
    pub id: Option<FolderId>,
    /// Display name.
    pub name: String,
    /// Display path from the project root.
    pub path: String,
    /// Depth level (0 for the project root).
    pub depth: u32,
    /// Cached size in bytes.
    pub size_bytes: i64,
    /// Cached visibility.
    pub is_public: bool,
    /// Number of files directly inside.
    pub file_count: u64,
    /// Child folder nodes.
    pub children: Vec<FolderNode>,
}

impl FolderNode {
    /// Total number of folders in this subtree, including the node itself.
    pub fn count(&self) -> u64 {
        1 + self.children.iter().map(FolderNode::count).sum::<u64>()
    }
}
