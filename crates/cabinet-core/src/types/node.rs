//! Typed reference to any node of the project forest.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::id::{FileId, FolderId, ProjectId};

/// A reference to a project, folder, or file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum NodeRef {
    /// A project root.
    Project(ProjectId),
    /// A folder.
    Folder(FolderId),
    /// A file.
    File(FileId),
}

impl NodeRef {
    /// Parent reference for a node whose parent folder is optional.
    pub fn container(project: ProjectId, folder: Option<FolderId>) -> Self {
        match folder {
            Some(id) => Self::Folder(id),
            None => Self::Project(project),
        }
    }

    /// Whether this reference points at a file.
    pub fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project(id) => write!(f, "project:{id}"),
            Self::Folder(id) => write!(f, "folder:{id}"),
            Self::File(id) => write!(f, "file:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_without_folder_is_project() {
        assert_eq!(
            NodeRef::container(ProjectId(1), None),
            NodeRef::Project(ProjectId(1))
        );
        assert_eq!(
            NodeRef::container(ProjectId(1), Some(FolderId(9))),
            NodeRef::Folder(FolderId(9))
        );
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&NodeRef::File(FileId(5))).expect("serialize");
        assert_eq!(json, r#"{"kind":"file","id":5}"#);
    }
}
