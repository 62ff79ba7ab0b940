//! Serializable image of the whole project forest.

use serde::{Deserialize, Serialize};

use crate::file::File;
use crate::folder::Folder;
use crate::project::Project;
use crate::storage::StorageQuota;

/// Every project, folder, and file at one point in time.
///
/// Produced by the persistence layer and by JSON export; consumed when a
/// tree store is rebuilt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForestSnapshot {
    /// All projects.
    pub projects: Vec<Project>,
    /// All folders of every project.
    pub folders: Vec<Folder>,
    /// All files of every project.
    pub files: Vec<File>,
    /// The storage quota, when one has been recorded.
    #[serde(default)]
    pub quota: Option<StorageQuota>,
}

impl ForestSnapshot {
    /// Total number of records.
    pub fn len(&self) -> usize {
        self.projects.len() + self.folders.len() + self.files.len()
    }

    /// Whether the snapshot holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
