//! Decides which entries an archive contains and under which names.
//!
//! Every entry carries the display path of its node. When the plan has a
//! common prefix, entry names are made relative to it; a directory marker
//! whose path equals the prefix is named after the archive itself.

use std::collections::{BTreeSet, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cabinet_core::error::AppError;
use cabinet_core::result::AppResult;
use cabinet_core::types::{FileId, FolderId, NodeRef, ProjectId};
use cabinet_entity::file::File;

use crate::path::PathResolver;
use crate::tree::TreeStore;

/// MIME type of every archive response.
pub const CONTENT_TYPE: &str = "application/zip";

/// One archive member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// Object key of the file; None for a directory marker.
    pub remote_key: Option<String>,
    /// Display path of the node (project name first).
    pub display_path: String,
    /// Last modification of the node.
    pub modified: DateTime<Utc>,
}

impl ArchiveEntry {
    /// Whether this entry is a directory marker.
    pub fn is_directory(&self) -> bool {
        self.remote_key.is_none()
    }
}

/// A fully planned archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivePlan {
    /// Archive name without extension.
    pub name: String,
    /// Display path every entry is made relative to.
    pub common_prefix: Option<String>,
    /// Members in write order.
    pub entries: Vec<ArchiveEntry>,
}

impl ArchivePlan {
    /// File name offered to the client.
    pub fn file_name(&self) -> String {
        format!("{}.zip", self.name)
    }

    /// `Content-Disposition` header value.
    pub fn content_disposition(&self) -> String {
        format!(
            "attachment; filename={}",
            urlencoding::encode(&self.file_name())
        )
    }

    /// Name `entry` is written under. Directory names end with `/`.
    pub fn entry_name(&self, entry: &ArchiveEntry) -> String {
        let path = entry.display_path.as_str();
        let relative = match self.common_prefix.as_deref() {
            Some(prefix) if path == prefix => self.name.as_str(),
            Some(prefix) => path
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(path),
            None => path,
        };
        if entry.is_directory() {
            format!("{relative}/")
        } else {
            relative.to_string()
        }
    }
}

/// Display paths of containers, resolved once per plan.
struct DisplayCache<'a> {
    resolver: &'a PathResolver,
    tree: &'a TreeStore,
    containers: HashMap<NodeRef, String>,
}

impl<'a> DisplayCache<'a> {
    fn new(resolver: &'a PathResolver, tree: &'a TreeStore) -> Self {
        Self {
            resolver,
            tree,
            containers: HashMap::new(),
        }
    }

    fn container(&mut self, node: NodeRef) -> AppResult<String> {
        if let Some(path) = self.containers.get(&node) {
            return Ok(path.clone());
        }
        let path = self.resolver.display_string(self.tree, node)?;
        self.containers.insert(node, path.clone());
        Ok(path)
    }

    fn file(&mut self, file: &File) -> AppResult<ArchiveEntry> {
        let parent = self.container(file.container())?;
        Ok(ArchiveEntry {
            remote_key: Some(file.remote_key.clone()),
            display_path: format!("{parent}/{}", file.name),
            modified: file.updated_at,
        })
    }

    fn marker(&mut self, node: NodeRef) -> AppResult<ArchiveEntry> {
        let modified = match node {
            NodeRef::Project(id) => self.tree.project(id)?.updated_at,
            NodeRef::Folder(id) => self.tree.folder(id)?.updated_at,
            NodeRef::File(_) => {
                return Err(AppError::validation(format!(
                    "{node} cannot be a directory entry"
                )));
            }
        };
        Ok(ArchiveEntry {
            remote_key: None,
            display_path: self.container(node)?,
            modified,
        })
    }
}

/// Builds [`ArchivePlan`]s from the tree.
#[derive(Debug, Clone)]
pub struct ArchivePlanner {
    resolver: PathResolver,
    merged_name: String,
}

impl ArchivePlanner {
    /// Create a planner. `merged_name` names archives spanning several
    /// projects.
    pub fn new(resolver: PathResolver, merged_name: impl Into<String>) -> Self {
        Self {
            resolver,
            merged_name: merged_name.into(),
        }
    }

    fn project_entries(
        &self,
        cache: &mut DisplayCache<'_>,
        tree: &TreeStore,
        project: ProjectId,
        entries: &mut Vec<ArchiveEntry>,
    ) -> AppResult<()> {
        let root = NodeRef::Project(project);
        tree.project(project)?;
        if !tree.has_children(root) {
            entries.push(cache.marker(root)?);
            return Ok(());
        }
        for file in tree.subtree_files(root) {
            entries.push(cache.file(file)?);
        }
        for folder in tree.descendant_folders(root) {
            let node = NodeRef::Folder(folder);
            if !tree.has_children(node) {
                entries.push(cache.marker(node)?);
            }
        }
        Ok(())
    }

    fn folder_entries(
        &self,
        cache: &mut DisplayCache<'_>,
        tree: &TreeStore,
        folder: FolderId,
        entries: &mut Vec<ArchiveEntry>,
    ) -> AppResult<()> {
        let node = NodeRef::Folder(folder);
        tree.folder(folder)?;
        if !tree.has_children(node) {
            entries.push(cache.marker(node)?);
            return Ok(());
        }
        for file in tree.child_files(node) {
            entries.push(cache.file(file)?);
        }
        for child in tree.child_folders(node) {
            let child_node = NodeRef::Folder(child.id);
            if tree.has_children(child_node) {
                self.folder_entries(cache, tree, child.id, entries)?;
            } else {
                entries.push(cache.marker(child_node)?);
            }
        }
        Ok(())
    }

    /// Whole project, entries relative to the project.
    pub fn plan_project(&self, tree: &TreeStore, project: ProjectId) -> AppResult<ArchivePlan> {
        let mut cache = DisplayCache::new(&self.resolver, tree);
        let mut entries = Vec::new();
        self.project_entries(&mut cache, tree, project, &mut entries)?;
        Ok(ArchivePlan {
            name: tree.project(project)?.name.clone(),
            common_prefix: Some(cache.container(NodeRef::Project(project))?),
            entries,
        })
    }

    /// One folder subtree, entries relative to the folder.
    pub fn plan_folder(&self, tree: &TreeStore, folder: FolderId) -> AppResult<ArchivePlan> {
        let mut cache = DisplayCache::new(&self.resolver, tree);
        let mut entries = Vec::new();
        self.folder_entries(&mut cache, tree, folder, &mut entries)?;
        Ok(ArchivePlan {
            name: tree.folder(folder)?.name.clone(),
            common_prefix: Some(cache.container(NodeRef::Folder(folder))?),
            entries,
        })
    }

    /// Selected files and folder subtrees below `parent`, entries relative
    /// to `parent`. Every selected node must lie inside `parent`. Repeated
    /// ids and nodes inside a selected folder are planned once.
    pub fn plan_selection(
        &self,
        tree: &TreeStore,
        parent: NodeRef,
        files: &[FileId],
        folders: &[FolderId],
    ) -> AppResult<ArchivePlan> {
        let inside = |node: NodeRef| -> AppResult<bool> {
            Ok(match parent {
                NodeRef::Project(id) => tree.project_of(node)? == id,
                NodeRef::Folder(id) => node != parent && tree.is_ancestor_or_self(id, node),
                NodeRef::File(_) => false,
            })
        };
        if parent.is_file() {
            return Err(AppError::validation(format!(
                "{parent} cannot be an archive root"
            )));
        }

        let selected: BTreeSet<FolderId> = folders.iter().copied().collect();
        let covered = |node: NodeRef| {
            selected
                .iter()
                .any(|f| NodeRef::Folder(*f) != node && tree.is_ancestor_or_self(*f, node))
        };

        let mut cache = DisplayCache::new(&self.resolver, tree);
        let mut entries = Vec::new();
        let mut seen = HashSet::new();
        for id in files {
            let node = NodeRef::File(*id);
            let file = tree.file(*id)?;
            if !inside(node)? {
                return Err(AppError::validation(format!("{node} is not inside {parent}")));
            }
            if seen.insert(node) && !covered(node) {
                entries.push(cache.file(file)?);
            }
        }
        for id in folders {
            let node = NodeRef::Folder(*id);
            tree.folder(*id)?;
            if !inside(node)? {
                return Err(AppError::validation(format!("{node} is not inside {parent}")));
            }
            if seen.insert(node) && !covered(node) {
                self.folder_entries(&mut cache, tree, *id, &mut entries)?;
            }
        }

        Ok(ArchivePlan {
            name: tree.name_of(parent)?.to_string(),
            common_prefix: Some(cache.container(parent)?),
            entries,
        })
    }

    /// Several whole projects in one archive, entries keep their project
    /// name as first segment. Duplicate ids are planned once, in first
    /// occurrence order.
    pub fn plan_projects(&self, tree: &TreeStore, projects: &[ProjectId]) -> AppResult<ArchivePlan> {
        if projects.is_empty() {
            return Err(AppError::validation("No projects to archive"));
        }
        let mut cache = DisplayCache::new(&self.resolver, tree);
        let mut seen = BTreeSet::new();
        let mut entries = Vec::new();
        for project in projects {
            if seen.insert(*project) {
                self.project_entries(&mut cache, tree, *project, &mut entries)?;
            }
        }
        Ok(ArchivePlan {
            name: self.merged_name.clone(),
            common_prefix: None,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ActorContext;
    use cabinet_entity::file::CreateFile;
    use cabinet_entity::folder::CreateFolder;
    use cabinet_entity::project::CreateProject;

    fn project(tree: &mut TreeStore, name: &str) -> ProjectId {
        tree.create_project(
            CreateProject { name: name.into(), owner_id: None },
            &ActorContext::system(),
        )
        .unwrap()
        .id
    }

    fn folder(tree: &mut TreeStore, p: ProjectId, parent: Option<FolderId>, name: &str) -> FolderId {
        tree.create_folder(
            CreateFolder { project_id: p, parent_id: parent, name: name.into(), owner_id: None },
            &ActorContext::system(),
        )
        .unwrap()
        .id
    }

    fn file(tree: &mut TreeStore, p: ProjectId, parent: Option<FolderId>, name: &str) -> FileId {
        let id = tree.allocate_file_id();
        tree.insert_file(
            id,
            CreateFile {
                project_id: p,
                folder_id: parent,
                name: name.into(),
                remote_key: None,
                is_public: false,
                owner_id: None,
            },
            format!("k/{id}"),
            1,
            &ActorContext::system(),
        )
        .unwrap();
        id
    }

    fn names(plan: &ArchivePlan) -> Vec<String> {
        plan.entries.iter().map(|e| plan.entry_name(e)).collect()
    }

    #[test]
    fn test_empty_project_is_one_marker_named_after_archive() {
        let mut tree = TreeStore::new();
        let p = project(&mut tree, "Alpha");
        let planner = ArchivePlanner::new(PathResolver::default(), "projects");

        let plan = planner.plan_project(&tree, p).unwrap();
        assert_eq!(plan.entries.len(), 1);
        assert!(plan.entries[0].is_directory());
        assert_eq!(names(&plan), vec!["Alpha/".to_string()]);
        assert_eq!(plan.file_name(), "Alpha.zip");
    }

    #[test]
    fn test_project_plan_has_files_and_empty_folders() {
        let mut tree = TreeStore::new();
        let p = project(&mut tree, "Alpha");
        let docs = folder(&mut tree, p, None, "Docs");
        let empty = folder(&mut tree, p, Some(docs), "Empty");
        file(&mut tree, p, Some(docs), "a.txt");
        file(&mut tree, p, None, "root.txt");
        let planner = ArchivePlanner::new(PathResolver::default(), "projects");

        let plan = planner.plan_project(&tree, p).unwrap();
        let names = names(&plan);
        assert_eq!(names, vec!["root.txt", "Docs/a.txt", "Docs/Empty/"]);
        assert_eq!(
            plan.entries[2].display_path,
            format!("Alpha/Docs/{}", tree.folder(empty).unwrap().name)
        );
    }

    #[test]
    fn test_folder_plan_recurses_into_nonempty_subfolders() {
        let mut tree = TreeStore::new();
        let p = project(&mut tree, "Alpha");
        let docs = folder(&mut tree, p, None, "Docs");
        let sub = folder(&mut tree, p, Some(docs), "Sub");
        folder(&mut tree, p, Some(sub), "Deep");
        file(&mut tree, p, Some(sub), "b.txt");
        file(&mut tree, p, Some(docs), "a.txt");
        let planner = ArchivePlanner::new(PathResolver::default(), "projects");

        let plan = planner.plan_folder(&tree, docs).unwrap();
        assert_eq!(plan.name, "Docs");
        assert_eq!(names(&plan), vec!["a.txt", "Sub/b.txt", "Sub/Deep/"]);
    }

    #[test]
    fn test_multi_project_plan_keeps_project_names() {
        let mut tree = TreeStore::new();
        let a = project(&mut tree, "Alpha");
        let b = project(&mut tree, "Beta");
        file(&mut tree, a, None, "x.txt");
        let planner = ArchivePlanner::new(PathResolver::default(), "projects");

        let plan = planner.plan_projects(&tree, &[a, b, a]).unwrap();
        assert_eq!(plan.file_name(), "projects.zip");
        assert_eq!(names(&plan), vec!["Alpha/x.txt", "Beta/"]);
    }

    #[test]
    fn test_selection_outside_parent_is_rejected() {
        let mut tree = TreeStore::new();
        let p = project(&mut tree, "Alpha");
        let docs = folder(&mut tree, p, None, "Docs");
        let other = folder(&mut tree, p, None, "Other");
        let inside = file(&mut tree, p, Some(docs), "in.txt");
        let outside = file(&mut tree, p, Some(other), "out.txt");
        let planner = ArchivePlanner::new(PathResolver::default(), "projects");

        let plan = planner
            .plan_selection(&tree, NodeRef::Folder(docs), &[inside], &[])
            .unwrap();
        assert_eq!(names(&plan), vec!["in.txt"]);

        let err = planner
            .plan_selection(&tree, NodeRef::Folder(docs), &[outside], &[])
            .unwrap_err();
        assert_eq!(err.kind, cabinet_core::error::ErrorKind::Validation);
    }

    #[test]
    fn test_selection_plans_overlapping_nodes_once() {
        let mut tree = TreeStore::new();
        let p = project(&mut tree, "Alpha");
        let docs = folder(&mut tree, p, None, "Docs");
        let sub = folder(&mut tree, p, Some(docs), "Sub");
        let a = file(&mut tree, p, Some(docs), "a.txt");
        let b = file(&mut tree, p, Some(sub), "b.txt");
        let loose = file(&mut tree, p, None, "loose.txt");
        let planner = ArchivePlanner::new(PathResolver::default(), "projects");

        let plan = planner
            .plan_selection(&tree, NodeRef::Project(p), &[a, b, loose, loose], &[docs, sub, docs])
            .unwrap();
        assert_eq!(names(&plan), vec!["loose.txt", "Docs/a.txt", "Docs/Sub/b.txt"]);
    }

    #[test]
    fn test_content_disposition_is_percent_encoded() {
        let plan = ArchivePlan {
            name: "Q3 report".into(),
            common_prefix: None,
            entries: Vec::new(),
        };
        assert_eq!(plan.content_disposition(), "attachment; filename=Q3%20report.zip");
    }
}
