//! In-memory project forest.
//!
//! Nodes live in id-keyed maps; each container (a project root or a
//! folder) keeps sorted sets of its direct child folder and file ids, so
//! parent and child navigation never scans the whole forest.
//!
//! Invariants enforced on every mutation:
//! - a folder's project equals its parent folder's project, and a file's
//!   project equals its folder's project;
//! - folder names are unique among sibling folders and file names among
//!   sibling files (case-sensitive);
//! - the folder graph is acyclic.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use tracing::error;

use cabinet_core::error::AppError;
use cabinet_core::result::AppResult;
use cabinet_core::types::{FileId, FolderId, NodeRef, ProjectId};
use cabinet_entity::file::{CreateFile, File};
use cabinet_entity::folder::{CreateFolder, Folder};
use cabinet_entity::project::{CreateProject, Project};
use cabinet_entity::snapshot::ForestSnapshot;
use cabinet_entity::storage::StorageQuota;

use crate::context::ActorContext;

/// The project forest.
#[derive(Debug, Default)]
pub struct TreeStore {
    projects: BTreeMap<ProjectId, Project>,
    folders: BTreeMap<FolderId, Folder>,
    files: BTreeMap<FileId, File>,
    child_folders: HashMap<NodeRef, BTreeSet<FolderId>>,
    child_files: HashMap<NodeRef, BTreeSet<FileId>>,
    quota: Option<StorageQuota>,
    next_project: i64,
    next_folder: i64,
    next_file: i64,
}

/// Check a node name before it enters the tree.
pub fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation("Name must not be empty"));
    }
    if name.contains('/') {
        return Err(AppError::validation(format!(
            "Name '{name}' must not contain '/'"
        )));
    }
    Ok(())
}

impl TreeStore {
    /// Create an empty forest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a forest from a snapshot, checking every link and invariant.
    ///
    /// Dangling parent links and cycles are reported as `DataIntegrity`;
    /// duplicate sibling names as `ConstraintViolation`.
    pub fn from_snapshot(snapshot: ForestSnapshot) -> AppResult<Self> {
        let mut store = Self::new();
        store.quota = snapshot.quota;

        for project in snapshot.projects {
            store.next_project = store.next_project.max(project.id.get());
            store.projects.insert(project.id, project);
        }
        for folder in snapshot.folders {
            store.next_folder = store.next_folder.max(folder.id.get());
            store.folders.insert(folder.id, folder);
        }
        for file in snapshot.files {
            store.next_file = store.next_file.max(file.id.get());
            store.files.insert(file.id, file);
        }

        let folders: Vec<Folder> = store.folders.values().cloned().collect();
        for folder in &folders {
            if !store.projects.contains_key(&folder.project_id) {
                return Err(integrity(format!(
                    "Folder {} references missing project {}",
                    folder.id, folder.project_id
                )));
            }
            if let Some(parent_id) = folder.parent_id {
                let parent = store.folders.get(&parent_id).ok_or_else(|| {
                    integrity(format!(
                        "Folder {} references missing parent {parent_id}",
                        folder.id
                    ))
                })?;
                if parent.project_id != folder.project_id {
                    return Err(integrity(format!(
                        "Folder {} is in project {} but its parent is in project {}",
                        folder.id, folder.project_id, parent.project_id
                    )));
                }
            }
            store.check_folder_name_free(folder.container(), &folder.name, Some(folder.id))?;
            store
                .child_folders
                .entry(folder.container())
                .or_default()
                .insert(folder.id);
        }

        let files: Vec<File> = store.files.values().cloned().collect();
        for file in &files {
            store.check_container(file.project_id, file.folder_id).map_err(|e| {
                integrity(format!("File {} has an invalid parent: {}", file.id, e.message))
            })?;
            store.check_file_name_free(file.container(), &file.name, Some(file.id))?;
            store
                .child_files
                .entry(file.container())
                .or_default()
                .insert(file.id);
        }

        for folder in &folders {
            // every folder must reach a project root within `folders.len()` hops
            let mut current = folder.parent_id;
            let mut hops = 0;
            while let Some(id) = current {
                hops += 1;
                if hops > folders.len() {
                    return Err(integrity(format!("Folder {} is part of a cycle", folder.id)));
                }
                current = store.folders.get(&id).and_then(|f| f.parent_id);
            }
        }

        Ok(store)
    }

    /// Export every record.
    pub fn snapshot(&self) -> ForestSnapshot {
        ForestSnapshot {
            projects: self.projects.values().cloned().collect(),
            folders: self.folders.values().cloned().collect(),
            files: self.files.values().cloned().collect(),
            quota: self.quota,
        }
    }

    // ── Lookup ──────────────────────────────────────────────────────────

    /// Get a project by ID.
    pub fn project(&self, id: ProjectId) -> AppResult<&Project> {
        self.projects
            .get(&id)
            .ok_or_else(|| AppError::not_found(format!("Project {id} not found")))
    }

    /// Get a folder by ID.
    pub fn folder(&self, id: FolderId) -> AppResult<&Folder> {
        self.folders
            .get(&id)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))
    }

    /// Get a file by ID.
    pub fn file(&self, id: FileId) -> AppResult<&File> {
        self.files
            .get(&id)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    /// Find a project by its unique name.
    pub fn project_by_name(&self, name: &str) -> Option<&Project> {
        self.projects.values().find(|p| p.name == name)
    }

    /// Find a folder by slug.
    pub fn folder_by_slug(&self, slug: &str) -> Option<&Folder> {
        self.folders.values().find(|f| f.slug.as_deref() == Some(slug))
    }

    /// Find a file by slug.
    pub fn file_by_slug(&self, slug: &str) -> Option<&File> {
        self.files.values().find(|f| f.slug.as_deref() == Some(slug))
    }

    /// All projects ordered by ID.
    pub fn projects(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    /// All folders ordered by ID.
    pub fn folders(&self) -> impl Iterator<Item = &Folder> {
        self.folders.values()
    }

    /// All files ordered by ID.
    pub fn files(&self) -> impl Iterator<Item = &File> {
        self.files.values()
    }

    /// Whether the node exists.
    pub fn contains(&self, node: NodeRef) -> bool {
        match node {
            NodeRef::Project(id) => self.projects.contains_key(&id),
            NodeRef::Folder(id) => self.folders.contains_key(&id),
            NodeRef::File(id) => self.files.contains_key(&id),
        }
    }

    /// Name of any node.
    pub fn name_of(&self, node: NodeRef) -> AppResult<&str> {
        Ok(match node {
            NodeRef::Project(id) => self.project(id)?.name.as_str(),
            NodeRef::Folder(id) => self.folder(id)?.name.as_str(),
            NodeRef::File(id) => self.file(id)?.name.as_str(),
        })
    }

    /// The project a node belongs to.
    pub fn project_of(&self, node: NodeRef) -> AppResult<ProjectId> {
        Ok(match node {
            NodeRef::Project(id) => self.project(id)?.id,
            NodeRef::Folder(id) => self.folder(id)?.project_id,
            NodeRef::File(id) => self.file(id)?.project_id,
        })
    }

    /// The container of a node; None for projects.
    pub fn parent_of(&self, node: NodeRef) -> AppResult<Option<NodeRef>> {
        Ok(match node {
            NodeRef::Project(id) => {
                self.project(id)?;
                None
            }
            NodeRef::Folder(id) => Some(self.folder(id)?.container()),
            NodeRef::File(id) => Some(self.file(id)?.container()),
        })
    }

    /// Direct child folders of a container, names ascending.
    pub fn child_folders(&self, container: NodeRef) -> Vec<&Folder> {
        let mut folders: Vec<&Folder> = self
            .child_folders
            .get(&container)
            .into_iter()
            .flatten()
            .filter_map(|id| self.folders.get(id))
            .collect();
        folders.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        folders
    }

    /// Direct child files of a container, names ascending.
    pub fn child_files(&self, container: NodeRef) -> Vec<&File> {
        let mut files: Vec<&File> = self
            .child_files
            .get(&container)
            .into_iter()
            .flatten()
            .filter_map(|id| self.files.get(id))
            .collect();
        files.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        files
    }

    /// Whether a container has no child folders and no child files.
    pub fn has_children(&self, container: NodeRef) -> bool {
        self.child_folders.get(&container).is_some_and(|s| !s.is_empty())
            || self.child_files.get(&container).is_some_and(|s| !s.is_empty())
    }

    /// Every folder below a container, breadth-first; siblings by name.
    pub fn descendant_folders(&self, container: NodeRef) -> Vec<FolderId> {
        let mut out = Vec::new();
        let mut queue = VecDeque::from([container]);
        while let Some(node) = queue.pop_front() {
            for folder in self.child_folders(node) {
                out.push(folder.id);
                queue.push_back(NodeRef::Folder(folder.id));
            }
        }
        out
    }

    /// Every file below a node in canonical order: shallower files before
    /// deeper ones, and within one container names ascending. A file node
    /// yields itself.
    pub fn subtree_files(&self, node: NodeRef) -> Vec<&File> {
        if let NodeRef::File(id) = node {
            return self.files.get(&id).into_iter().collect();
        }
        let mut out = Vec::new();
        let mut queue = VecDeque::from([node]);
        while let Some(container) = queue.pop_front() {
            out.extend(self.child_files(container));
            for folder in self.child_folders(container) {
                queue.push_back(NodeRef::Folder(folder.id));
            }
        }
        out
    }

    /// Whether `folder` is `node` itself or one of its ancestors.
    pub fn is_ancestor_or_self(&self, folder: FolderId, node: NodeRef) -> bool {
        let mut current = match node {
            NodeRef::Project(_) => None,
            NodeRef::Folder(id) => Some(id),
            NodeRef::File(id) => self.files.get(&id).and_then(|f| f.folder_id),
        };
        while let Some(id) = current {
            if id == folder {
                return true;
            }
            current = self.folders.get(&id).and_then(|f| f.parent_id);
        }
        false
    }

    /// Cached `(size, is_public)` of a node.
    pub fn aggregate(&self, node: NodeRef) -> AppResult<(i64, bool)> {
        Ok(match node {
            NodeRef::Project(id) => {
                let p = self.project(id)?;
                (p.size_bytes, p.is_public)
            }
            NodeRef::Folder(id) => {
                let f = self.folder(id)?;
                (f.size_bytes, f.is_public)
            }
            NodeRef::File(id) => {
                let f = self.file(id)?;
                (f.size_bytes, f.is_public)
            }
        })
    }

    /// Overwrite the cached aggregate of a node.
    pub fn set_aggregate(&mut self, node: NodeRef, size: i64, is_public: bool) -> AppResult<()> {
        match node {
            NodeRef::Project(id) => {
                let p = self.project_mut(id)?;
                p.size_bytes = size;
                p.is_public = is_public;
            }
            NodeRef::Folder(id) => {
                let f = self.folder_mut(id)?;
                f.size_bytes = size;
                f.is_public = is_public;
            }
            NodeRef::File(id) => {
                let f = self.file_mut(id)?;
                f.size_bytes = size;
                f.is_public = is_public;
            }
        }
        Ok(())
    }

    /// The recorded quota, if any.
    pub fn quota(&self) -> Option<StorageQuota> {
        self.quota
    }

    /// Record a quota.
    pub fn set_quota(&mut self, quota: StorageQuota) {
        self.quota = Some(quota);
    }

    /// Bytes used by every project together.
    pub fn used_space(&self) -> i64 {
        self.projects.values().map(|p| p.size_bytes).sum()
    }

    // ── Validation ──────────────────────────────────────────────────────

    /// Check that `(project, folder)` names an existing container whose
    /// folder, if any, belongs to `project`.
    pub fn check_container(&self, project: ProjectId, folder: Option<FolderId>) -> AppResult<()> {
        self.project(project)?;
        if let Some(folder_id) = folder {
            let folder = self.folder(folder_id)?;
            if folder.project_id != project {
                return Err(AppError::constraint(format!(
                    "Folder {folder_id} does not belong to project {project}"
                )));
            }
        }
        Ok(())
    }

    /// Fail if a sibling folder already uses `name`.
    pub fn check_folder_name_free(
        &self,
        container: NodeRef,
        name: &str,
        except: Option<FolderId>,
    ) -> AppResult<()> {
        let taken = self
            .child_folders(container)
            .iter()
            .any(|f| f.name == name && Some(f.id) != except);
        if taken {
            return Err(AppError::constraint(format!(
                "A folder named '{name}' already exists in {container}"
            )));
        }
        Ok(())
    }

    /// Fail if a sibling file already uses `name`.
    pub fn check_file_name_free(
        &self,
        container: NodeRef,
        name: &str,
        except: Option<FileId>,
    ) -> AppResult<()> {
        let taken = self
            .child_files(container)
            .iter()
            .any(|f| f.name == name && Some(f.id) != except);
        if taken {
            return Err(AppError::constraint(format!(
                "A file named '{name}' already exists in {container}"
            )));
        }
        Ok(())
    }

    // ── Creation ────────────────────────────────────────────────────────

    /// Create a project with a unique name.
    pub fn create_project(&mut self, data: CreateProject, ctx: &ActorContext) -> AppResult<Project> {
        validate_name(&data.name)?;
        if self.project_by_name(&data.name).is_some() {
            return Err(AppError::constraint(format!(
                "A project named '{}' already exists",
                data.name
            )));
        }
        self.next_project += 1;
        let project = Project {
            id: ProjectId(self.next_project),
            name: data.name,
            slug: None,
            owner_id: data.owner_id,
            is_public: false,
            size_bytes: 0,
            members: Vec::new(),
            updated_by: ctx.user_id,
            updated_at: ctx.at,
        };
        self.projects.insert(project.id, project.clone());
        Ok(project)
    }

    /// Create a folder under a project root or another folder.
    pub fn create_folder(&mut self, data: CreateFolder, ctx: &ActorContext) -> AppResult<Folder> {
        validate_name(&data.name)?;
        self.check_container(data.project_id, data.parent_id)?;
        let container = NodeRef::container(data.project_id, data.parent_id);
        self.check_folder_name_free(container, &data.name, None)?;

        self.next_folder += 1;
        let folder = Folder {
            id: FolderId(self.next_folder),
            project_id: data.project_id,
            parent_id: data.parent_id,
            name: data.name,
            slug: None,
            owner_id: data.owner_id,
            is_public: false,
            size_bytes: 0,
            updated_by: ctx.user_id,
            updated_at: ctx.at,
        };
        self.folders.insert(folder.id, folder.clone());
        self.child_folders.entry(container).or_default().insert(folder.id);
        Ok(folder)
    }

    /// Reserve the ID the next created file will get.
    pub fn allocate_file_id(&mut self) -> FileId {
        self.next_file += 1;
        FileId(self.next_file)
    }

    /// Insert a file record under a previously allocated ID.
    pub fn insert_file(
        &mut self,
        id: FileId,
        data: CreateFile,
        remote_key: String,
        size_bytes: i64,
        ctx: &ActorContext,
    ) -> AppResult<File> {
        validate_name(&data.name)?;
        if self.files.contains_key(&id) {
            return Err(AppError::constraint(format!("File {id} already exists")));
        }
        self.check_container(data.project_id, data.folder_id)?;
        let container = NodeRef::container(data.project_id, data.folder_id);
        self.check_file_name_free(container, &data.name, None)?;

        let file = File {
            id,
            project_id: data.project_id,
            folder_id: data.folder_id,
            name: data.name,
            remote_key,
            size_bytes,
            is_public: data.is_public,
            slug: None,
            owner_id: data.owner_id,
            updated_by: ctx.user_id,
            updated_at: ctx.at,
        };
        self.next_file = self.next_file.max(id.get());
        self.files.insert(file.id, file.clone());
        self.child_files.entry(container).or_default().insert(file.id);
        Ok(file)
    }

    // ── Mutation ────────────────────────────────────────────────────────

    /// Change a node's display name after checking its siblings.
    pub fn rename(&mut self, node: NodeRef, name: &str, ctx: &ActorContext) -> AppResult<String> {
        validate_name(name)?;
        let old = match node {
            NodeRef::Project(id) => {
                if self.projects.values().any(|p| p.name == name && p.id != id) {
                    return Err(AppError::constraint(format!(
                        "A project named '{name}' already exists"
                    )));
                }
                let p = self.project_mut(id)?;
                std::mem::replace(&mut p.name, name.to_string())
            }
            NodeRef::Folder(id) => {
                let container = self.folder(id)?.container();
                self.check_folder_name_free(container, name, Some(id))?;
                let f = self.folder_mut(id)?;
                std::mem::replace(&mut f.name, name.to_string())
            }
            NodeRef::File(id) => {
                let container = self.file(id)?.container();
                self.check_file_name_free(container, name, Some(id))?;
                let f = self.file_mut(id)?;
                std::mem::replace(&mut f.name, name.to_string())
            }
        };
        self.touch(node, ctx)?;
        Ok(old)
    }

    /// Point a file at a new container and object key.
    pub fn reparent_file(
        &mut self,
        id: FileId,
        project: ProjectId,
        folder: Option<FolderId>,
        remote_key: String,
        ctx: &ActorContext,
    ) -> AppResult<()> {
        self.check_container(project, folder)?;
        let file = self.file(id)?;
        let old_container = file.container();
        let new_container = NodeRef::container(project, folder);
        self.check_file_name_free(new_container, &file.name, Some(id))?;

        self.unlink_file(old_container, id);
        let file = self.file_mut(id)?;
        file.project_id = project;
        file.folder_id = folder;
        file.remote_key = remote_key;
        file.updated_by = ctx.user_id;
        file.updated_at = ctx.at;
        self.child_files.entry(new_container).or_default().insert(id);
        Ok(())
    }

    /// Move a folder under a new container. Every descendant follows the
    /// folder into `project`; object keys are left untouched.
    pub fn reparent_folder(
        &mut self,
        id: FolderId,
        project: ProjectId,
        parent: Option<FolderId>,
        ctx: &ActorContext,
    ) -> AppResult<()> {
        self.check_container(project, parent)?;
        let folder = self.folder(id)?;
        if let Some(parent_id) = parent {
            if self.is_ancestor_or_self(id, NodeRef::Folder(parent_id)) {
                return Err(AppError::constraint(format!(
                    "Cannot move folder {id} into itself or one of its subfolders"
                )));
            }
        }
        let old_container = folder.container();
        let new_container = NodeRef::container(project, parent);
        self.check_folder_name_free(new_container, &folder.name, Some(id))?;
        let old_project = folder.project_id;

        self.unlink_folder(old_container, id);
        let folder = self.folder_mut(id)?;
        folder.project_id = project;
        folder.parent_id = parent;
        folder.updated_by = ctx.user_id;
        folder.updated_at = ctx.at;
        self.child_folders.entry(new_container).or_default().insert(id);

        if old_project != project {
            let root = NodeRef::Folder(id);
            let folder_ids = self.descendant_folders(root);
            let file_ids: Vec<FileId> = self.subtree_files(root).iter().map(|f| f.id).collect();
            for folder_id in folder_ids {
                self.folder_mut(folder_id)?.project_id = project;
            }
            for file_id in file_ids {
                self.file_mut(file_id)?.project_id = project;
            }
        }
        Ok(())
    }

    /// Remove a file record; its blob must already be gone.
    pub fn delete_file(&mut self, id: FileId) -> AppResult<File> {
        let container = self.file(id)?.container();
        self.unlink_file(container, id);
        self.files
            .remove(&id)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    /// Remove a folder and its whole subtree, returning the removed files.
    pub fn delete_folder(&mut self, id: FolderId) -> AppResult<Vec<File>> {
        let container = self.folder(id)?.container();
        let root = NodeRef::Folder(id);
        let file_ids: Vec<FileId> = self.subtree_files(root).iter().map(|f| f.id).collect();
        let mut folder_ids = self.descendant_folders(root);
        folder_ids.push(id);

        let mut removed = Vec::with_capacity(file_ids.len());
        for file_id in file_ids {
            removed.push(self.delete_file(file_id)?);
        }
        for folder_id in &folder_ids {
            self.child_folders.remove(&NodeRef::Folder(*folder_id));
            self.child_files.remove(&NodeRef::Folder(*folder_id));
            self.folders.remove(folder_id);
        }
        self.unlink_folder(container, id);
        Ok(removed)
    }

    /// Set a node's slug.
    pub fn set_slug(&mut self, node: NodeRef, slug: String) -> AppResult<()> {
        match node {
            NodeRef::Project(id) => self.project_mut(id)?.slug = Some(slug),
            NodeRef::Folder(id) => self.folder_mut(id)?.slug = Some(slug),
            NodeRef::File(id) => self.file_mut(id)?.slug = Some(slug),
        }
        Ok(())
    }

    /// Whether any node of the same kind as `node` already uses `slug`.
    pub fn slug_taken(&self, node: NodeRef, slug: &str) -> bool {
        match node {
            NodeRef::Project(_) => self.projects.values().any(|p| p.slug.as_deref() == Some(slug)),
            NodeRef::Folder(_) => self.folder_by_slug(slug).is_some(),
            NodeRef::File(_) => self.file_by_slug(slug).is_some(),
        }
    }

    /// Stamp `updated_by` / `updated_at` on a node.
    pub fn touch(&mut self, node: NodeRef, ctx: &ActorContext) -> AppResult<()> {
        let (by, at) = match node {
            NodeRef::Project(id) => {
                let p = self.project_mut(id)?;
                (&mut p.updated_by, &mut p.updated_at)
            }
            NodeRef::Folder(id) => {
                let f = self.folder_mut(id)?;
                (&mut f.updated_by, &mut f.updated_at)
            }
            NodeRef::File(id) => {
                let f = self.file_mut(id)?;
                (&mut f.updated_by, &mut f.updated_at)
            }
        };
        *by = ctx.user_id;
        *at = ctx.at;
        Ok(())
    }

    fn project_mut(&mut self, id: ProjectId) -> AppResult<&mut Project> {
        self.projects
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Project {id} not found")))
    }

    fn folder_mut(&mut self, id: FolderId) -> AppResult<&mut Folder> {
        self.folders
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Folder {id} not found")))
    }

    fn file_mut(&mut self, id: FileId) -> AppResult<&mut File> {
        self.files
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    fn unlink_file(&mut self, container: NodeRef, id: FileId) {
        if let Some(set) = self.child_files.get_mut(&container) {
            set.remove(&id);
        }
    }

    fn unlink_folder(&mut self, container: NodeRef, id: FolderId) {
        if let Some(set) = self.child_folders.get_mut(&container) {
            set.remove(&id);
        }
    }
}

fn integrity(message: String) -> AppError {
    error!(%message, "Tree integrity violation");
    AppError::data_integrity(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabinet_core::error::ErrorKind;

    fn ctx() -> ActorContext {
        ActorContext::system()
    }

    fn project(store: &mut TreeStore, name: &str) -> ProjectId {
        store
            .create_project(
                CreateProject {
                    name: name.into(),
                    owner_id: None,
                },
                &ctx(),
            )
            .unwrap()
            .id
    }

    fn folder(store: &mut TreeStore, p: ProjectId, parent: Option<FolderId>, name: &str) -> FolderId {
        store
            .create_folder(
                CreateFolder {
                    project_id: p,
                    parent_id: parent,
                    name: name.into(),
                    owner_id: None,
                },
                &ctx(),
            )
            .unwrap()
            .id
    }

    fn file(store: &mut TreeStore, p: ProjectId, folder: Option<FolderId>, name: &str) -> FileId {
        let id = store.allocate_file_id();
        store
            .insert_file(
                id,
                CreateFile {
                    project_id: p,
                    folder_id: folder,
                    name: name.into(),
                    remote_key: None,
                    is_public: false,
                    owner_id: None,
                },
                format!("{p}/{id}-{name}"),
                0,
                &ctx(),
            )
            .unwrap()
            .id
    }

    #[test]
    fn test_sibling_folder_names_are_unique() {
        let mut store = TreeStore::new();
        let p = project(&mut store, "P");
        folder(&mut store, p, None, "Docs");

        let err = store
            .create_folder(
                CreateFolder {
                    project_id: p,
                    parent_id: None,
                    name: "Docs".into(),
                    owner_id: None,
                },
                &ctx(),
            )
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConstraintViolation);

        // case-sensitive: a different case is a different name
        folder(&mut store, p, None, "docs");
    }

    #[test]
    fn test_folder_and_file_may_share_a_name() {
        let mut store = TreeStore::new();
        let p = project(&mut store, "P");
        folder(&mut store, p, None, "report");
        file(&mut store, p, None, "report");
        assert_eq!(store.child_files(NodeRef::Project(p)).len(), 1);
    }

    #[test]
    fn test_parent_must_be_in_same_project() {
        let mut store = TreeStore::new();
        let p = project(&mut store, "P");
        let q = project(&mut store, "Q");
        let a = folder(&mut store, p, None, "A");

        let err = store
            .create_folder(
                CreateFolder {
                    project_id: q,
                    parent_id: Some(a),
                    name: "X".into(),
                    owner_id: None,
                },
                &ctx(),
            )
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConstraintViolation);
    }

    #[test]
    fn test_reparent_folder_rejects_cycles() {
        let mut store = TreeStore::new();
        let p = project(&mut store, "P");
        let a = folder(&mut store, p, None, "A");
        let b = folder(&mut store, p, Some(a), "B");

        let err = store.reparent_folder(a, p, Some(b), &ctx()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConstraintViolation);
        let err = store.reparent_folder(a, p, Some(a), &ctx()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ConstraintViolation);
    }

    #[test]
    fn test_reparent_folder_across_projects_moves_descendants() {
        let mut store = TreeStore::new();
        let p = project(&mut store, "P");
        let q = project(&mut store, "Q");
        let a = folder(&mut store, p, None, "A");
        let b = folder(&mut store, p, Some(a), "B");
        let f = file(&mut store, p, Some(b), "f.txt");
        let key_before = store.file(f).unwrap().remote_key.clone();

        store.reparent_folder(a, q, None, &ctx()).unwrap();

        assert_eq!(store.folder(b).unwrap().project_id, q);
        assert_eq!(store.file(f).unwrap().project_id, q);
        assert_eq!(store.file(f).unwrap().remote_key, key_before);
        assert!(store.child_folders(NodeRef::Project(p)).is_empty());
        assert_eq!(store.child_folders(NodeRef::Project(q)).len(), 1);
    }

    #[test]
    fn test_delete_folder_returns_subtree_files() {
        let mut store = TreeStore::new();
        let p = project(&mut store, "P");
        let a = folder(&mut store, p, None, "A");
        let b = folder(&mut store, p, Some(a), "B");
        file(&mut store, p, Some(a), "1.txt");
        file(&mut store, p, Some(b), "2.txt");
        let keep = file(&mut store, p, None, "3.txt");

        let removed = store.delete_folder(a).unwrap();
        assert_eq!(removed.len(), 2);
        assert!(!store.contains(NodeRef::Folder(b)));
        assert!(store.contains(NodeRef::File(keep)));
        assert!(!store.has_children(NodeRef::Folder(a)));
    }

    #[test]
    fn test_subtree_files_canonical_order() {
        let mut store = TreeStore::new();
        let p = project(&mut store, "P");
        let a = folder(&mut store, p, None, "A");
        file(&mut store, p, Some(a), "deep.txt");
        file(&mut store, p, None, "z.txt");
        file(&mut store, p, None, "b.txt");

        let names: Vec<&str> = store
            .subtree_files(NodeRef::Project(p))
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["b.txt", "z.txt", "deep.txt"]);
    }

    #[test]
    fn test_snapshot_round_trip_restores_indexes() {
        let mut store = TreeStore::new();
        let p = project(&mut store, "P");
        let a = folder(&mut store, p, None, "A");
        file(&mut store, p, Some(a), "x.txt");

        let json = serde_json::to_string(&store.snapshot()).unwrap();
        let restored = TreeStore::from_snapshot(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(restored.child_files(NodeRef::Folder(a)).len(), 1);

        // new ids continue after the restored ones
        let mut restored = restored;
        assert!(restored.allocate_file_id().get() > 1);
    }

    #[test]
    fn test_snapshot_with_dangling_parent_is_integrity_error() {
        let mut store = TreeStore::new();
        let p = project(&mut store, "P");
        let a = folder(&mut store, p, None, "A");
        let b = folder(&mut store, p, Some(a), "B");

        let mut snapshot = store.snapshot();
        snapshot.folders.retain(|f| f.id != a);
        let err = TreeStore::from_snapshot(snapshot).unwrap_err();
        assert_eq!(err.kind, ErrorKind::DataIntegrity);
        let _ = b;
    }
}
