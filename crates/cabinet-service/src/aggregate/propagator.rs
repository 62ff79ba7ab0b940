//! Cached size and visibility maintenance.
//!
//! A folder's size is the sum of its direct child files and folders, and
//! it is public when any direct child is. A project aggregates its
//! root-level children the same way. After every pass each ancestor of a
//! touched node satisfies both rules again.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use cabinet_core::error::AppError;
use cabinet_core::events::TreeEvent;
use cabinet_core::result::AppResult;
use cabinet_core::types::{FileId, NodeRef, ProjectId};
use cabinet_storage::ObjectStoreGateway;

use crate::context::ActorContext;
use crate::events::EventBus;
use crate::relocation::lock::ProjectLocks;
use crate::relocation::report::NodeOutcome;
use crate::tree::{SharedTree, TreeStore};

/// Result of a full size recalculation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecalculateReport {
    /// Files whose blob size was looked up.
    pub files_checked: usize,
    /// Files whose cached size differed from the blob.
    pub sizes_changed: usize,
    /// Files whose blob could not be read; their cached size is kept.
    pub failures: Vec<NodeOutcome>,
}

/// Aggregate of a container computed from its direct children.
fn children_aggregate(tree: &TreeStore, container: NodeRef) -> (i64, bool) {
    let files = tree.child_files(container);
    let folders = tree.child_folders(container);
    let size = files.iter().map(|f| f.size_bytes).sum::<i64>()
        + folders.iter().map(|f| f.size_bytes).sum::<i64>();
    let is_public = files.iter().any(|f| f.is_public) || folders.iter().any(|f| f.is_public);
    (size, is_public)
}

/// Convert a blob length to the signed size column.
fn stored_size(size: u64) -> AppResult<i64> {
    i64::try_from(size)
        .map_err(|_| AppError::data_integrity(format!("Blob of {size} bytes is too large")))
}

pub(crate) fn changed(node: NodeRef, size: i64, is_public: bool) -> TreeEvent {
    TreeEvent::AggregateChanged {
        node,
        size: size.max(0) as u64,
        is_public,
    }
}

/// Walk upward from `start` (a file starts at its container), refreshing
/// each level until one is unchanged or the project has been updated.
pub(crate) fn propagate_from(tree: &mut TreeStore, start: NodeRef) -> AppResult<Vec<TreeEvent>> {
    let mut events = Vec::new();
    let mut current = match start {
        NodeRef::File(_) => tree.parent_of(start)?,
        other => Some(other),
    };

    while let Some(node) = current {
        let (size, is_public) = children_aggregate(tree, node);
        if tree.aggregate(node)? == (size, is_public) {
            break;
        }
        tree.set_aggregate(node, size, is_public)?;
        events.push(changed(node, size, is_public));
        current = tree.parent_of(node)?;
    }
    Ok(events)
}

/// Refresh every folder under `node` bottom-up, then `node` itself, then
/// continue upward from its parent.
pub(crate) fn recompute_subtree_in(
    tree: &mut TreeStore,
    node: NodeRef,
) -> AppResult<Vec<TreeEvent>> {
    if node.is_file() {
        return propagate_from(tree, node);
    }

    let mut events = Vec::new();
    // breadth-first order reversed visits every folder after its descendants
    let mut order: Vec<NodeRef> = tree
        .descendant_folders(node)
        .into_iter()
        .map(NodeRef::Folder)
        .collect();
    order.reverse();
    order.push(node);

    for container in order {
        let (size, is_public) = children_aggregate(tree, container);
        if tree.aggregate(container)? != (size, is_public) {
            tree.set_aggregate(container, size, is_public)?;
            events.push(changed(container, size, is_public));
        }
    }

    if let Some(parent) = tree.parent_of(node)? {
        events.extend(propagate_from(tree, parent)?);
    }
    Ok(events)
}

/// Keeps cached aggregates consistent after mutations.
#[derive(Debug, Clone)]
pub struct AggregatePropagator {
    pub(crate) tree: SharedTree,
    pub(crate) gateway: ObjectStoreGateway,
    pub(crate) locks: ProjectLocks,
    pub(crate) events: EventBus,
}

impl AggregatePropagator {
    /// Create a propagator over the shared forest.
    pub fn new(
        tree: SharedTree,
        gateway: ObjectStoreGateway,
        locks: ProjectLocks,
        events: EventBus,
    ) -> Self {
        Self {
            tree,
            gateway,
            locks,
            events,
        }
    }

    /// Recompute `node` and propagate upward.
    ///
    /// For a file the size is re-read from the object store first.
    pub async fn recompute(&self, node: NodeRef) -> AppResult<()> {
        let project = self.tree.read().await.project_of(node)?;
        let _guard = self.locks.lock(project).await;

        let blob_size = match node {
            NodeRef::File(id) => {
                let key = self.tree.read().await.file(id)?.remote_key.clone();
                Some(stored_size(self.gateway.blob_size(&key).await?)?)
            }
            _ => None,
        };

        let events = {
            let mut tree = self.tree.write().await;
            let mut events = Vec::new();
            if let Some(size) = blob_size {
                let (cached, is_public) = tree.aggregate(node)?;
                if cached != size {
                    tree.set_aggregate(node, size, is_public)?;
                    events.push(changed(node, size, is_public));
                }
            }
            events.extend(propagate_from(&mut tree, node)?);
            events
        };

        debug!(%node, changed = events.len(), "Aggregates recomputed");
        self.events.publish_all(events);
        Ok(())
    }

    /// Make one file public or private and propagate.
    pub async fn set_file_visibility(
        &self,
        ctx: &ActorContext,
        file: FileId,
        is_public: bool,
    ) -> AppResult<()> {
        let node = NodeRef::File(file);
        let project = self.tree.read().await.project_of(node)?;
        let _guard = self.locks.lock(project).await;

        let events = {
            let mut tree = self.tree.write().await;
            let (size, was_public) = tree.aggregate(node)?;
            if was_public == is_public {
                return Ok(());
            }
            tree.set_aggregate(node, size, is_public)?;
            tree.touch(node, ctx)?;
            let mut events = vec![changed(node, size, is_public)];
            events.extend(propagate_from(&mut tree, node)?);
            events
        };

        info!(file_id = %file, is_public, "File visibility changed");
        self.events.publish_all(events);
        Ok(())
    }

    /// Rebuild every folder aggregate below `node`, then propagate upward.
    pub async fn recompute_subtree(&self, node: NodeRef) -> AppResult<()> {
        let project = self.tree.read().await.project_of(node)?;
        let _guard = self.locks.lock(project).await;

        let events = {
            let mut tree = self.tree.write().await;
            recompute_subtree_in(&mut tree, node)?
        };
        self.events.publish_all(events);
        Ok(())
    }

    /// Re-read every file size from the store and rebuild all aggregates.
    ///
    /// Files whose blob cannot be read keep their cached size and are
    /// listed in the report.
    pub async fn recalculate_all(&self) -> AppResult<RecalculateReport> {
        let (projects, files): (Vec<ProjectId>, Vec<(FileId, String)>) = {
            let tree = self.tree.read().await;
            (
                tree.projects().map(|p| p.id).collect(),
                tree.files().map(|f| (f.id, f.remote_key.clone())).collect(),
            )
        };
        let _guards = self.locks.lock_many(projects.iter().copied()).await;

        let mut report = RecalculateReport::default();
        let mut sizes = Vec::with_capacity(files.len());
        for (id, key) in files {
            report.files_checked += 1;
            match self.gateway.blob_size(&key).await.and_then(stored_size) {
                Ok(size) => sizes.push((id, size)),
                Err(e) => {
                    warn!(file_id = %id, key = %key, error = %e, "Blob size unavailable");
                    report.failures.push(NodeOutcome::failed(NodeRef::File(id), &e));
                }
            }
        }

        let events = {
            let mut tree = self.tree.write().await;
            let mut events = Vec::new();
            for (id, size) in sizes {
                let node = NodeRef::File(id);
                // the file may have been deleted while its blob was read
                let Ok((cached, is_public)) = tree.aggregate(node) else {
                    continue;
                };
                if cached != size {
                    tree.set_aggregate(node, size, is_public)?;
                    report.sizes_changed += 1;
                    events.push(changed(node, size, is_public));
                }
            }
            for project in &projects {
                let node = NodeRef::Project(*project);
                if tree.contains(node) {
                    events.extend(recompute_subtree_in(&mut tree, node)?);
                }
            }
            events
        };

        info!(
            files = report.files_checked,
            changed = report.sizes_changed,
            failed = report.failures.len(),
            "Sizes recalculated"
        );
        self.events.publish_all(events);
        Ok(report)
    }

    /// True iff every file under `node` is public. An empty container is
    /// shared.
    pub async fn check_shared(&self, node: NodeRef) -> AppResult<bool> {
        let tree = self.tree.read().await;
        if !tree.contains(node) {
            return Err(AppError::not_found(format!("{node} not found")));
        }
        Ok(tree.subtree_files(node).iter().all(|f| f.is_public))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cabinet_entity::file::CreateFile;
    use cabinet_entity::folder::CreateFolder;
    use cabinet_entity::project::CreateProject;
    use cabinet_core::types::FolderId;

    fn add_file(
        tree: &mut TreeStore,
        p: ProjectId,
        folder: Option<FolderId>,
        name: &str,
        size: i64,
        public: bool,
    ) -> FileId {
        let ctx = ActorContext::system();
        let id = tree.allocate_file_id();
        tree.insert_file(
            id,
            CreateFile {
                project_id: p,
                folder_id: folder,
                name: name.into(),
                remote_key: None,
                is_public: public,
                owner_id: None,
            },
            format!("{p}/{id}-{name}"),
            size,
            &ctx,
        )
        .unwrap();
        id
    }

    #[test]
    fn test_propagate_from_stops_when_unchanged() {
        let ctx = ActorContext::system();
        let mut tree = TreeStore::new();
        let p = tree
            .create_project(CreateProject { name: "P".into(), owner_id: None }, &ctx)
            .unwrap()
            .id;
        let a = tree
            .create_folder(
                CreateFolder { project_id: p, parent_id: None, name: "A".into(), owner_id: None },
                &ctx,
            )
            .unwrap()
            .id;
        let f = add_file(&mut tree, p, Some(a), "f", 40, true);

        let events = propagate_from(&mut tree, NodeRef::File(f)).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(tree.aggregate(NodeRef::Folder(a)).unwrap(), (40, true));
        assert_eq!(tree.aggregate(NodeRef::Project(p)).unwrap(), (40, true));

        // second pass finds the first level unchanged and stops at once
        let events = propagate_from(&mut tree, NodeRef::File(f)).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_recompute_subtree_repairs_stale_folders() {
        let ctx = ActorContext::system();
        let mut tree = TreeStore::new();
        let p = tree
            .create_project(CreateProject { name: "P".into(), owner_id: None }, &ctx)
            .unwrap()
            .id;
        let a = tree
            .create_folder(
                CreateFolder { project_id: p, parent_id: None, name: "A".into(), owner_id: None },
                &ctx,
            )
            .unwrap()
            .id;
        let b = tree
            .create_folder(
                CreateFolder { project_id: p, parent_id: Some(a), name: "B".into(), owner_id: None },
                &ctx,
            )
            .unwrap()
            .id;
        add_file(&mut tree, p, Some(b), "x", 7, false);
        add_file(&mut tree, p, Some(a), "y", 3, false);

        recompute_subtree_in(&mut tree, NodeRef::Project(p)).unwrap();
        assert_eq!(tree.aggregate(NodeRef::Folder(b)).unwrap(), (7, false));
        assert_eq!(tree.aggregate(NodeRef::Folder(a)).unwrap(), (10, false));
        assert_eq!(tree.aggregate(NodeRef::Project(p)).unwrap(), (10, false));
    }

    #[test]
    fn test_stored_size_rejects_lengths_beyond_i64() {
        assert_eq!(stored_size(42).unwrap(), 42);
        let err = stored_size(u64::MAX).unwrap_err();
        assert_eq!(err.kind, cabinet_core::error::ErrorKind::DataIntegrity);
    }
}
