//! Moves and renames of files and folders.
//!
//! A file move renames its blob to a key under the destination's identity
//! path. The blob keeps its leaf segment unless another blob already holds
//! that key, in which case the leaf becomes `{id}-{name}`. It then commits the new parent and key, then refreshes the
//! aggregates on both sides. A folder move only flips the folder's own
//! parent and project pointers: descendants keep their object keys, which
//! remain valid because keys are looked up per file, never re-derived.

use std::collections::BTreeSet;

use tracing::{debug, error, info, warn};

use cabinet_core::error::AppError;
use cabinet_core::events::TreeEvent;
use cabinet_core::result::AppResult;
use cabinet_core::types::{FileId, FolderId, NodeRef, ProjectId};
use cabinet_storage::ObjectStoreGateway;

use super::lock::{ProjectGuards, ProjectLocks};
use super::report::{MoveReport, NodeOutcome};
use crate::aggregate::AggregatePropagator;
use crate::aggregate::propagator::propagate_from;
use crate::context::ActorContext;
use crate::events::EventBus;
use crate::path::PathResolver;
use crate::tree::SharedTree;

/// Relocates and renames nodes.
#[derive(Debug, Clone)]
pub struct RelocationEngine {
    tree: SharedTree,
    gateway: ObjectStoreGateway,
    resolver: PathResolver,
    locks: ProjectLocks,
    events: EventBus,
}

impl RelocationEngine {
    /// Create an engine sharing the propagator's forest, store, and locks.
    pub fn new(propagator: &AggregatePropagator, resolver: PathResolver) -> Self {
        Self {
            tree: propagator.tree.clone(),
            gateway: propagator.gateway.clone(),
            resolver,
            locks: propagator.locks.clone(),
            events: propagator.events.clone(),
        }
    }

    /// Move files and folders under `destination_folder` (or the root of
    /// `destination_project` when None).
    ///
    /// The destination is validated before any blob is touched: a folder
    /// outside `destination_project` fails the whole call with
    /// `InvalidDestination`. After that every node succeeds or fails on its
    /// own; a failed node stays where it was and earlier moves are kept.
    /// The report lists rejected nodes first, then files by id, then
    /// folders by id.
    pub async fn move_nodes(
        &self,
        ctx: &ActorContext,
        nodes: &[NodeRef],
        destination_project: ProjectId,
        destination_folder: Option<FolderId>,
    ) -> AppResult<MoveReport> {
        let mut report = MoveReport::default();
        let mut files = BTreeSet::new();
        let mut folders = BTreeSet::new();
        let mut touched = BTreeSet::from([destination_project]);

        {
            let tree = self.tree.read().await;
            tree.project(destination_project)?;
            if let Some(folder_id) = destination_folder {
                let folder = tree.folder(folder_id)?;
                if folder.project_id != destination_project {
                    return Err(AppError::invalid_destination(format!(
                        "Folder {folder_id} belongs to project {}, not {destination_project}",
                        folder.project_id
                    )));
                }
            }

            for node in nodes {
                match (node, tree.project_of(*node)) {
                    (_, Err(e)) => report.outcomes.push(NodeOutcome::failed(*node, &e)),
                    (NodeRef::Project(_), Ok(_)) => report.outcomes.push(NodeOutcome::failed(
                        *node,
                        &AppError::validation("Projects cannot be moved"),
                    )),
                    (NodeRef::File(id), Ok(project)) => {
                        files.insert(*id);
                        touched.insert(project);
                    }
                    (NodeRef::Folder(id), Ok(project)) => {
                        folders.insert(*id);
                        touched.insert(project);
                    }
                }
            }
        }

        let guards = self.locks.lock_many(touched).await;
        for id in files {
            let outcome = self
                .move_file(ctx, &guards, id, destination_project, destination_folder)
                .await;
            report.outcomes.push(outcome);
        }
        for id in folders {
            let outcome = self
                .move_folder(ctx, &guards, id, destination_project, destination_folder)
                .await;
            report.outcomes.push(outcome);
        }

        info!(
            destination = %NodeRef::container(destination_project, destination_folder),
            requested = nodes.len(),
            failed = report.failed().count(),
            "Move batch finished"
        );
        Ok(report)
    }

    /// First candidate key not occupied by another blob. The file's own
    /// current key always counts as free.
    async fn free_key(
        &self,
        node: NodeRef,
        old_key: &str,
        candidates: [String; 2],
    ) -> AppResult<String> {
        for key in candidates {
            if key == old_key || !self.gateway.exists(&key).await? {
                return Ok(key);
            }
            debug!(%node, key = %key, "Destination key taken");
        }
        Err(AppError::constraint(format!(
            "Every destination key for {node} is already taken"
        )))
    }

    async fn move_file(
        &self,
        ctx: &ActorContext,
        guards: &ProjectGuards,
        id: FileId,
        project: ProjectId,
        folder: Option<FolderId>,
    ) -> NodeOutcome {
        let node = NodeRef::File(id);
        let destination = NodeRef::container(project, folder);

        let planned = {
            let tree = self.tree.read().await;
            tree.file(id).and_then(|file| {
                if !guards.projects().contains(&file.project_id) {
                    return Err(AppError::internal(format!(
                        "{node} changed project while the move was queued"
                    )));
                }
                if file.container() == destination {
                    return Ok(None);
                }
                tree.check_file_name_free(destination, &file.name, Some(id))?;
                let candidates = [
                    self.resolver.remote_key_for(&tree, file, destination)?,
                    self.resolver.mint_key(&tree, id, &file.name, destination)?,
                ];
                Ok(Some((file.container(), file.folder_id, file.project_id, file.remote_key.clone(), candidates)))
            })
        };
        let (old_container, old_folder, old_project, old_key, candidates) = match planned {
            Ok(Some(plan)) => plan,
            Ok(None) => return NodeOutcome::unchanged(node),
            Err(e) => {
                warn!(%node, error = %e, "File move rejected");
                return NodeOutcome::failed(node, &e);
            }
        };
        let new_key = match self.free_key(node, &old_key, candidates).await {
            Ok(key) => key,
            Err(e) => {
                warn!(%node, error = %e, "No free destination key");
                return NodeOutcome::failed(node, &e);
            }
        };

        if old_key != new_key {
            if let Err(e) = self.gateway.rename_blob(&old_key, &new_key).await {
                warn!(%node, %old_key, %new_key, error = %e, "Blob rename failed; file left in place");
                return NodeOutcome::failed(node, &e);
            }
        }

        let committed = {
            let mut tree = self.tree.write().await;
            tree.reparent_file(id, project, folder, new_key.clone(), ctx)
                .and_then(|()| {
                    let mut events = vec![TreeEvent::FileMoved {
                        file_id: id,
                        from_project: old_project,
                        from_folder: old_folder,
                        to_project: project,
                        to_folder: folder,
                        remote_key: new_key.clone(),
                    }];
                    events.extend(propagate_from(&mut tree, old_container)?);
                    events.extend(propagate_from(&mut tree, destination)?);
                    Ok(events)
                })
        };

        match committed {
            Ok(events) => {
                info!(%node, from = %old_container, to = %destination, key = %new_key, "File moved");
                self.events.publish_all(events);
                NodeOutcome::moved(node)
            }
            Err(e) => {
                error!(%node, error = %e, "Commit failed after blob rename; restoring blob");
                if old_key != new_key {
                    if let Err(restore) = self.gateway.rename_blob(&new_key, &old_key).await {
                        error!(%node, error = %restore, "Blob restore failed; key {new_key} is orphaned");
                    }
                }
                NodeOutcome::failed(node, &e)
            }
        }
    }

    async fn move_folder(
        &self,
        ctx: &ActorContext,
        guards: &ProjectGuards,
        id: FolderId,
        project: ProjectId,
        parent: Option<FolderId>,
    ) -> NodeOutcome {
        let node = NodeRef::Folder(id);
        let destination = NodeRef::container(project, parent);

        let result = {
            let mut tree = self.tree.write().await;
            tree.folder(id).cloned().and_then(|folder| {
                if !guards.projects().contains(&folder.project_id) {
                    return Err(AppError::internal(format!(
                        "{node} changed project while the move was queued"
                    )));
                }
                let old_container = folder.container();
                if old_container == destination {
                    return Ok(None);
                }
                tree.reparent_folder(id, project, parent, ctx)?;
                let mut events = vec![TreeEvent::FolderMoved {
                    folder_id: id,
                    from_project: folder.project_id,
                    from_parent: folder.parent_id,
                    to_project: project,
                    to_parent: parent,
                }];
                events.extend(propagate_from(&mut tree, old_container)?);
                events.extend(propagate_from(&mut tree, destination)?);
                Ok(Some((old_container, events)))
            })
        };

        match result {
            Ok(Some((old_container, events))) => {
                info!(%node, from = %old_container, to = %destination, "Folder moved");
                self.events.publish_all(events);
                NodeOutcome::moved(node)
            }
            Ok(None) => NodeOutcome::unchanged(node),
            Err(e) => {
                warn!(%node, error = %e, "Folder move rejected");
                NodeOutcome::failed(node, &e)
            }
        }
    }

    /// Rename a project, folder, or file. Only the display name changes;
    /// object keys are untouched.
    pub async fn rename(&self, ctx: &ActorContext, node: NodeRef, new_name: &str) -> AppResult<()> {
        let project = self.tree.read().await.project_of(node)?;
        let _guard = self.locks.lock(project).await;

        let old_name = self.tree.write().await.rename(node, new_name, ctx)?;
        if old_name != new_name {
            info!(%node, %old_name, new_name, "Node renamed");
            self.events.publish(TreeEvent::Renamed {
                node,
                old_name,
                new_name: new_name.to_string(),
            });
        }
        Ok(())
    }
}
