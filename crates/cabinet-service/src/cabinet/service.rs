//! Create, upload, and delete entry points.
//!
//! Each mutation takes the owning project's lock, keeps the tree lock only
//! for in-memory work, and propagates aggregates before returning.

use bytes::Bytes;
use tracing::{error, info, warn};

use cabinet_core::error::AppError;
use cabinet_core::result::AppResult;
use cabinet_core::traits::storage::ByteStream;
use cabinet_core::types::{FileId, FolderId, NodeRef, ProjectId};
use cabinet_entity::file::{CreateFile, File};
use cabinet_entity::folder::{CreateFolder, Folder};
use cabinet_entity::project::{CreateProject, Project};
use cabinet_entity::storage::StorageQuota;
use cabinet_storage::ObjectStoreGateway;

use crate::aggregate::AggregatePropagator;
use crate::aggregate::propagator::propagate_from;
use crate::context::ActorContext;
use crate::events::EventBus;
use crate::path::PathResolver;
use crate::relocation::ProjectLocks;
use crate::slug;
use crate::tree::{SharedTree, validate_name};

/// A file whose blob is stored and whose record is about to be inserted.
struct Reserved {
    id: FileId,
    key: String,
}

/// Orchestrates tree mutations that touch the object store.
#[derive(Debug, Clone)]
pub struct CabinetService {
    tree: SharedTree,
    gateway: ObjectStoreGateway,
    resolver: PathResolver,
    locks: ProjectLocks,
    events: EventBus,
    default_max_size: i64,
}

impl CabinetService {
    /// Create a service sharing the propagator's forest, store, and locks.
    /// `default_max_size` is the quota used when none is stored.
    pub fn new(
        propagator: &AggregatePropagator,
        resolver: PathResolver,
        default_max_size: u64,
    ) -> Self {
        Self {
            tree: propagator.tree.clone(),
            gateway: propagator.gateway.clone(),
            resolver,
            locks: propagator.locks.clone(),
            events: propagator.events.clone(),
            default_max_size: i64::try_from(default_max_size).unwrap_or(i64::MAX),
        }
    }

    /// Creates a new project.
    pub async fn create_project(
        &self,
        ctx: &ActorContext,
        data: CreateProject,
    ) -> AppResult<Project> {
        let project = self.tree.write().await.create_project(data, ctx)?;
        info!(project_id = %project.id, name = %project.name, "Project created");
        Ok(project)
    }

    /// Creates a new, empty folder.
    pub async fn create_folder(&self, ctx: &ActorContext, data: CreateFolder) -> AppResult<Folder> {
        let _guard = self.locks.lock(data.project_id).await;
        let folder = self.tree.write().await.create_folder(data, ctx)?;
        info!(
            folder_id = %folder.id,
            project_id = %folder.project_id,
            name = %folder.name,
            "Folder created"
        );
        Ok(folder)
    }

    /// Walk `segments` below the project root, creating missing folders.
    /// Returns the last folder, or None for an empty path.
    pub async fn ensure_folder_path(
        &self,
        ctx: &ActorContext,
        project: ProjectId,
        segments: &[&str],
    ) -> AppResult<Option<FolderId>> {
        let _guard = self.locks.lock(project).await;
        let mut tree = self.tree.write().await;
        tree.project(project)?;

        let mut current: Option<FolderId> = None;
        for segment in segments {
            let container = NodeRef::container(project, current);
            let existing = tree
                .child_folders(container)
                .iter()
                .find(|f| f.name == *segment)
                .map(|f| f.id);
            current = Some(match existing {
                Some(id) => id,
                None => {
                    let folder = tree.create_folder(
                        CreateFolder {
                            project_id: project,
                            parent_id: current,
                            name: segment.to_string(),
                            owner_id: ctx.user_id,
                        },
                        ctx,
                    )?;
                    info!(folder_id = %folder.id, name = %folder.name, "Folder created on demand");
                    folder.id
                }
            });
        }
        Ok(current)
    }

    /// Validate a new file and reserve its id and object key.
    async fn reserve(&self, data: &CreateFile) -> AppResult<Reserved> {
        validate_name(&data.name)?;
        let mut tree = self.tree.write().await;
        tree.check_container(data.project_id, data.folder_id)?;
        let container = NodeRef::container(data.project_id, data.folder_id);
        tree.check_file_name_free(container, &data.name, None)?;

        let id = tree.allocate_file_id();
        let key = match &data.remote_key {
            Some(key) => key.clone(),
            None => self.resolver.mint_key(&tree, id, &data.name, container)?,
        };
        Ok(Reserved { id, key })
    }

    /// Insert the record for a stored blob and propagate its size.
    async fn commit(
        &self,
        ctx: &ActorContext,
        reserved: Reserved,
        data: CreateFile,
        size: u64,
    ) -> AppResult<File> {
        let size = i64::try_from(size)
            .map_err(|_| AppError::validation(format!("Blob of {size} bytes is too large")))?;
        let (file, events) = {
            let mut tree = self.tree.write().await;
            let file = tree.insert_file(reserved.id, data, reserved.key, size, ctx)?;
            let events = propagate_from(&mut tree, NodeRef::File(file.id))?;
            (file, events)
        };
        self.events.publish_all(events);
        Ok(file)
    }

    /// Upload a blob and create its file record.
    ///
    /// If the record cannot be inserted after the upload, the blob is
    /// deleted again.
    pub async fn upload_file(
        &self,
        ctx: &ActorContext,
        data: CreateFile,
        stream: ByteStream,
    ) -> AppResult<File> {
        let _guard = self.locks.lock(data.project_id).await;
        let reserved = self.reserve(&data).await?;
        let key = reserved.key.clone();

        let size = self.gateway.upload_blob(&key, stream).await?;
        match self.commit(ctx, reserved, data, size).await {
            Ok(file) => {
                info!(file_id = %file.id, key = %file.remote_key, size, "File uploaded");
                Ok(file)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "File record rejected after upload; removing blob");
                if let Err(cleanup) = self.gateway.delete_blob(&key).await {
                    error!(key = %key, error = %cleanup, "Orphaned blob left behind");
                }
                Err(e)
            }
        }
    }

    /// [`Self::upload_file`] for an in-memory buffer.
    pub async fn upload_bytes(
        &self,
        ctx: &ActorContext,
        data: CreateFile,
        content: impl Into<Bytes>,
    ) -> AppResult<File> {
        let content = content.into();
        let stream: ByteStream = Box::pin(futures::stream::once(async move {
            Ok::<_, std::io::Error>(content)
        }));
        self.upload_file(ctx, data, stream).await
    }

    /// Take ownership of a blob already in the store under `staged_key`:
    /// move it to a freshly minted key and create its record.
    pub async fn adopt_blob(
        &self,
        ctx: &ActorContext,
        staged_key: &str,
        mut data: CreateFile,
    ) -> AppResult<File> {
        let _guard = self.locks.lock(data.project_id).await;
        data.remote_key = None;
        let reserved = self.reserve(&data).await?;
        let key = reserved.key.clone();

        self.gateway.rename_blob(staged_key, &key).await?;
        let committed = match self.gateway.blob_size(&key).await {
            Ok(size) => self.commit(ctx, reserved, data, size).await,
            Err(e) => Err(e),
        };
        match committed {
            Ok(file) => {
                info!(file_id = %file.id, from = %staged_key, key = %key, "Staged blob adopted");
                Ok(file)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Adoption failed; returning blob to staging");
                if let Err(restore) = self.gateway.rename_blob(&key, staged_key).await {
                    error!(key = %key, error = %restore, "Staged blob could not be restored");
                }
                Err(e)
            }
        }
    }

    /// Delete a file's blob, then its record.
    pub async fn delete_file(&self, ctx: &ActorContext, id: FileId) -> AppResult<File> {
        let project = self.tree.read().await.project_of(NodeRef::File(id))?;
        let _guard = self.locks.lock(project).await;

        let key = self.tree.read().await.file(id)?.remote_key.clone();
        self.gateway.delete_blob(&key).await?;

        let (file, events) = {
            let mut tree = self.tree.write().await;
            let file = tree.delete_file(id)?;
            let container = file.container();
            tree.touch(container, ctx)?;
            let events = propagate_from(&mut tree, container)?;
            (file, events)
        };
        info!(file_id = %id, key = %key, "File deleted");
        self.events.publish_all(events);
        Ok(file)
    }

    /// Delete every blob under a folder, then the folder subtree.
    ///
    /// When a blob cannot be deleted the tree is left untouched; deleting
    /// a missing blob succeeds, so the call can simply be retried.
    pub async fn delete_folder(&self, ctx: &ActorContext, id: FolderId) -> AppResult<Vec<File>> {
        let node = NodeRef::Folder(id);
        let project = self.tree.read().await.project_of(node)?;
        let _guard = self.locks.lock(project).await;

        let keys: Vec<String> = self
            .tree
            .read()
            .await
            .subtree_files(node)
            .iter()
            .map(|f| f.remote_key.clone())
            .collect();
        for key in &keys {
            self.gateway.delete_blob(key).await?;
        }

        let (removed, events) = {
            let mut tree = self.tree.write().await;
            let container = tree.folder(id)?.container();
            let removed = tree.delete_folder(id)?;
            tree.touch(container, ctx)?;
            let events = propagate_from(&mut tree, container)?;
            (removed, events)
        };
        info!(folder_id = %id, files = removed.len(), "Folder deleted");
        self.events.publish_all(events);
        Ok(removed)
    }

    /// Return the node's slug, generating it on first use.
    pub async fn ensure_slug(&self, node: NodeRef) -> AppResult<String> {
        let mut tree = self.tree.write().await;
        let (existing, name, raw_id) = match node {
            NodeRef::Project(id) => {
                let p = tree.project(id)?;
                (p.slug.clone(), p.name.clone(), id.get())
            }
            NodeRef::Folder(id) => {
                let f = tree.folder(id)?;
                (f.slug.clone(), f.name.clone(), id.get())
            }
            NodeRef::File(id) => {
                let f = tree.file(id)?;
                (f.slug.clone(), f.name.clone(), id.get())
            }
        };
        if let Some(slug) = existing {
            return Ok(slug);
        }

        let slug = slug::generate(&name, raw_id, |candidate| tree.slug_taken(node, candidate))
            .ok_or_else(|| AppError::internal(format!("Could not find a free slug for {node}")))?;
        tree.set_slug(node, slug.clone())?;
        info!(%node, slug = %slug, "Slug assigned");
        Ok(slug)
    }

    /// The stored quota, or the configured default.
    pub async fn quota(&self) -> StorageQuota {
        self.tree.read().await.quota().unwrap_or(StorageQuota {
            max_size_bytes: self.default_max_size,
        })
    }

    /// Replace the stored quota.
    pub async fn set_quota(&self, max_size_bytes: i64) -> AppResult<()> {
        if max_size_bytes < 0 {
            return Err(AppError::validation("Quota cannot be negative"));
        }
        self.tree
            .write()
            .await
            .set_quota(StorageQuota { max_size_bytes });
        Ok(())
    }

    /// Bytes used by every project together.
    pub async fn used_space(&self) -> i64 {
        self.tree.read().await.used_space()
    }

    /// Used space as an integer percentage of the quota.
    pub async fn used_space_percent(&self) -> u8 {
        let quota = self.quota().await;
        quota.used_percent(self.used_space().await)
    }
}
