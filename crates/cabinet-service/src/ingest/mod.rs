//! Filing of mail attachments into the project tree.
//!
//! Message parsing happens elsewhere. By the time this module is called the
//! attachments are either file records waiting in a staging location, or
//! blobs uploaded under a staging key that still need a record.

use tracing::info;

use cabinet_core::error::ErrorKind;
use cabinet_core::result::AppResult;
use cabinet_core::types::{FileId, FolderId, NodeRef, ProjectId};
use cabinet_entity::file::{CreateFile, File};

use crate::cabinet::CabinetService;
use crate::context::ActorContext;
use crate::relocation::{MoveReport, RelocationEngine};

/// Files staged attachments into projects.
#[derive(Debug, Clone)]
pub struct MailIngest {
    engine: RelocationEngine,
    service: CabinetService,
}

impl MailIngest {
    /// Create the ingestion boundary.
    pub fn new(engine: RelocationEngine, service: CabinetService) -> Self {
        Self { engine, service }
    }

    /// Move already-created attachment records under the destination.
    /// Each file succeeds or fails on its own, as with any move.
    pub async fn attach(
        &self,
        ctx: &ActorContext,
        files: &[FileId],
        destination_project: ProjectId,
        destination_folder: Option<FolderId>,
    ) -> AppResult<MoveReport> {
        let nodes: Vec<NodeRef> = files.iter().map(|id| NodeRef::File(*id)).collect();
        let report = self
            .engine
            .move_nodes(ctx, &nodes, destination_project, destination_folder)
            .await?;
        info!(
            project_id = %destination_project,
            attached = report.succeeded().count(),
            failed = report.failed().count(),
            "Attachments filed"
        );
        Ok(report)
    }

    /// Create a record for a blob uploaded under `staged_key`, filing it
    /// under `folders` (created as needed) inside `project`.
    ///
    /// Returns None, leaving the blob staged, when a file with the same
    /// name already exists there.
    pub async fn import_staged(
        &self,
        ctx: &ActorContext,
        staged_key: &str,
        project: ProjectId,
        folders: &[&str],
        name: &str,
    ) -> AppResult<Option<File>> {
        let folder = self.service.ensure_folder_path(ctx, project, folders).await?;
        let data = CreateFile {
            project_id: project,
            folder_id: folder,
            name: name.to_string(),
            remote_key: None,
            is_public: false,
            owner_id: ctx.user_id,
        };
        match self.service.adopt_blob(ctx, staged_key, data).await {
            Ok(file) => Ok(Some(file)),
            Err(e) if e.kind == ErrorKind::ConstraintViolation => {
                info!(staged_key, name, error = %e, "Attachment already filed; skipped");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
