//! Whole-forest load and save.

use sqlx::PgPool;
use tracing::info;

use cabinet_core::result::AppResult;
use cabinet_entity::snapshot::ForestSnapshot;

use super::{FileRepository, FolderRepository, ProjectRepository, QuotaRepository, db_error};

/// Loads the project forest into a snapshot and writes it back.
#[derive(Debug, Clone)]
pub struct ForestRepository {
    pool: PgPool,
    projects: ProjectRepository,
    folders: FolderRepository,
    files: FileRepository,
    quota: QuotaRepository,
}

impl ForestRepository {
    /// Create a repository over `pool`.
    pub fn new(pool: PgPool) -> Self {
        Self {
            projects: ProjectRepository::new(pool.clone()),
            folders: FolderRepository::new(pool.clone()),
            files: FileRepository::new(pool.clone()),
            quota: QuotaRepository::new(pool.clone()),
            pool,
        }
    }

    /// Read every project, folder, and file.
    pub async fn load(&self) -> AppResult<ForestSnapshot> {
        let snapshot = ForestSnapshot {
            projects: self.projects.find_all().await?,
            folders: self.folders.find_all().await?,
            files: self.files.find_all().await?,
            quota: self.quota.get().await?,
        };
        info!(
            projects = snapshot.projects.len(),
            folders = snapshot.folders.len(),
            files = snapshot.files.len(),
            "Loaded forest from database"
        );
        Ok(snapshot)
    }

    /// Make the database match `snapshot` in one transaction.
    ///
    /// Rows missing from the snapshot are deleted. Sibling-name and parent
    /// constraints are checked at commit, so moves and renames may pass
    /// through intermediate states.
    pub async fn save(&self, snapshot: &ForestSnapshot) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error(e, "Failed to begin transaction"))?;

        let file_ids: Vec<i64> = snapshot.files.iter().map(|f| f.id.get()).collect();
        let folder_ids: Vec<i64> = snapshot.folders.iter().map(|f| f.id.get()).collect();
        let project_ids: Vec<i64> = snapshot.projects.iter().map(|p| p.id.get()).collect();

        let removed_files = self.files.delete_except(&mut tx, &file_ids).await?;
        let removed_folders = self.folders.delete_except(&mut tx, &folder_ids).await?;
        let removed_projects = self.projects.delete_except(&mut tx, &project_ids).await?;

        for project in &snapshot.projects {
            self.projects.upsert(&mut tx, project).await?;
        }
        for folder in &snapshot.folders {
            self.folders.upsert(&mut tx, folder).await?;
        }
        for file in &snapshot.files {
            self.files.upsert(&mut tx, file).await?;
        }
        if let Some(quota) = &snapshot.quota {
            self.quota.set(&mut tx, quota).await?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error(e, "Failed to commit forest"))?;

        info!(
            records = snapshot.len(),
            removed_files, removed_folders, removed_projects, "Saved forest to database"
        );
        Ok(())
    }
}
