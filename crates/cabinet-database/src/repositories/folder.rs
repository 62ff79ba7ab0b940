//! Folder repository implementation.

use sqlx::{PgConnection, PgPool};

use cabinet_core::result::AppResult;
use cabinet_entity::folder::Folder;

use super::db_error;

/// Repository for folder rows.
#[derive(Debug, Clone)]
pub struct FolderRepository {
    pool: PgPool,
}

impl FolderRepository {
    /// Create a new folder repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List all folders ordered by ID.
    pub async fn find_all(&self) -> AppResult<Vec<Folder>> {
        sqlx::query_as::<_, Folder>("SELECT * FROM folders ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error(e, "Failed to list folders"))
    }

    /// Insert or update a folder.
    pub async fn upsert(&self, conn: &mut PgConnection, folder: &Folder) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO folders (id, project_id, parent_id, name, slug, owner_id, is_public, size_bytes, updated_by, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             ON CONFLICT (id) DO UPDATE SET project_id = EXCLUDED.project_id, \
             parent_id = EXCLUDED.parent_id, name = EXCLUDED.name, slug = EXCLUDED.slug, \
             owner_id = EXCLUDED.owner_id, is_public = EXCLUDED.is_public, \
             size_bytes = EXCLUDED.size_bytes, updated_by = EXCLUDED.updated_by, \
             updated_at = EXCLUDED.updated_at",
        )
        .bind(folder.id)
        .bind(folder.project_id)
        .bind(folder.parent_id)
        .bind(&folder.name)
        .bind(&folder.slug)
        .bind(folder.owner_id)
        .bind(folder.is_public)
        .bind(folder.size_bytes)
        .bind(folder.updated_by)
        .bind(folder.updated_at)
        .execute(conn)
        .await
        .map_err(|e| db_error(e, &format!("Failed to save folder '{}'", folder.name)))?;
        Ok(())
    }

    /// Delete every folder whose ID is not in `keep`.
    pub async fn delete_except(&self, conn: &mut PgConnection, keep: &[i64]) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM folders WHERE id <> ALL($1)")
            .bind(keep)
            .execute(conn)
            .await
            .map_err(|e| db_error(e, "Failed to delete folders"))?;
        Ok(result.rows_affected())
    }
}
