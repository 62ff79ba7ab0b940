//! File repository implementation.

use sqlx::{PgConnection, PgPool};

use cabinet_core::result::AppResult;
use cabinet_entity::file::File;

use super::db_error;

/// Repository for file rows.
#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    /// Create a new file repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List all files ordered by ID.
    pub async fn find_all(&self) -> AppResult<Vec<File>> {
        sqlx::query_as::<_, File>("SELECT * FROM files ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error(e, "Failed to list files"))
    }

    /// Insert or update a file.
    pub async fn upsert(&self, conn: &mut PgConnection, file: &File) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO files (id, project_id, folder_id, name, remote_key, size_bytes, is_public, slug, owner_id, updated_by, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             ON CONFLICT (id) DO UPDATE SET project_id = EXCLUDED.project_id, \
             folder_id = EXCLUDED.folder_id, name = EXCLUDED.name, \
             remote_key = EXCLUDED.remote_key, size_bytes = EXCLUDED.size_bytes, \
             is_public = EXCLUDED.is_public, slug = EXCLUDED.slug, \
             owner_id = EXCLUDED.owner_id, updated_by = EXCLUDED.updated_by, \
             updated_at = EXCLUDED.updated_at",
        )
        .bind(file.id)
        .bind(file.project_id)
        .bind(file.folder_id)
        .bind(&file.name)
        .bind(&file.remote_key)
        .bind(file.size_bytes)
        .bind(file.is_public)
        .bind(&file.slug)
        .bind(file.owner_id)
        .bind(file.updated_by)
        .bind(file.updated_at)
        .execute(conn)
        .await
        .map_err(|e| db_error(e, &format!("Failed to save file '{}'", file.name)))?;
        Ok(())
    }

    /// Delete every file whose ID is not in `keep`.
    pub async fn delete_except(&self, conn: &mut PgConnection, keep: &[i64]) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM files WHERE id <> ALL($1)")
            .bind(keep)
            .execute(conn)
            .await
            .map_err(|e| db_error(e, "Failed to delete files"))?;
        Ok(result.rows_affected())
    }
}
