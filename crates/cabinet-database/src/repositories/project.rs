//! Project repository implementation.

use sqlx::{PgConnection, PgPool};

use cabinet_core::result::AppResult;
use cabinet_core::types::{ProjectId, UserId};
use cabinet_entity::project::Project;

use super::db_error;

/// Repository for project rows and their member sets.
#[derive(Debug, Clone)]
pub struct ProjectRepository {
    pool: PgPool,
}

impl ProjectRepository {
    /// Create a new project repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List all projects ordered by ID, members included.
    pub async fn find_all(&self) -> AppResult<Vec<Project>> {
        let mut projects = sqlx::query_as::<_, Project>("SELECT * FROM projects ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error(e, "Failed to list projects"))?;

        let members = sqlx::query_as::<_, (ProjectId, UserId)>(
            "SELECT project_id, user_id FROM project_members ORDER BY project_id, user_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(e, "Failed to list project members"))?;

        for (project_id, user_id) in members {
            if let Some(project) = projects.iter_mut().find(|p| p.id == project_id) {
                project.members.push(user_id);
            }
        }
        Ok(projects)
    }

    /// Insert or update a project and replace its member set.
    pub async fn upsert(&self, conn: &mut PgConnection, project: &Project) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO projects (id, name, slug, owner_id, is_public, size_bytes, updated_by, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, slug = EXCLUDED.slug, \
             owner_id = EXCLUDED.owner_id, is_public = EXCLUDED.is_public, \
             size_bytes = EXCLUDED.size_bytes, updated_by = EXCLUDED.updated_by, \
             updated_at = EXCLUDED.updated_at",
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(&project.slug)
        .bind(project.owner_id)
        .bind(project.is_public)
        .bind(project.size_bytes)
        .bind(project.updated_by)
        .bind(project.updated_at)
        .execute(&mut *conn)
        .await
        .map_err(|e| db_error(e, "Failed to save project"))?;

        sqlx::query("DELETE FROM project_members WHERE project_id = $1")
            .bind(project.id)
            .execute(&mut *conn)
            .await
            .map_err(|e| db_error(e, "Failed to clear project members"))?;

        for member in &project.members {
            sqlx::query("INSERT INTO project_members (project_id, user_id) VALUES ($1, $2)")
                .bind(project.id)
                .bind(*member)
                .execute(&mut *conn)
                .await
                .map_err(|e| db_error(e, "Failed to save project member"))?;
        }
        Ok(())
    }

    /// Delete every project whose ID is not in `keep`.
    pub async fn delete_except(&self, conn: &mut PgConnection, keep: &[i64]) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM projects WHERE id <> ALL($1)")
            .bind(keep)
            .execute(conn)
            .await
            .map_err(|e| db_error(e, "Failed to delete projects"))?;
        Ok(result.rows_affected())
    }
}
