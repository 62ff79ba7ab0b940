//! Storage quota repository.

use sqlx::{PgConnection, PgPool};

use cabinet_core::result::AppResult;
use cabinet_entity::storage::StorageQuota;

use super::db_error;

/// Repository for the single storage quota row.
#[derive(Debug, Clone)]
pub struct QuotaRepository {
    pool: PgPool,
}

impl QuotaRepository {
    /// Create a new quota repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Read the quota, if one has been recorded.
    pub async fn get(&self) -> AppResult<Option<StorageQuota>> {
        sqlx::query_as::<_, StorageQuota>("SELECT max_size_bytes FROM storage_quota WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error(e, "Failed to read storage quota"))
    }

    /// Record the quota.
    pub async fn set(&self, conn: &mut PgConnection, quota: &StorageQuota) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO storage_quota (id, max_size_bytes) VALUES (1, $1) \
             ON CONFLICT (id) DO UPDATE SET max_size_bytes = EXCLUDED.max_size_bytes",
        )
        .bind(quota.max_size_bytes)
        .execute(conn)
        .await
        .map_err(|e| db_error(e, "Failed to save storage quota"))?;
        Ok(())
    }
}
