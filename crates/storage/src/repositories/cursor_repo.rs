use chrono::Utc;
use sqlx::SqlitePool;

use crate::StorageError;

/// Round-robin scan cursor: where in the symbol list the next pass starts.
pub struct CursorRepository;

impl CursorRepository {
    pub async fn get(pool: &SqlitePool, user_id: &str) -> Result<usize, StorageError> {
        let idx: Option<i64> = sqlx::query_scalar("SELECT idx FROM scan_cursor WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        Ok(idx.unwrap_or(0).max(0) as usize)
    }

    pub async fn set(pool: &SqlitePool, user_id: &str, idx: usize) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO scan_cursor(user_id, idx, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                idx = excluded.idx, updated_at = excluded.updated_at",
        )
        .bind(user_id)
        .bind(idx as i64)
        .bind(Utc::now().timestamp())
        .execute(pool)
        .await?;
        Ok(())
    }
}
