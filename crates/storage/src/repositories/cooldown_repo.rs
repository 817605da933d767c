use sqlx::SqlitePool;

use crate::StorageError;

pub struct CooldownRepository;

impl CooldownRepository {
    pub async fn is_in_cooldown(
        pool: &SqlitePool,
        user_id: &str,
        key: &str,
        now: i64,
    ) -> Result<bool, StorageError> {
        let expires_at: Option<i64> =
            sqlx::query_scalar("SELECT expires_at FROM cooldowns WHERE user_id = ? AND key = ?")
                .bind(user_id)
                .bind(key)
                .fetch_optional(pool)
                .await?;
        Ok(expires_at.is_some_and(|t| t > now))
    }

    pub async fn set_cooldown(
        pool: &SqlitePool,
        user_id: &str,
        key: &str,
        expires_at: i64,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO cooldowns(user_id, key, expires_at) VALUES (?, ?, ?)
             ON CONFLICT(user_id, key) DO UPDATE SET expires_at = excluded.expires_at",
        )
        .bind(user_id)
        .bind(key)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(())
    }
}
