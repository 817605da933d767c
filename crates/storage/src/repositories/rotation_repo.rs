use sqlx::SqlitePool;

use common::models::Topic;

use crate::StorageError;

pub struct RotationRepository;

impl RotationRepository {
    pub async fn get_last_sent(
        pool: &SqlitePool,
        user_id: &str,
        topic: Topic,
        symbol: &str,
    ) -> Result<Option<i64>, StorageError> {
        let ts: Option<i64> = sqlx::query_scalar(
            "SELECT last_sent_at FROM symbol_rotation
             WHERE user_id = ? AND topic = ? AND symbol = ?",
        )
        .bind(user_id)
        .bind(topic.as_str())
        .bind(symbol)
        .fetch_optional(pool)
        .await?;
        Ok(ts)
    }

    pub async fn set_last_sent(
        pool: &SqlitePool,
        user_id: &str,
        topic: Topic,
        symbol: &str,
        timestamp: i64,
    ) -> Result<(), StorageError> {
        sqlx::query(
            "INSERT INTO symbol_rotation(user_id, topic, symbol, last_sent_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id, topic, symbol) DO UPDATE SET
                last_sent_at = excluded.last_sent_at",
        )
        .bind(user_id)
        .bind(topic.as_str())
        .bind(symbol)
        .bind(timestamp)
        .execute(pool)
        .await?;
        Ok(())
    }
}
