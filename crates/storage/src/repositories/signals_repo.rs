use sqlx::SqlitePool;

use crate::StorageError;

/// Journal entry for a delivered notification. Claiming the dedup key and
/// recording the send happen in the same insert.
#[derive(Debug, Clone)]
pub struct SentSignal {
    pub user_id: String,
    pub dedup_key: String,
    pub symbol: String,
    pub timeframe: String,
    pub signal_type: String,
    pub candle_ts: i64,
    pub score_total: Option<i32>,
    pub payload_json: String,
    pub sent_at: i64,
}

pub struct SignalsRepository;

impl SignalsRepository {
    pub async fn has_dedup_key(pool: &SqlitePool, dedup_key: &str) -> Result<bool, StorageError> {
        let row: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM signals_sent WHERE dedup_key = ? LIMIT 1")
                .bind(dedup_key)
                .fetch_optional(pool)
                .await?;
        Ok(row.is_some())
    }

    /// Atomically claims the dedup key and journals the send. Returns false
    /// when the key was already claimed, so a racing evaluation of the same
    /// logical event cannot double-send.
    pub async fn try_claim(pool: &SqlitePool, signal: &SentSignal) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO signals_sent
                (dedup_key, user_id, symbol, timeframe, signal_type, candle_ts,
                 score_total, payload_json, sent_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&signal.dedup_key)
        .bind(&signal.user_id)
        .bind(&signal.symbol)
        .bind(&signal.timeframe)
        .bind(&signal.signal_type)
        .bind(signal.candle_ts)
        .bind(signal.score_total)
        .bind(&signal.payload_json)
        .bind(signal.sent_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
