use sqlx::SqlitePool;

use common::models::{Direction, Setup, SetupLevels, SetupStatus, Timeframe};

use crate::StorageError;

pub struct SetupsRepository;

#[derive(sqlx::FromRow)]
struct SetupRow {
    setup_id: String,
    user_id: String,
    symbol: String,
    timeframe: String,
    side: String,
    status: String,
    idea_score: Option<i32>,
    trade_score: Option<i32>,
    levels_json: Option<String>,
    created_at: i64,
    expires_at: i64,
    confirmed_at: Option<i64>,
    invalidated_at: Option<i64>,
}

impl TryFrom<SetupRow> for Setup {
    type Error = StorageError;

    fn try_from(row: SetupRow) -> Result<Self, Self::Error> {
        let timeframe = Timeframe::parse(&row.timeframe).ok_or_else(|| {
            StorageError::corrupt("active_setups", format!("timeframe '{}'", row.timeframe))
        })?;
        let side = Direction::parse(&row.side)
            .ok_or_else(|| StorageError::corrupt("active_setups", format!("side '{}'", row.side)))?;
        let status = SetupStatus::parse(&row.status).ok_or_else(|| {
            StorageError::corrupt("active_setups", format!("status '{}'", row.status))
        })?;
        let levels: SetupLevels = match row.levels_json {
            Some(json) => serde_json::from_str(&json).map_err(|e| {
                StorageError::corrupt("active_setups", format!("levels_json: {}", e))
            })?,
            None => SetupLevels::default(),
        };
        Ok(Setup {
            setup_id: row.setup_id,
            user_id: row.user_id,
            symbol: row.symbol,
            timeframe,
            side,
            status,
            idea_score: row.idea_score,
            trade_score: row.trade_score,
            levels,
            created_at: row.created_at,
            expires_at: row.expires_at,
            confirmed_at: row.confirmed_at,
            invalidated_at: row.invalidated_at,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT setup_id, user_id, symbol, timeframe, side, status, \
     idea_score, trade_score, levels_json, created_at, expires_at, confirmed_at, invalidated_at \
     FROM active_setups";

impl SetupsRepository {
    pub async fn create(pool: &SqlitePool, setup: &Setup) -> Result<(), StorageError> {
        let levels_json = serde_json::to_string(&setup.levels)
            .map_err(|e| StorageError::corrupt("active_setups", e.to_string()))?;

        sqlx::query(
            "INSERT INTO active_setups
                (setup_id, user_id, symbol, timeframe, side, status, idea_score, trade_score,
                 levels_json, created_at, expires_at, confirmed_at, invalidated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&setup.setup_id)
        .bind(&setup.user_id)
        .bind(&setup.symbol)
        .bind(setup.timeframe.as_str())
        .bind(setup.side.as_str())
        .bind(setup.status.as_str())
        .bind(setup.idea_score)
        .bind(setup.trade_score)
        .bind(levels_json)
        .bind(setup.created_at)
        .bind(setup.expires_at)
        .bind(setup.confirmed_at)
        .bind(setup.invalidated_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn get_by_id(
        pool: &SqlitePool,
        setup_id: &str,
    ) -> Result<Option<Setup>, StorageError> {
        let row: Option<SetupRow> =
            sqlx::query_as(&format!("{} WHERE setup_id = ?", SELECT_COLUMNS))
                .bind(setup_id)
                .fetch_optional(pool)
                .await?;
        row.map(Setup::try_from).transpose()
    }

    /// The still-active IDEA for a (user, symbol, timeframe), if any.
    pub async fn get_existing_idea(
        pool: &SqlitePool,
        user_id: &str,
        symbol: &str,
        timeframe: Timeframe,
        now: i64,
    ) -> Result<Option<Setup>, StorageError> {
        let row: Option<SetupRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = ? AND symbol = ? AND timeframe = ?
               AND status = 'IDEA' AND expires_at > ? AND invalidated_at IS NULL
             LIMIT 1",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .bind(symbol)
        .bind(timeframe.as_str())
        .bind(now)
        .fetch_optional(pool)
        .await?;
        row.map(Setup::try_from).transpose()
    }

    /// Conditional IDEA -> TRADE flip. Returns false when the setup was
    /// already upgraded or invalidated by a concurrent evaluation; callers
    /// must then suppress the notification.
    pub async fn upgrade_to_trade(
        pool: &SqlitePool,
        setup_id: &str,
        trade_score: i32,
        now: i64,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "UPDATE active_setups
             SET status = 'TRADE', trade_score = ?, confirmed_at = ?
             WHERE setup_id = ? AND status = 'IDEA' AND invalidated_at IS NULL",
        )
        .bind(trade_score)
        .bind(now)
        .bind(setup_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn invalidate(
        pool: &SqlitePool,
        setup_id: &str,
        now: i64,
    ) -> Result<bool, StorageError> {
        let result = sqlx::query("UPDATE active_setups SET invalidated_at = ? WHERE setup_id = ?")
            .bind(now)
            .bind(setup_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Cleanup sweep: drops everything expired or invalidated, returns the
    /// number of removed rows.
    pub async fn cleanup_expired(pool: &SqlitePool, now: i64) -> Result<u64, StorageError> {
        let result = sqlx::query(
            "DELETE FROM active_setups WHERE expires_at < ? OR invalidated_at IS NOT NULL",
        )
        .bind(now)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_in_memory;

    fn idea(setup_id: &str, symbol: &str, now: i64) -> Setup {
        Setup {
            setup_id: setup_id.to_string(),
            user_id: "42".to_string(),
            symbol: symbol.to_string(),
            timeframe: Timeframe::H1,
            side: Direction::Long,
            status: SetupStatus::Idea,
            idea_score: Some(90),
            trade_score: None,
            levels: SetupLevels {
                sweep_level: Some(100.0),
                reclaim_confirmed: true,
                ..SetupLevels::default()
            },
            created_at: now,
            expires_at: now + 7200,
            confirmed_at: None,
            invalidated_at: None,
        }
    }

    #[tokio::test]
    async fn idea_roundtrip_and_lookup() {
        let pool = connect_in_memory().await.unwrap();
        let now = 1_700_000_000;

        let setup = idea("s1", "BTCUSDT", now);
        SetupsRepository::create(&pool, &setup).await.unwrap();

        let found = SetupsRepository::get_existing_idea(&pool, "42", "BTCUSDT", Timeframe::H1, now)
            .await
            .unwrap()
            .expect("idea should be active");
        assert_eq!(found, setup);

        // Expired ideas are not returned.
        let later = now + 10_000;
        let gone = SetupsRepository::get_existing_idea(&pool, "42", "BTCUSDT", Timeframe::H1, later)
            .await
            .unwrap();
        assert!(gone.is_none());
    }

    #[tokio::test]
    async fn upgrade_is_conditional_on_idea_status() {
        let pool = connect_in_memory().await.unwrap();
        let now = 1_700_000_000;
        SetupsRepository::create(&pool, &idea("s1", "BTCUSDT", now))
            .await
            .unwrap();

        assert!(SetupsRepository::upgrade_to_trade(&pool, "s1", 130, now)
            .await
            .unwrap());

        let upgraded = SetupsRepository::get_by_id(&pool, "s1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(upgraded.status, SetupStatus::Trade);
        assert_eq!(upgraded.trade_score, Some(130));
        assert_eq!(upgraded.confirmed_at, Some(now));

        // Second upgrade attempt reports a conflict.
        assert!(!SetupsRepository::upgrade_to_trade(&pool, "s1", 140, now)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn cleanup_removes_expired_and_invalidated() {
        let pool = connect_in_memory().await.unwrap();
        let now = 1_700_000_000;

        SetupsRepository::create(&pool, &idea("s1", "BTCUSDT", now))
            .await
            .unwrap();
        SetupsRepository::create(&pool, &idea("s2", "ETHUSDT", now))
            .await
            .unwrap();
        SetupsRepository::invalidate(&pool, "s2", now).await.unwrap();

        // s1 not yet expired, s2 invalidated.
        let removed = SetupsRepository::cleanup_expired(&pool, now).await.unwrap();
        assert_eq!(removed, 1);

        // An unconfirmed IDEA stays IDEA until expiry, then the sweep drops it.
        let removed = SetupsRepository::cleanup_expired(&pool, now + 10_000)
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert!(SetupsRepository::get_by_id(&pool, "s1")
            .await
            .unwrap()
            .is_none());
    }
}
