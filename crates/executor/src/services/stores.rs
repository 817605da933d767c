use async_trait::async_trait;
use sqlx::SqlitePool;

use common::models::{Setup, Timeframe, Topic};
use engine::stores::{RotationStore, SetupStore};
use engine::EngineError;
use storage::repositories::{RotationRepository, SetupsRepository};
use storage::StorageError;

fn store_err(e: StorageError) -> EngineError {
    EngineError::Store(e.to_string())
}

/// Bridges the engine's persistence seams onto the sqlite repositories, so
/// the engine crate never depends on storage directly.
pub struct SetupStoreAdapter {
    pool: SqlitePool,
}

impl SetupStoreAdapter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SetupStore for SetupStoreAdapter {
    async fn get_existing_idea(
        &self,
        user_id: &str,
        symbol: &str,
        timeframe: Timeframe,
        now: i64,
    ) -> Result<Option<Setup>, EngineError> {
        SetupsRepository::get_existing_idea(&self.pool, user_id, symbol, timeframe, now)
            .await
            .map_err(store_err)
    }

    async fn create_setup(&self, setup: &Setup) -> Result<(), EngineError> {
        SetupsRepository::create(&self.pool, setup)
            .await
            .map_err(store_err)
    }

    async fn upgrade_to_trade(
        &self,
        setup_id: &str,
        trade_score: i32,
        now: i64,
    ) -> Result<bool, EngineError> {
        SetupsRepository::upgrade_to_trade(&self.pool, setup_id, trade_score, now)
            .await
            .map_err(store_err)
    }
}

pub struct RotationStoreAdapter {
    pool: SqlitePool,
}

impl RotationStoreAdapter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RotationStore for RotationStoreAdapter {
    async fn last_sent(
        &self,
        user_id: &str,
        topic: Topic,
        symbol: &str,
    ) -> Result<Option<i64>, EngineError> {
        RotationRepository::get_last_sent(&self.pool, user_id, topic, symbol)
            .await
            .map_err(store_err)
    }

    async fn mark_sent(
        &self,
        user_id: &str,
        topic: Topic,
        symbol: &str,
        at: i64,
    ) -> Result<(), EngineError> {
        RotationRepository::set_last_sent(&self.pool, user_id, topic, symbol, at)
            .await
            .map_err(store_err)
    }
}
