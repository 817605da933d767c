use async_trait::async_trait;

use common::models::{Setup, Timeframe, Topic};

use crate::EngineError;

/// Persistence seam for the IDEA/TRADE state machine. Implementations must
/// make `upgrade_to_trade` a conditional write so a setup consumed by a
/// concurrent evaluation reports `false` instead of double-confirming.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SetupStore: Send + Sync {
    async fn get_existing_idea(
        &self,
        user_id: &str,
        symbol: &str,
        timeframe: Timeframe,
        now: i64,
    ) -> Result<Option<Setup>, EngineError>;

    async fn create_setup(&self, setup: &Setup) -> Result<(), EngineError>;

    async fn upgrade_to_trade(
        &self,
        setup_id: &str,
        trade_score: i32,
        now: i64,
    ) -> Result<bool, EngineError>;
}

/// Persistence seam for cross-scan rotation timestamps.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RotationStore: Send + Sync {
    async fn last_sent(
        &self,
        user_id: &str,
        topic: Topic,
        symbol: &str,
    ) -> Result<Option<i64>, EngineError>;

    async fn mark_sent(
        &self,
        user_id: &str,
        topic: Topic,
        symbol: &str,
        at: i64,
    ) -> Result<(), EngineError>;
}
