use async_trait::async_trait;

use common::models::{Candle, Timeframe};

use crate::MarketDataError;

/// Market-data collaborator consumed by the scan driver. Implementations are
/// expected to return candles oldest-first.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn list_symbols(&self) -> Result<Vec<String>, MarketDataError>;

    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u32,
    ) -> Result<Vec<Candle>, MarketDataError>;
}
