use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use common::models::{Candle, Timeframe};

use crate::remote::candles_response::{CandleRow, parse_candle};
use crate::remote::get_rest_base_url;
use crate::remote::tickers_response::{ApiEnvelope, TickerEntry};
use crate::traits::MarketDataSource;
use crate::MarketDataError;

const PRODUCT_TYPE: &str = "USDT-FUTURES";

pub struct BitgetClient {
    http: reqwest::Client,
    base_url: String,
}

impl BitgetClient {
    pub fn new() -> Self {
        Self::with_base_url(get_rest_base_url())
    }

    pub fn with_base_url(base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn granularity(timeframe: Timeframe) -> &'static str {
        match timeframe {
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1H",
            Timeframe::H4 => "4H",
        }
    }
}

impl Default for BitgetClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataSource for BitgetClient {
    async fn list_symbols(&self) -> Result<Vec<String>, MarketDataError> {
        let url = format!("{}/api/v2/mix/market/tickers", self.base_url);
        let envelope: ApiEnvelope<Vec<TickerEntry>> = self
            .http
            .get(&url)
            .query(&[("productType", PRODUCT_TYPE)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !envelope.is_ok() {
            return Err(MarketDataError::Api {
                code: envelope.code,
                message: envelope.msg.unwrap_or_default(),
            });
        }

        let symbols = envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.symbol)
            .filter(|s| s.ends_with("USDT"))
            .collect();
        Ok(symbols)
    }

    async fn get_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u32,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let url = format!("{}/api/v2/mix/market/candles", self.base_url);
        let envelope: ApiEnvelope<Vec<CandleRow>> = self
            .http
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("productType", PRODUCT_TYPE),
                ("granularity", Self::granularity(timeframe)),
                ("limit", &limit.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !envelope.is_ok() {
            return Err(MarketDataError::Api {
                code: envelope.code,
                message: envelope.msg.unwrap_or_default(),
            });
        }

        let rows = envelope.data.unwrap_or_default();
        let mut candles = Vec::with_capacity(rows.len());
        for row in &rows {
            match parse_candle(row) {
                Ok(candle) => candles.push(candle),
                Err(e) => {
                    warn!("Skipping candle for {} {}: {}", symbol, timeframe, e);
                }
            }
        }

        // The endpoint returns newest-first, the engine wants oldest-first.
        if candles.first().zip(candles.last()).is_some_and(|(a, b)| a.ts > b.ts) {
            candles.reverse();
        }
        Ok(candles)
    }
}
