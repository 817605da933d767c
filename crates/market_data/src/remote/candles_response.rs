use common::models::Candle;

use crate::MarketDataError;

/// One candle row as delivered by the exchange:
/// `[ts, open, high, low, close, volume, ...]`, all stringly typed.
pub type CandleRow = Vec<String>;

pub fn parse_candle(row: &CandleRow) -> Result<Candle, MarketDataError> {
    if row.len() < 6 {
        return Err(MarketDataError::MalformedCandle(format!(
            "expected at least 6 fields, got {}",
            row.len()
        )));
    }

    let num = |idx: usize| -> Result<f64, MarketDataError> {
        row[idx]
            .parse::<f64>()
            .map_err(|e| MarketDataError::MalformedCandle(format!("field {}: {}", idx, e)))
    };

    let ts = row[0]
        .parse::<i64>()
        .map_err(|e| MarketDataError::MalformedCandle(format!("ts: {}", e)))?;

    Ok(Candle {
        ts,
        open: num(1)?,
        high: num(2)?,
        low: num(3)?,
        close: num(4)?,
        volume: num(5)?,
    })
}
