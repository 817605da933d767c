use std::collections::HashMap;
use std::sync::Arc;

use ta::indicators::SimpleMovingAverage;
use ta::Next;
use tokio::sync::Mutex;

use common::models::{BiasSnapshot, Candle, Direction, MarketBias};

const SWING_WINDOW: usize = 20;
const SWING_LAG: usize = 5;
const SWING_COUNT_MIN: usize = 3;
const RANGE_BARS: usize = 5;

/// Cascading multi-timeframe trend bias per symbol. The 4h bias anchors the
/// trend, 1h and 15m narrow it and are forced to NEUTRAL when they contradict
/// the timeframe above. Snapshots are cached last-write-wins.
#[derive(Clone)]
pub struct BiasResolver {
    cache: Arc<Mutex<HashMap<String, BiasSnapshot>>>,
}

impl BiasResolver {
    pub fn new() -> Self {
        Self {
            cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn resolve_bias(
        &self,
        symbol: &str,
        candles_4h: &[Candle],
        candles_1h: &[Candle],
        candles_15m: &[Candle],
    ) -> BiasSnapshot {
        let h4 = swing_bias(candles_4h);
        let h1 = constrain(ma_bias(candles_1h), h4);
        let m15 = constrain(range_bias(candles_15m), h1);

        let snapshot = BiasSnapshot { h4, h1, m15 };
        let mut cache = self.cache.lock().await;
        cache.insert(symbol.to_string(), snapshot);
        snapshot
    }

    pub async fn snapshot(&self, symbol: &str) -> Option<BiasSnapshot> {
        let cache = self.cache.lock().await;
        cache.get(symbol).copied()
    }

    /// One-sided veto: rejects only a strict contradiction between the setup
    /// side and the cached 4h bias. No cached data means no opinion.
    pub async fn validate_direction(&self, symbol: &str, side: Direction) -> Result<(), String> {
        let Some(snapshot) = self.snapshot(symbol).await else {
            return Ok(());
        };
        match (side, snapshot.h4) {
            (Direction::Long, MarketBias::Bear) => {
                Err(format!("countertrend: long against 4h {}", snapshot.h4.as_str()))
            }
            (Direction::Short, MarketBias::Bull) => {
                Err(format!("countertrend: short against 4h {}", snapshot.h4.as_str()))
            }
            _ => Ok(()),
        }
    }
}

impl Default for BiasResolver {
    fn default() -> Self {
        Self::new()
    }
}

fn constrain(lower: MarketBias, upper: MarketBias) -> MarketBias {
    match (lower, upper) {
        (MarketBias::Neutral, _) | (_, MarketBias::Neutral) => lower,
        (l, u) if l == u => l,
        _ => MarketBias::Neutral,
    }
}

/// Primary trend from swing counting: over the last 20 bars, compare each
/// high/low against the bar 5 positions earlier.
fn swing_bias(candles: &[Candle]) -> MarketBias {
    if candles.len() < SWING_WINDOW + SWING_LAG {
        return MarketBias::Neutral;
    }

    let start = candles.len() - SWING_WINDOW;
    let mut higher_highs = 0usize;
    let mut higher_lows = 0usize;
    let mut lower_highs = 0usize;
    let mut lower_lows = 0usize;

    for i in start..candles.len() {
        let cur = &candles[i];
        let prev = &candles[i - SWING_LAG];
        if cur.high > prev.high {
            higher_highs += 1;
        } else if cur.high < prev.high {
            lower_highs += 1;
        }
        if cur.low > prev.low {
            higher_lows += 1;
        } else if cur.low < prev.low {
            lower_lows += 1;
        }
    }

    if higher_highs >= SWING_COUNT_MIN && higher_lows >= SWING_COUNT_MIN {
        MarketBias::Bull
    } else if lower_lows >= SWING_COUNT_MIN && lower_highs >= SWING_COUNT_MIN {
        MarketBias::Bear
    } else {
        MarketBias::Neutral
    }
}

/// Mid trend from a fast/slow moving-average comparison on closes.
fn ma_bias(candles: &[Candle]) -> MarketBias {
    const FAST: usize = 5;
    const SLOW: usize = 15;

    if candles.len() < SLOW {
        return MarketBias::Neutral;
    }

    let mut fast = SimpleMovingAverage::new(FAST).unwrap();
    let mut slow = SimpleMovingAverage::new(SLOW).unwrap();
    let mut fast_val = 0.0;
    let mut slow_val = 0.0;
    for candle in candles {
        fast_val = fast.next(candle.close);
        slow_val = slow.next(candle.close);
    }

    if fast_val > slow_val {
        MarketBias::Bull
    } else if fast_val < slow_val {
        MarketBias::Bear
    } else {
        MarketBias::Neutral
    }
}

/// Entry timing: last close against the midpoint of the last 5 bars' range.
fn range_bias(candles: &[Candle]) -> MarketBias {
    if candles.len() < RANGE_BARS {
        return MarketBias::Neutral;
    }

    let window = &candles[candles.len() - RANGE_BARS..];
    let high = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let low = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    let mid = (high + low) / 2.0;
    let close = window[window.len() - 1].close;

    if close > mid {
        MarketBias::Bull
    } else if close < mid {
        MarketBias::Bear
    } else {
        MarketBias::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(i: usize, base: f64, step: f64) -> Candle {
        let px = base + step * i as f64;
        Candle {
            ts: 1_700_000_000_000 + (i as i64) * 60_000,
            open: px,
            high: px + 1.0,
            low: px - 1.0,
            close: px,
            volume: 100.0,
        }
    }

    fn trending(n: usize, step: f64) -> Vec<Candle> {
        (0..n).map(|i| candle(i, 100.0, step)).collect()
    }

    #[tokio::test]
    async fn uptrend_resolves_bull_on_all_timeframes() {
        let resolver = BiasResolver::new();
        let up = trending(40, 1.0);
        let snapshot = resolver.resolve_bias("BTCUSDT", &up, &up, &up).await;
        assert_eq!(snapshot.h4, MarketBias::Bull);
        assert_eq!(snapshot.h1, MarketBias::Bull);
        assert_eq!(snapshot.m15, MarketBias::Bull);
    }

    #[tokio::test]
    async fn lower_timeframe_contradiction_is_neutralized() {
        let resolver = BiasResolver::new();
        let up = trending(40, 1.0);
        let down = trending(40, -1.0);
        let snapshot = resolver.resolve_bias("ETHUSDT", &up, &down, &down).await;
        assert_eq!(snapshot.h4, MarketBias::Bull);
        assert_eq!(snapshot.h1, MarketBias::Neutral);
        // m15 constrains against h1 = NEUTRAL, so its own reading stands.
        assert_eq!(snapshot.m15, MarketBias::Bear);
    }

    #[tokio::test]
    async fn short_history_is_neutral() {
        let resolver = BiasResolver::new();
        let few = trending(10, 1.0);
        let snapshot = resolver.resolve_bias("XRPUSDT", &few, &few, &few).await;
        assert_eq!(snapshot.h4, MarketBias::Neutral);
    }

    #[tokio::test]
    async fn veto_is_one_sided() {
        let resolver = BiasResolver::new();
        let down = trending(40, -1.0);
        resolver.resolve_bias("SOLUSDT", &down, &down, &down).await;

        assert!(resolver
            .validate_direction("SOLUSDT", Direction::Long)
            .await
            .is_err());
        assert!(resolver
            .validate_direction("SOLUSDT", Direction::Short)
            .await
            .is_ok());
        // No cached data means no opinion.
        assert!(resolver
            .validate_direction("UNKNOWN", Direction::Long)
            .await
            .is_ok());
    }
}
