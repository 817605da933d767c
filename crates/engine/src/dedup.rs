use std::fmt::Write as _;

use sha2::{Digest, Sha256};

use common::models::{
    Direction, LevelMap, LevelValue, MessageType, Preset, Timeframe,
};

/// Bumped whenever the fingerprint serialization changes, so old journal rows
/// never suppress signals produced under a new scheme.
pub const DEDUP_VERSION: u32 = 2;

pub const FIB_ALERT_COOLDOWN_SECS: i64 = 90 * 60;
pub const WATCHLIST_COOLDOWN_SECS: i64 = 30 * 60;
pub const TRADE_COOLDOWN_SECS: i64 = 60 * 60;
pub const MODULE_ALERT_COOLDOWN_SECS: i64 = 60 * 60;

/// Deterministic fingerprint of one logical notification event. Levels are
/// serialized in key order with fixed numeric precision so map iteration and
/// float noise cannot produce spurious new keys.
pub fn dedup_key(
    user_id: &str,
    symbol: &str,
    timeframe: Timeframe,
    signal_type: &str,
    candle_ts: i64,
    levels: &LevelMap,
) -> String {
    let mut canonical = format!(
        "v{}|{}|{}|{}|{}|{}",
        DEDUP_VERSION, user_id, symbol, timeframe, signal_type, candle_ts
    );
    for (key, value) in levels {
        match value {
            LevelValue::Num(n) => {
                let _ = write!(canonical, "|{}={:.6}", key, n);
            }
            LevelValue::Flag(b) => {
                let _ = write!(canonical, "|{}={}", key, b);
            }
        }
    }

    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(digest)
}

/// Content-derived opaque id for a new Setup row.
pub fn setup_id(
    user_id: &str,
    symbol: &str,
    timeframe: Timeframe,
    side: Direction,
    candle_ts: i64,
) -> String {
    let canonical = format!(
        "setup|{}|{}|{}|{}|{}",
        user_id,
        symbol,
        timeframe,
        side.as_str(),
        candle_ts
    );
    let digest = Sha256::digest(canonical.as_bytes());
    hex::encode(&digest[..8])
}

/// Cooldowns are scoped per message category and symbol, not per event.
pub fn cooldown_key(message_type: MessageType, symbol: &str, timeframe: Timeframe) -> String {
    format!("{}:{}:{}", message_type.as_str(), symbol, timeframe)
}

pub fn cooldown_window_secs(message_type: MessageType, preset: Preset) -> i64 {
    match message_type {
        MessageType::FibAlert => FIB_ALERT_COOLDOWN_SECS,
        MessageType::Watchlist => WATCHLIST_COOLDOWN_SECS,
        MessageType::TradeFreigabe => TRADE_COOLDOWN_SECS,
        MessageType::ModuleAlert => MODULE_ALERT_COOLDOWN_SECS,
        MessageType::Combo => preset.cooldown_hours() * 3600,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels() -> LevelMap {
        let mut map = LevelMap::new();
        map.insert("sweep_level".to_string(), LevelValue::Num(100.25));
        map.insert("reclaim_confirmed".to_string(), LevelValue::Flag(true));
        map
    }

    #[test]
    fn identical_inputs_yield_identical_keys() {
        let a = dedup_key("7", "BTCUSDT", Timeframe::H1, "idea", 1_700_000_000, &levels());
        let b = dedup_key("7", "BTCUSDT", Timeframe::H1, "idea", 1_700_000_000, &levels());
        assert_eq!(a, b);
    }

    #[test]
    fn any_field_change_changes_the_key() {
        let base = dedup_key("7", "BTCUSDT", Timeframe::H1, "idea", 1_700_000_000, &levels());

        assert_ne!(
            base,
            dedup_key("8", "BTCUSDT", Timeframe::H1, "idea", 1_700_000_000, &levels())
        );
        assert_ne!(
            base,
            dedup_key("7", "ETHUSDT", Timeframe::H1, "idea", 1_700_000_000, &levels())
        );
        assert_ne!(
            base,
            dedup_key("7", "BTCUSDT", Timeframe::H4, "idea", 1_700_000_000, &levels())
        );
        assert_ne!(
            base,
            dedup_key("7", "BTCUSDT", Timeframe::H1, "trade", 1_700_000_000, &levels())
        );
        assert_ne!(
            base,
            dedup_key("7", "BTCUSDT", Timeframe::H1, "idea", 1_700_000_900, &levels())
        );

        let mut shifted = levels();
        shifted.insert("sweep_level".to_string(), LevelValue::Num(101.0));
        assert_ne!(
            base,
            dedup_key("7", "BTCUSDT", Timeframe::H1, "idea", 1_700_000_000, &shifted)
        );
    }

    #[test]
    fn level_insertion_order_is_irrelevant() {
        let mut reversed = LevelMap::new();
        reversed.insert("reclaim_confirmed".to_string(), LevelValue::Flag(true));
        reversed.insert("sweep_level".to_string(), LevelValue::Num(100.25));

        assert_eq!(
            dedup_key("7", "BTCUSDT", Timeframe::H1, "idea", 1_700_000_000, &levels()),
            dedup_key("7", "BTCUSDT", Timeframe::H1, "idea", 1_700_000_000, &reversed),
        );
    }

    #[test]
    fn cooldown_windows_by_category() {
        assert_eq!(
            cooldown_window_secs(MessageType::FibAlert, Preset::Normal),
            90 * 60
        );
        assert_eq!(
            cooldown_window_secs(MessageType::Watchlist, Preset::Normal),
            30 * 60
        );
        assert_eq!(
            cooldown_window_secs(MessageType::TradeFreigabe, Preset::Normal),
            60 * 60
        );
        assert_eq!(
            cooldown_window_secs(MessageType::Combo, Preset::Conservative),
            6 * 3600
        );
        assert_eq!(
            cooldown_window_secs(MessageType::Combo, Preset::Aggressive),
            2 * 3600
        );
    }
}
