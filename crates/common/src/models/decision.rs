use serde::{Deserialize, Serialize};

use super::candle::Timeframe;
use super::feature::{Direction, LevelMap, LevelValue};

/// Technical levels tracked through the IDEA -> TRADE lifecycle. Populated
/// incrementally: the trigger fills the sweep/fib fields, the confirmation
/// fills the break fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SetupLevels {
    pub sweep_level: Option<f64>,
    pub reclaim_confirmed: bool,
    pub fib_zone_low: Option<f64>,
    pub fib_zone_high: Option<f64>,
    pub fib_hit_price: Option<f64>,
    pub choch_level: Option<f64>,
    pub break_level: Option<f64>,
    pub structure_break: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FibLevels {
    pub hit_ratio: Option<f64>,
    pub zone_low: Option<f64>,
    pub zone_high: Option<f64>,
    pub hit_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DecisionKind {
    /// Legacy combined-score evaluation, no persisted state.
    Combo,
    /// Watch-only setup awaiting confirmation.
    Idea(SetupLevels),
    /// Confirmed setup, either an upgrade of an IDEA or a direct entry.
    Trade(SetupLevels),
    /// Standalone fibonacci module alert, bypasses the state machine.
    FibAlert(FibLevels),
    /// Detector-specific alert (e.g. pump, liquidity) outside the state
    /// machine; `module` names the emitting detector.
    ModuleAlert { module: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Combo,
    Watchlist,
    TradeFreigabe,
    FibAlert,
    ModuleAlert,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Combo => "COMBO",
            MessageType::Watchlist => "WATCHLIST",
            MessageType::TradeFreigabe => "TRADE_FREIGABE",
            MessageType::FibAlert => "FIB_ALERT",
            MessageType::ModuleAlert => "MODULE_ALERT",
        }
    }
}

/// One notification candidate produced for a (symbol, timeframe) pair in a
/// single scan pass. Transient: consumed by selection and dispatch, only the
/// underlying Setup is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub kind: DecisionKind,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub side: Direction,
    pub score_total: i32,
    pub reasons: Vec<String>,
    pub candle_ts: i64,
    pub setup_id: Option<String>,
    /// Detector-specific extension fields that have no typed slot.
    #[serde(default)]
    pub extra: LevelMap,
}

impl Decision {
    pub fn message_type(&self) -> MessageType {
        match self.kind {
            DecisionKind::Combo => MessageType::Combo,
            DecisionKind::Idea(_) => MessageType::Watchlist,
            DecisionKind::Trade(_) => MessageType::TradeFreigabe,
            DecisionKind::FibAlert(_) => MessageType::FibAlert,
            DecisionKind::ModuleAlert { .. } => MessageType::ModuleAlert,
        }
    }

    /// Stable lowercase tag used in dedup keys and the sent-signal journal.
    pub fn signal_type(&self) -> String {
        match &self.kind {
            DecisionKind::Combo => "combo".to_string(),
            DecisionKind::Idea(_) => "idea".to_string(),
            DecisionKind::Trade(_) => "trade".to_string(),
            DecisionKind::FibAlert(_) => "fib_alert".to_string(),
            DecisionKind::ModuleAlert { module } => format!("{}_alert", module),
        }
    }

    /// Detector module behind this decision, when one is identifiable.
    pub fn module_hint(&self) -> Option<&str> {
        match &self.kind {
            DecisionKind::FibAlert(_) => Some("fibonacci"),
            DecisionKind::ModuleAlert { module } => Some(module),
            _ => None,
        }
    }

    pub fn is_trade(&self) -> bool {
        matches!(self.kind, DecisionKind::Trade(_))
    }

    /// Countertrend handling: a TRADE that contradicts the 4h bias is not
    /// dropped but demoted back to a watchlist message. The setup itself is
    /// untouched, this only rewrites the outgoing notification.
    pub fn downgrade_to_watchlist(&mut self, reason: String) {
        if let DecisionKind::Trade(levels) = &self.kind {
            self.kind = DecisionKind::Idea(*levels);
            self.reasons.push(reason);
        }
    }

    /// Flattens the typed levels plus extension fields into one key-ordered
    /// map, the canonical input for fingerprinting.
    pub fn level_map(&self) -> LevelMap {
        fn put(map: &mut LevelMap, key: &str, value: Option<f64>) {
            if let Some(v) = value {
                map.insert(key.to_string(), LevelValue::Num(v));
            }
        }

        let mut map = self.extra.clone();
        match &self.kind {
            DecisionKind::Combo | DecisionKind::ModuleAlert { .. } => {}
            DecisionKind::Idea(l) | DecisionKind::Trade(l) => {
                put(&mut map, "sweep_level", l.sweep_level);
                put(&mut map, "fib_zone_low", l.fib_zone_low);
                put(&mut map, "fib_zone_high", l.fib_zone_high);
                put(&mut map, "fib_hit_price", l.fib_hit_price);
                put(&mut map, "choch_level", l.choch_level);
                put(&mut map, "break_level", l.break_level);
                put(&mut map, "structure_break", l.structure_break);
                if l.reclaim_confirmed {
                    map.insert(
                        "reclaim_confirmed".to_string(),
                        LevelValue::Flag(true),
                    );
                }
            }
            DecisionKind::FibAlert(f) => {
                put(&mut map, "fib_hit_ratio", f.hit_ratio);
                put(&mut map, "zone_low", f.zone_low);
                put(&mut map, "zone_high", f.zone_high);
                put(&mut map, "hit_price", f.hit_price);
            }
        }
        map
    }
}
