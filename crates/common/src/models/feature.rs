use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::candle::Timeframe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
    Both,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
            Direction::Both => "both",
        }
    }

    pub fn parse(s: &str) -> Option<Direction> {
        match s {
            "long" => Some(Direction::Long),
            "short" => Some(Direction::Short),
            "both" => Some(Direction::Both),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    Weak,
    Medium,
    Strong,
    Elite,
}

/// A free-form technical level as emitted by a detector: either a price-like
/// number or a boolean marker (e.g. `reclaim_close`, `choch_confirmed`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LevelValue {
    Num(f64),
    Flag(bool),
}

impl LevelValue {
    pub fn as_num(&self) -> Option<f64> {
        match self {
            LevelValue::Num(v) => Some(*v),
            LevelValue::Flag(_) => None,
        }
    }

    pub fn as_flag(&self) -> bool {
        matches!(self, LevelValue::Flag(true))
    }
}

/// BTreeMap so that serializations used for fingerprinting are key-ordered.
pub type LevelMap = BTreeMap<String, LevelValue>;

/// Output of one detector run for one (symbol, timeframe) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureResult {
    pub module: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub candle_ts: i64,
    pub direction: Direction,
    pub strength: Strength,
    pub score: i32,
    pub reasons: Vec<String>,
    #[serde(default)]
    pub levels: LevelMap,
}

impl FeatureResult {
    pub fn level_num(&self, key: &str) -> Option<f64> {
        self.levels.get(key).and_then(LevelValue::as_num)
    }

    pub fn level_flag(&self, key: &str) -> bool {
        self.levels.get(key).is_some_and(LevelValue::as_flag)
    }
}
