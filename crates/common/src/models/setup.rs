use serde::{Deserialize, Serialize};

use super::candle::Timeframe;
use super::decision::SetupLevels;
use super::feature::Direction;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetupStatus {
    Idea,
    Trade,
}

impl SetupStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetupStatus::Idea => "IDEA",
            SetupStatus::Trade => "TRADE",
        }
    }

    pub fn parse(s: &str) -> Option<SetupStatus> {
        match s {
            "IDEA" => Some(SetupStatus::Idea),
            "TRADE" => Some(SetupStatus::Trade),
            _ => None,
        }
    }
}

/// A persisted trading opportunity tracked through IDEA/TRADE states.
///
/// Invariant: at most one active (non-expired, non-invalidated) setup per
/// (user, symbol, timeframe); status only ever moves IDEA -> TRADE.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setup {
    pub setup_id: String,
    pub user_id: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub side: Direction,
    pub status: SetupStatus,
    pub idea_score: Option<i32>,
    pub trade_score: Option<i32>,
    pub levels: SetupLevels,
    pub created_at: i64,
    pub expires_at: i64,
    pub confirmed_at: Option<i64>,
    pub invalidated_at: Option<i64>,
}
