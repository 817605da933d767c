use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketBias {
    Bull,
    Bear,
    Neutral,
}

impl MarketBias {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketBias::Bull => "BULL",
            MarketBias::Bear => "BEAR",
            MarketBias::Neutral => "NEUTRAL",
        }
    }
}

/// Cascading trend classification for one symbol. Overwritten wholesale on
/// every resolution, no history is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiasSnapshot {
    pub h4: MarketBias,
    pub h1: MarketBias,
    pub m15: MarketBias,
}

impl Default for BiasSnapshot {
    fn default() -> Self {
        Self {
            h4: MarketBias::Neutral,
            h1: MarketBias::Neutral,
            m15: MarketBias::Neutral,
        }
    }
}
