pub mod bias;
pub mod candle;
pub mod decision;
pub mod feature;
pub mod settings;
pub mod setup;
pub mod topic;

pub use bias::{BiasSnapshot, MarketBias};
pub use candle::{Candle, Timeframe};
pub use decision::{Decision, DecisionKind, FibLevels, MessageType, SetupLevels};
pub use feature::{Direction, FeatureResult, LevelMap, LevelValue, Strength};
pub use settings::{Preset, UserSettings};
pub use setup::{Setup, SetupStatus};
pub use topic::Topic;
