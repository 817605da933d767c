use serde::{Deserialize, Serialize};

/// Notification category used for forum-thread routing, diversity capping and
/// cross-scan rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Topic {
    Combo,
    Idea,
    Fibonacci,
    Liquidity,
    Pump,
    General,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Combo => "COMBO",
            Topic::Idea => "IDEA",
            Topic::Fibonacci => "FIBONACCI",
            Topic::Liquidity => "LIQUIDITY",
            Topic::Pump => "PUMP",
            Topic::General => "GENERAL",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
