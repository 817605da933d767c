use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Conservative,
    Normal,
    Aggressive,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Conservative => "conservative",
            Preset::Normal => "normal",
            Preset::Aggressive => "aggressive",
        }
    }

    pub fn parse(s: &str) -> Option<Preset> {
        match s {
            "conservative" => Some(Preset::Conservative),
            "normal" => Some(Preset::Normal),
            "aggressive" => Some(Preset::Aggressive),
            _ => None,
        }
    }

    pub fn combo_min_score(&self) -> i32 {
        match self {
            Preset::Conservative => 80,
            Preset::Normal => 70,
            Preset::Aggressive => 60,
        }
    }

    pub fn cooldown_hours(&self) -> i64 {
        match self {
            Preset::Conservative => 6,
            Preset::Normal => 4,
            Preset::Aggressive => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: String,
    pub preset: Preset,
    /// If non-empty, scanning is restricted to these symbols.
    pub watchlist: Vec<String>,
    /// Per-detector enable flags, absent means enabled.
    pub modules: BTreeMap<String, bool>,
    pub combo_min_score: i32,
}

impl UserSettings {
    pub fn defaults_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            preset: Preset::Normal,
            watchlist: Vec::new(),
            modules: BTreeMap::new(),
            combo_min_score: Preset::Normal.combo_min_score(),
        }
    }

    pub fn module_enabled(&self, module: &str) -> bool {
        self.modules.get(module).copied().unwrap_or(true)
    }
}
