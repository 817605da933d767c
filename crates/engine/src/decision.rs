use std::sync::Arc;

use tracing::debug;

use common::models::{
    Decision, DecisionKind, Direction, FeatureResult, FibLevels, Preset, Setup, SetupLevels,
    SetupStatus, Timeframe, UserSettings,
};

use crate::dedup;
use crate::stores::SetupStore;
use crate::EngineError;

const SWEEP_WEIGHT: i32 = 50;
const FIB_WEIGHT: i32 = 40;
const CONFLUENCE_WEIGHT: i32 = 20;
const CONFLUENCE_CAP: i32 = 30;
const CONFLUENCE_MIN_SCORE: i32 = 70;
const IDEA_TRIGGER_MIN: i32 = 80;
const NORMAL_IDEA_PERSIST_MIN: i32 = 90;

const CHOCH_BONUS: i32 = 40;
const BREAK_CLOSE_BONUS: i32 = 35;
const STRUCTURE_BONUS: i32 = 30;
const DIRECT_TRADE_BASE: i32 = 100;
const TRADE_SCORE_CAP: i32 = 150;

const GOLDEN_ZONE_LOW: f64 = 0.618;
const GOLDEN_ZONE_HIGH: f64 = 0.786;

const COMBO_FEATURE_CLAMP: i32 = 100;
const COMBO_TOTAL_CAP: i32 = 400;
const COMBO_REASON_CAP: usize = 8;

const IDEA_TTL_SECS: i64 = 24 * 3600;

/// Drives the per-(user, symbol, timeframe) setup state machine
/// NONE -> IDEA -> TRADE and falls back to the legacy combined-score
/// evaluation when the state machine has nothing to say.
pub struct DecisionEngine {
    setups: Arc<dyn SetupStore>,
}

struct IdeaSignals<'a> {
    sweep: Option<&'a FeatureResult>,
    fib: Option<&'a FeatureResult>,
    confluence: i32,
    reasons: Vec<String>,
}

impl IdeaSignals<'_> {
    fn has_primary(&self) -> bool {
        self.sweep.is_some() || self.fib.is_some()
    }

    fn score(&self) -> i32 {
        let mut score = self.confluence;
        if self.sweep.is_some() {
            score += SWEEP_WEIGHT;
        }
        if self.fib.is_some() {
            score += FIB_WEIGHT;
        }
        score
    }

    fn side(&self) -> Direction {
        self.sweep
            .or(self.fib)
            .map(|f| f.direction)
            .unwrap_or(Direction::Both)
    }

    fn levels(&self) -> SetupLevels {
        let mut levels = SetupLevels::default();
        if let Some(sweep) = self.sweep {
            levels.sweep_level = sweep
                .level_num("sweep_high")
                .or_else(|| sweep.level_num("sweep_low"));
            levels.reclaim_confirmed = true;
        }
        if let Some(fib) = self.fib {
            levels.fib_zone_low = fib.level_num("zone_low");
            levels.fib_zone_high = fib.level_num("zone_high");
            levels.fib_hit_price = fib.level_num("hit_price");
        }
        levels
    }
}

#[derive(Default)]
struct Confirmation {
    bonus: i32,
    side: Option<Direction>,
    choch_level: Option<f64>,
    break_level: Option<f64>,
    structure_break: Option<f64>,
    reasons: Vec<String>,
}

impl Confirmation {
    fn confirmed(&self) -> bool {
        self.bonus > 0
    }

    fn apply_to(&self, mut levels: SetupLevels) -> SetupLevels {
        if self.choch_level.is_some() {
            levels.choch_level = self.choch_level;
        }
        if self.break_level.is_some() {
            levels.break_level = self.break_level;
        }
        if self.structure_break.is_some() {
            levels.structure_break = self.structure_break;
        }
        levels
    }
}

impl DecisionEngine {
    pub fn new(setups: Arc<dyn SetupStore>) -> Self {
        Self { setups }
    }

    /// Evaluates one (symbol, timeframe) feature set and produces at most one
    /// Decision. Unmet thresholds are not errors; only persistence failures
    /// propagate.
    pub async fn evaluate(
        &self,
        settings: &UserSettings,
        symbol: &str,
        timeframe: Timeframe,
        features: &[FeatureResult],
        candle_ts: i64,
        now: i64,
    ) -> Result<Option<Decision>, EngineError> {
        if features.is_empty() {
            return Ok(None);
        }

        let confirmation = collect_confirmation(features);
        let existing = self
            .setups
            .get_existing_idea(&settings.user_id, symbol, timeframe, now)
            .await?;

        if let Some(idea) = existing {
            if confirmation.confirmed() {
                return self.upgrade(idea, &confirmation, candle_ts, now).await;
            }
            // Active setup, nothing new for it this candle; the legacy
            // combined evaluation still gets its turn.
            return Ok(combo_fallback(settings, symbol, timeframe, features, candle_ts));
        }

        if confirmation.confirmed() && settings.preset == Preset::Aggressive {
            return self
                .direct_trade(settings, symbol, timeframe, &confirmation, candle_ts, now)
                .await;
        }

        let signals = collect_idea_signals(features);
        if signals.has_primary() && signals.score() >= IDEA_TRIGGER_MIN {
            if let Some(decision) = self
                .persist_idea(settings, symbol, timeframe, &signals, candle_ts, now)
                .await?
            {
                return Ok(Some(decision));
            }
        }

        Ok(combo_fallback(settings, symbol, timeframe, features, candle_ts))
    }

    /// The only path that mutates status IDEA -> TRADE. A conditional write in
    /// the store decides races; a lost race suppresses the notification.
    async fn upgrade(
        &self,
        idea: Setup,
        confirmation: &Confirmation,
        candle_ts: i64,
        now: i64,
    ) -> Result<Option<Decision>, EngineError> {
        let idea_score = idea.idea_score.unwrap_or(0);
        let trade_score = (idea_score + confirmation.bonus).min(TRADE_SCORE_CAP);

        let upgraded = self
            .setups
            .upgrade_to_trade(&idea.setup_id, trade_score, now)
            .await?;
        if !upgraded {
            debug!(
                setup_id = %idea.setup_id,
                "upgrade lost to a concurrent evaluation, suppressing"
            );
            return Ok(None);
        }

        Ok(Some(Decision {
            kind: DecisionKind::Trade(confirmation.apply_to(idea.levels)),
            symbol: idea.symbol,
            timeframe: idea.timeframe,
            side: idea.side,
            score_total: trade_score,
            reasons: confirmation.reasons.clone(),
            candle_ts,
            setup_id: Some(idea.setup_id),
            extra: Default::default(),
        }))
    }

    /// Aggressive preset only: a confirmation with no prior IDEA enters
    /// directly in TRADE status.
    async fn direct_trade(
        &self,
        settings: &UserSettings,
        symbol: &str,
        timeframe: Timeframe,
        confirmation: &Confirmation,
        candle_ts: i64,
        now: i64,
    ) -> Result<Option<Decision>, EngineError> {
        let side = confirmation.side.unwrap_or(Direction::Both);
        let trade_score = (DIRECT_TRADE_BASE + confirmation.bonus).min(TRADE_SCORE_CAP);
        let levels = confirmation.apply_to(SetupLevels::default());
        let id = dedup::setup_id(&settings.user_id, symbol, timeframe, side, candle_ts);

        let setup = Setup {
            setup_id: id.clone(),
            user_id: settings.user_id.clone(),
            symbol: symbol.to_string(),
            timeframe,
            side,
            status: SetupStatus::Trade,
            idea_score: None,
            trade_score: Some(trade_score),
            levels,
            created_at: now,
            expires_at: now + IDEA_TTL_SECS,
            confirmed_at: Some(now),
            invalidated_at: None,
        };
        self.setups.create_setup(&setup).await?;

        Ok(Some(Decision {
            kind: DecisionKind::Trade(levels),
            symbol: symbol.to_string(),
            timeframe,
            side,
            score_total: trade_score,
            reasons: confirmation.reasons.clone(),
            candle_ts,
            setup_id: Some(id),
            extra: Default::default(),
        }))
    }

    async fn persist_idea(
        &self,
        settings: &UserSettings,
        symbol: &str,
        timeframe: Timeframe,
        signals: &IdeaSignals<'_>,
        candle_ts: i64,
        now: i64,
    ) -> Result<Option<Decision>, EngineError> {
        let score = signals.score();
        let persist = match settings.preset {
            // Detection only, never notified.
            Preset::Conservative => false,
            Preset::Normal => score >= NORMAL_IDEA_PERSIST_MIN,
            Preset::Aggressive => true,
        };
        if !persist {
            debug!(%symbol, %timeframe, score, "idea detected but below persist policy");
            return Ok(None);
        }

        let side = signals.side();
        let levels = signals.levels();
        let id = dedup::setup_id(&settings.user_id, symbol, timeframe, side, candle_ts);

        let setup = Setup {
            setup_id: id.clone(),
            user_id: settings.user_id.clone(),
            symbol: symbol.to_string(),
            timeframe,
            side,
            status: SetupStatus::Idea,
            idea_score: Some(score),
            trade_score: None,
            levels,
            created_at: now,
            expires_at: now + IDEA_TTL_SECS,
            confirmed_at: None,
            invalidated_at: None,
        };
        self.setups.create_setup(&setup).await?;

        Ok(Some(Decision {
            kind: DecisionKind::Idea(levels),
            symbol: symbol.to_string(),
            timeframe,
            side,
            score_total: score,
            reasons: signals.reasons.clone(),
            candle_ts,
            setup_id: Some(id),
            extra: Default::default(),
        }))
    }
}

fn collect_idea_signals(features: &[FeatureResult]) -> IdeaSignals<'_> {
    let mut signals = IdeaSignals {
        sweep: None,
        fib: None,
        confluence: 0,
        reasons: Vec::new(),
    };

    for feature in features {
        match feature.module.as_str() {
            "smc" | "liquidity" => {
                let swept = feature.level_num("sweep_high").is_some()
                    || feature.level_num("sweep_low").is_some();
                if signals.sweep.is_none() && swept && feature.level_flag("reclaim_close") {
                    signals.sweep = Some(feature);
                    signals.reasons.push("Liquidity sweep with reclaim".to_string());
                }
            }
            "fibonacci" => {
                let golden = feature
                    .level_num("fib_hit_ratio")
                    .is_some_and(|r| (GOLDEN_ZONE_LOW..=GOLDEN_ZONE_HIGH).contains(&r));
                if signals.fib.is_none() && golden {
                    signals.fib = Some(feature);
                    signals.reasons.push("Fibonacci golden zone hit".to_string());
                }
            }
            "volume" | "rsi_divergence" | "macd" => {
                if feature.score >= CONFLUENCE_MIN_SCORE && signals.confluence < CONFLUENCE_CAP {
                    signals.confluence =
                        (signals.confluence + CONFLUENCE_WEIGHT).min(CONFLUENCE_CAP);
                    signals.reasons.push(format!("Confluence: {}", feature.module));
                }
            }
            _ => {}
        }
    }

    signals
}

/// Bonuses are additive across distinct confirmation types, each counted once.
fn collect_confirmation(features: &[FeatureResult]) -> Confirmation {
    let mut confirmation = Confirmation::default();
    let mut seen_choch = false;
    let mut seen_break = false;
    let mut seen_structure = false;

    for feature in features {
        if !seen_choch && feature.level_flag("choch_confirmed") {
            seen_choch = true;
            confirmation.bonus += CHOCH_BONUS;
            confirmation.choch_level = feature.level_num("broken_level");
            confirmation.side.get_or_insert(feature.direction);
            confirmation.reasons.push("CHoCH confirmed".to_string());
        }
        if !seen_break && feature.level_flag("break_and_close") {
            seen_break = true;
            confirmation.bonus += BREAK_CLOSE_BONUS;
            confirmation.break_level = feature.level_num("break_level");
            confirmation.side.get_or_insert(feature.direction);
            confirmation
                .reasons
                .push("Break and close through key level".to_string());
        }
        let broke_structure =
            feature.level_flag("lh_break") || feature.level_flag("hl_break");
        if !seen_structure && broke_structure {
            seen_structure = true;
            confirmation.bonus += STRUCTURE_BONUS;
            confirmation.structure_break = feature.level_num("structure_level");
            confirmation.side.get_or_insert(feature.direction);
            let label = if feature.level_flag("lh_break") {
                "LH break after sweep"
            } else {
                "HL break after sweep"
            };
            confirmation.reasons.push(label.to_string());
        }
    }

    confirmation
}

fn combo_category(module: &str) -> Option<&'static str> {
    match module {
        "fibonacci" | "smc" | "liquidity" => Some("level"),
        "rsi_divergence" | "macd" => Some("momentum"),
        "volume" | "pump" => Some("participation"),
        _ => None,
    }
}

/// Legacy combined-score evaluation, stateless. Requires representation from
/// at least two of the three signal categories.
fn combo_fallback(
    settings: &UserSettings,
    symbol: &str,
    timeframe: Timeframe,
    features: &[FeatureResult],
    candle_ts: i64,
) -> Option<Decision> {
    let mut total = 0i32;
    let mut categories = std::collections::BTreeSet::new();
    let mut long_weight = 0i32;
    let mut short_weight = 0i32;

    let mut ranked: Vec<&FeatureResult> = features.iter().collect();
    ranked.sort_by(|a, b| b.score.cmp(&a.score));

    for feature in &ranked {
        let clamped = feature.score.clamp(0, COMBO_FEATURE_CLAMP);
        total += clamped;
        if let Some(category) = combo_category(&feature.module) {
            categories.insert(category);
        }
        match feature.direction {
            Direction::Long => long_weight += clamped,
            Direction::Short => short_weight += clamped,
            Direction::Both => {}
        }
    }
    total = total.min(COMBO_TOTAL_CAP);

    if categories.len() < 2 || total < settings.combo_min_score {
        return None;
    }

    let side = if long_weight > short_weight {
        Direction::Long
    } else if short_weight > long_weight {
        Direction::Short
    } else {
        Direction::Both
    };

    let mut reasons = Vec::new();
    let mut extra = common::models::LevelMap::new();
    for feature in &ranked {
        for reason in &feature.reasons {
            if reasons.len() < COMBO_REASON_CAP {
                reasons.push(reason.clone());
            }
        }
        for (key, value) in &feature.levels {
            extra.entry(key.clone()).or_insert(*value);
        }
    }

    Some(Decision {
        kind: DecisionKind::Combo,
        symbol: symbol.to_string(),
        timeframe,
        side,
        score_total: total,
        reasons,
        candle_ts,
        setup_id: None,
        extra,
    })
}

/// Standalone fibonacci alert, emitted when a pair's evaluation produced no
/// state-machine decision but fibonacci features are present. Scored as the
/// sum of the top-2 fib feature scores.
pub fn fib_alert(
    symbol: &str,
    timeframe: Timeframe,
    features: &[FeatureResult],
    candle_ts: i64,
) -> Option<Decision> {
    let mut fibs: Vec<&FeatureResult> = features
        .iter()
        .filter(|f| f.module == "fibonacci")
        .collect();
    if fibs.is_empty() {
        return None;
    }
    fibs.sort_by(|a, b| b.score.cmp(&a.score));

    let best = fibs[0];
    let score: i32 = fibs.iter().take(2).map(|f| f.score).sum();
    let levels = FibLevels {
        hit_ratio: best.level_num("fib_hit_ratio"),
        zone_low: best.level_num("zone_low"),
        zone_high: best.level_num("zone_high"),
        hit_price: best.level_num("hit_price"),
    };
    let reasons = fibs
        .iter()
        .take(2)
        .flat_map(|f| f.reasons.iter().cloned())
        .collect();

    Some(Decision {
        kind: DecisionKind::FibAlert(levels),
        symbol: symbol.to_string(),
        timeframe,
        side: best.direction,
        score_total: score,
        reasons,
        candle_ts,
        setup_id: None,
        extra: Default::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MockSetupStore;
    use common::models::{LevelValue, Strength};

    const NOW: i64 = 1_700_000_000;
    const CANDLE_TS: i64 = 1_699_999_000_000;

    fn feature(module: &str, score: i32, levels: &[(&str, LevelValue)]) -> FeatureResult {
        FeatureResult {
            module: module.to_string(),
            symbol: "BTCUSDT".to_string(),
            timeframe: Timeframe::H1,
            candle_ts: CANDLE_TS,
            direction: Direction::Long,
            strength: Strength::Strong,
            score,
            reasons: vec![format!("{} signal", module)],
            levels: levels
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect(),
        }
    }

    fn sweep_feature() -> FeatureResult {
        feature(
            "smc",
            85,
            &[
                ("sweep_high", LevelValue::Num(100.0)),
                ("reclaim_close", LevelValue::Flag(true)),
            ],
        )
    }

    fn golden_fib_feature() -> FeatureResult {
        feature("fibonacci", 80, &[("fib_hit_ratio", LevelValue::Num(0.65))])
    }

    fn choch_feature() -> FeatureResult {
        feature(
            "smc",
            88,
            &[
                ("choch_confirmed", LevelValue::Flag(true)),
                ("broken_level", LevelValue::Num(105.0)),
            ],
        )
    }

    fn settings(preset: Preset) -> UserSettings {
        UserSettings {
            preset,
            combo_min_score: preset.combo_min_score(),
            ..UserSettings::defaults_for("7")
        }
    }

    fn idea_setup() -> Setup {
        Setup {
            setup_id: "abc123".to_string(),
            user_id: "7".to_string(),
            symbol: "BTCUSDT".to_string(),
            timeframe: Timeframe::H1,
            side: Direction::Long,
            status: SetupStatus::Idea,
            idea_score: Some(90),
            trade_score: None,
            levels: SetupLevels {
                sweep_level: Some(100.0),
                reclaim_confirmed: true,
                ..Default::default()
            },
            created_at: NOW - 3600,
            expires_at: NOW + 3600,
            confirmed_at: None,
            invalidated_at: None,
        }
    }

    fn engine_with(store: MockSetupStore) -> DecisionEngine {
        DecisionEngine::new(Arc::new(store))
    }

    #[tokio::test]
    async fn sweep_plus_fib_persists_idea_at_90() {
        let mut store = MockSetupStore::new();
        store
            .expect_get_existing_idea()
            .returning(|_, _, _, _| Ok(None));
        store
            .expect_create_setup()
            .withf(|s| s.status == SetupStatus::Idea && s.idea_score == Some(90))
            .times(1)
            .returning(|_| Ok(()));

        let engine = engine_with(store);
        let features = vec![sweep_feature(), golden_fib_feature()];
        let decision = engine
            .evaluate(
                &settings(Preset::Aggressive),
                "BTCUSDT",
                Timeframe::H1,
                &features,
                CANDLE_TS,
                NOW,
            )
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(decision.kind, DecisionKind::Idea(_)));
        assert_eq!(decision.score_total, 90);
        assert_eq!(decision.side, Direction::Long);
        assert!(decision.setup_id.is_some());
    }

    #[tokio::test]
    async fn conservative_preset_never_persists_ideas() {
        let mut store = MockSetupStore::new();
        store
            .expect_get_existing_idea()
            .returning(|_, _, _, _| Ok(None));
        store.expect_create_setup().times(0);

        let engine = engine_with(store);
        // Sweep and fib are both level-category features, so the combo
        // fallback cannot fire either.
        let features = vec![sweep_feature(), golden_fib_feature()];
        let decision = engine
            .evaluate(
                &settings(Preset::Conservative),
                "BTCUSDT",
                Timeframe::H1,
                &features,
                CANDLE_TS,
                NOW,
            )
            .await
            .unwrap();

        assert!(decision.is_none());
    }

    #[tokio::test]
    async fn active_idea_without_confirmation_falls_back_to_combo() {
        let mut store = MockSetupStore::new();
        store
            .expect_get_existing_idea()
            .returning(|_, _, _, _| Ok(Some(idea_setup())));
        store.expect_upgrade_to_trade().times(0);

        let engine = engine_with(store);
        let features = vec![
            feature("macd", 75, &[]),
            feature("volume", 90, &[]),
            feature("fibonacci", 80, &[("fib_hit_ratio", LevelValue::Num(0.5))]),
        ];
        let decision = engine
            .evaluate(
                &settings(Preset::Normal),
                "BTCUSDT",
                Timeframe::H1,
                &features,
                CANDLE_TS,
                NOW,
            )
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(decision.kind, DecisionKind::Combo));
        assert_eq!(decision.score_total, 245);
    }

    #[tokio::test]
    async fn idea_below_persist_policy_still_runs_combo() {
        // Sweep 50 + confluence capped at 30 = 80: trigger reached, but
        // below the normal preset's 90 persist bar.
        let mut store = MockSetupStore::new();
        store
            .expect_get_existing_idea()
            .returning(|_, _, _, _| Ok(None));
        store.expect_create_setup().times(0);

        let engine = engine_with(store);
        let features = vec![
            sweep_feature(),
            feature("volume", 90, &[]),
            feature("macd", 75, &[]),
        ];
        let decision = engine
            .evaluate(
                &settings(Preset::Normal),
                "BTCUSDT",
                Timeframe::H1,
                &features,
                CANDLE_TS,
                NOW,
            )
            .await
            .unwrap()
            .unwrap();

        assert!(matches!(decision.kind, DecisionKind::Combo));
        assert_eq!(decision.score_total, 250);
    }

    #[tokio::test]
    async fn normal_preset_requires_90_to_persist() {
        // Sweep alone is 50, plus one confluence = 70: trigger not reached.
        // Sweep + fib = 90: persisted under normal.
        let mut store = MockSetupStore::new();
        store
            .expect_get_existing_idea()
            .returning(|_, _, _, _| Ok(None));
        store
            .expect_create_setup()
            .times(1)
            .returning(|_| Ok(()));

        let engine = engine_with(store);
        let features = vec![sweep_feature(), golden_fib_feature()];
        let decision = engine
            .evaluate(
                &settings(Preset::Normal),
                "BTCUSDT",
                Timeframe::H1,
                &features,
                CANDLE_TS,
                NOW,
            )
            .await
            .unwrap();

        assert!(decision.is_some());
    }

    #[tokio::test]
    async fn choch_upgrades_existing_idea() {
        let mut store = MockSetupStore::new();
        store
            .expect_get_existing_idea()
            .returning(|_, _, _, _| Ok(Some(idea_setup())));
        store
            .expect_upgrade_to_trade()
            .withf(|id, score, _| id == "abc123" && *score == 130)
            .times(1)
            .returning(|_, _, _| Ok(true));

        let engine = engine_with(store);
        let features = vec![choch_feature()];
        let decision = engine
            .evaluate(
                &settings(Preset::Normal),
                "BTCUSDT",
                Timeframe::H1,
                &features,
                CANDLE_TS,
                NOW,
            )
            .await
            .unwrap()
            .unwrap();

        assert!(decision.is_trade());
        assert_eq!(decision.score_total, 130);
        assert_eq!(decision.setup_id.as_deref(), Some("abc123"));
        if let DecisionKind::Trade(levels) = decision.kind {
            assert_eq!(levels.sweep_level, Some(100.0));
            assert_eq!(levels.choch_level, Some(105.0));
        }
    }

    #[tokio::test]
    async fn reclaim_without_sweep_level_is_not_a_trigger() {
        let mut store = MockSetupStore::new();
        store
            .expect_get_existing_idea()
            .returning(|_, _, _, _| Ok(None));
        store.expect_create_setup().times(0);

        let engine = engine_with(store);
        // A reclaim flag with no swept level does not count as a grab.
        let features = vec![
            feature("smc", 85, &[("reclaim_close", LevelValue::Flag(true))]),
            golden_fib_feature(),
        ];
        let decision = engine
            .evaluate(
                &settings(Preset::Aggressive),
                "BTCUSDT",
                Timeframe::H1,
                &features,
                CANDLE_TS,
                NOW,
            )
            .await
            .unwrap();

        assert!(decision.is_none());
    }

    #[tokio::test]
    async fn hl_break_upgrades_existing_idea() {
        let mut store = MockSetupStore::new();
        store
            .expect_get_existing_idea()
            .returning(|_, _, _, _| Ok(Some(idea_setup())));
        store
            .expect_upgrade_to_trade()
            .withf(|id, score, _| id == "abc123" && *score == 120)
            .times(1)
            .returning(|_, _, _| Ok(true));

        let engine = engine_with(store);
        let features = vec![feature(
            "smc",
            82,
            &[
                ("hl_break", LevelValue::Flag(true)),
                ("structure_level", LevelValue::Num(99.5)),
            ],
        )];
        let decision = engine
            .evaluate(
                &settings(Preset::Normal),
                "BTCUSDT",
                Timeframe::H1,
                &features,
                CANDLE_TS,
                NOW,
            )
            .await
            .unwrap()
            .unwrap();

        assert!(decision.is_trade());
        assert_eq!(decision.score_total, 120);
        if let DecisionKind::Trade(levels) = decision.kind {
            assert_eq!(levels.structure_break, Some(99.5));
        }
    }

    #[tokio::test]
    async fn lost_upgrade_race_suppresses_notification() {
        let mut store = MockSetupStore::new();
        store
            .expect_get_existing_idea()
            .returning(|_, _, _, _| Ok(Some(idea_setup())));
        store
            .expect_upgrade_to_trade()
            .returning(|_, _, _| Ok(false));

        let engine = engine_with(store);
        let features = vec![choch_feature()];
        let decision = engine
            .evaluate(
                &settings(Preset::Normal),
                "BTCUSDT",
                Timeframe::H1,
                &features,
                CANDLE_TS,
                NOW,
            )
            .await
            .unwrap();

        assert!(decision.is_none());
    }

    #[tokio::test]
    async fn aggressive_direct_trade_without_prior_idea() {
        let mut store = MockSetupStore::new();
        store
            .expect_get_existing_idea()
            .returning(|_, _, _, _| Ok(None));
        store
            .expect_create_setup()
            .withf(|s| s.status == SetupStatus::Trade && s.trade_score == Some(140))
            .times(1)
            .returning(|_| Ok(()));

        let engine = engine_with(store);
        let features = vec![choch_feature()];
        let decision = engine
            .evaluate(
                &settings(Preset::Aggressive),
                "BTCUSDT",
                Timeframe::H1,
                &features,
                CANDLE_TS,
                NOW,
            )
            .await
            .unwrap()
            .unwrap();

        assert!(decision.is_trade());
        assert_eq!(decision.score_total, 140);
    }

    #[tokio::test]
    async fn normal_preset_never_emits_direct_trade() {
        let mut store = MockSetupStore::new();
        store
            .expect_get_existing_idea()
            .returning(|_, _, _, _| Ok(None));
        store.expect_create_setup().times(0);

        let engine = engine_with(store);
        let features = vec![choch_feature()];
        let decision = engine
            .evaluate(
                &settings(Preset::Normal),
                "BTCUSDT",
                Timeframe::H1,
                &features,
                CANDLE_TS,
                NOW,
            )
            .await
            .unwrap();

        // Falls through to combo, which a single category cannot satisfy.
        assert!(decision.is_none());
    }

    #[tokio::test]
    async fn combo_fallback_requires_two_categories() {
        let mut store = MockSetupStore::new();
        store
            .expect_get_existing_idea()
            .returning(|_, _, _, _| Ok(None));

        let engine = engine_with(store);
        let mixed = vec![
            feature("macd", 75, &[]),
            feature("volume", 90, &[]),
            feature("fibonacci", 80, &[("fib_hit_ratio", LevelValue::Num(0.5))]),
        ];
        let decision = engine
            .evaluate(
                &settings(Preset::Normal),
                "BTCUSDT",
                Timeframe::H1,
                &mixed,
                CANDLE_TS,
                NOW,
            )
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(decision.kind, DecisionKind::Combo));
        assert_eq!(decision.score_total, 245);
        assert_eq!(decision.side, Direction::Long);

        let single = vec![feature("volume", 95, &[]), feature("pump", 90, &[])];
        let decision = engine
            .evaluate(
                &settings(Preset::Normal),
                "BTCUSDT",
                Timeframe::H1,
                &single,
                CANDLE_TS,
                NOW,
            )
            .await
            .unwrap();
        assert!(decision.is_none());
    }

    #[tokio::test]
    async fn empty_features_yield_no_decision() {
        let store = MockSetupStore::new();
        let engine = engine_with(store);
        let decision = engine
            .evaluate(
                &settings(Preset::Normal),
                "BTCUSDT",
                Timeframe::H1,
                &[],
                CANDLE_TS,
                NOW,
            )
            .await
            .unwrap();
        assert!(decision.is_none());
    }

    #[test]
    fn fib_alert_sums_top_two_scores() {
        let features = vec![
            feature("fibonacci", 70, &[("fib_hit_ratio", LevelValue::Num(0.705))]),
            feature("fibonacci", 55, &[("fib_hit_ratio", LevelValue::Num(0.5))]),
            feature("volume", 90, &[]),
        ];
        let alert = fib_alert("BTCUSDT", Timeframe::H1, &features, CANDLE_TS).unwrap();
        assert!(matches!(alert.kind, DecisionKind::FibAlert(_)));
        assert_eq!(alert.score_total, 125);

        assert!(fib_alert("BTCUSDT", Timeframe::H1, &[feature("volume", 90, &[])], CANDLE_TS).is_none());
    }
}
