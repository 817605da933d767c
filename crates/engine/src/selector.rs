use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use common::models::{Decision, Topic};

use crate::router::TopicRouter;
use crate::stores::RotationStore;
use crate::EngineError;

pub const DEFAULT_GLOBAL_CAP: usize = 15;
pub const DEFAULT_ROTATION_SECS: i64 = 4 * 3600;
pub const GOOD_CANDIDATE_MIN_SCORE: i32 = 200;

const PRIORITY_COMBO: i32 = 100;
const PRIORITY_TRADE: i32 = 90;
const PRIORITY_IDEA: i32 = 70;
const PRIORITY_PUMP: i32 = 60;
const PRIORITY_FIB: i32 = 50;
const PRIORITY_LIQUIDITY: i32 = 50;
const PRIORITY_GENERAL: i32 = 40;

#[derive(Debug, Clone)]
pub struct SelectorConfig {
    pub topic_caps: BTreeMap<Topic, usize>,
    pub global_cap: usize,
    /// Minimum interval before the same (user, topic, symbol) may be sent
    /// again.
    pub rotation_secs: i64,
    pub good_candidate_min: i32,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        let topic_caps = BTreeMap::from([
            (Topic::Combo, 3),
            (Topic::Idea, 4),
            (Topic::Fibonacci, 3),
            (Topic::Liquidity, 3),
            (Topic::Pump, 3),
        ]);
        Self {
            topic_caps,
            global_cap: DEFAULT_GLOBAL_CAP,
            rotation_secs: DEFAULT_ROTATION_SECS,
            good_candidate_min: GOOD_CANDIDATE_MIN_SCORE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SelectedDecision {
    pub topic: Topic,
    pub decision: Decision,
}

/// Outcome of one selection pass: the bounded notify-set plus the unselected
/// high scorers retained for a digest.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub selected: Vec<SelectedDecision>,
    pub good_candidates: Vec<Decision>,
}

/// Converts the raw Decisions of one scan pass into a bounded, diverse
/// notify-set: one alert per symbol, per-topic quotas, a global cap, and
/// cross-scan rotation against the persisted last-sent timestamps.
pub struct SignalSelector {
    rotation: Arc<dyn RotationStore>,
    config: SelectorConfig,
}

impl SignalSelector {
    pub fn new(rotation: Arc<dyn RotationStore>, config: SelectorConfig) -> Self {
        Self { rotation, config }
    }

    pub async fn select(
        &self,
        user_id: &str,
        decisions: Vec<Decision>,
        now: i64,
    ) -> Result<Selection, EngineError> {
        let mut ranked: Vec<(Topic, i32, Decision)> = decisions
            .into_iter()
            .map(|d| {
                let topic = TopicRouter::classify_decision(&d);
                let priority = priority(&d, topic);
                (topic, priority, d)
            })
            .collect();
        // Stable sort, ties preserve input order.
        ranked.sort_by(|a, b| (b.1, b.2.score_total).cmp(&(a.1, a.2.score_total)));

        let mut selection = Selection::default();
        let mut seen_symbols: HashSet<String> = HashSet::new();
        let mut topic_counts: BTreeMap<Topic, usize> = BTreeMap::new();

        for (topic, _, decision) in ranked {
            if selection.selected.len() >= self.config.global_cap
                || !self.admit(&mut seen_symbols, &mut topic_counts, topic, &decision)
            {
                self.retain_good(&mut selection, decision);
                continue;
            }

            if let Some(sent_at) = self
                .rotation
                .last_sent(user_id, topic, &decision.symbol)
                .await?
            {
                if now - sent_at < self.config.rotation_secs {
                    debug!(symbol = %decision.symbol, %topic, "rotation window still open, skipping");
                    // Undo the tentative admission so another decision can
                    // use the slot.
                    seen_symbols.remove(&decision.symbol);
                    if let Some(count) = topic_counts.get_mut(&topic) {
                        *count -= 1;
                    }
                    self.retain_good(&mut selection, decision);
                    continue;
                }
            }
            self.rotation
                .mark_sent(user_id, topic, &decision.symbol, now)
                .await?;

            selection.selected.push(SelectedDecision { topic, decision });
        }

        Ok(selection)
    }

    fn admit(
        &self,
        seen_symbols: &mut HashSet<String>,
        topic_counts: &mut BTreeMap<Topic, usize>,
        topic: Topic,
        decision: &Decision,
    ) -> bool {
        if seen_symbols.contains(&decision.symbol) {
            return false;
        }
        let cap = self
            .config
            .topic_caps
            .get(&topic)
            .copied()
            .unwrap_or(usize::MAX);
        let count = topic_counts.entry(topic).or_insert(0);
        if *count >= cap {
            return false;
        }
        *count += 1;
        seen_symbols.insert(decision.symbol.clone());
        true
    }

    fn retain_good(&self, selection: &mut Selection, decision: Decision) {
        if decision.score_total >= self.config.good_candidate_min {
            selection.good_candidates.push(decision);
        }
    }
}

fn priority(decision: &Decision, topic: Topic) -> i32 {
    if decision.is_trade() {
        return PRIORITY_TRADE;
    }
    match topic {
        Topic::Combo => PRIORITY_COMBO,
        Topic::Idea => PRIORITY_IDEA,
        Topic::Pump => PRIORITY_PUMP,
        Topic::Fibonacci => PRIORITY_FIB,
        Topic::Liquidity => PRIORITY_LIQUIDITY,
        Topic::General => PRIORITY_GENERAL,
    }
}
