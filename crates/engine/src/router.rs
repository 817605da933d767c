use common::models::{Decision, DecisionKind, Topic};

/// Forum thread ids per topic. Unmapped categories land in GENERAL, a message
/// is never dropped for routing reasons.
pub const THREAD_COMBO: i32 = 5;
pub const THREAD_FIBONACCI: i32 = 9;
pub const THREAD_LIQUIDITY: i32 = 11;
pub const THREAD_PUMP: i32 = 15;
pub const THREAD_IDEA: i32 = 114;
pub const THREAD_GENERAL: i32 = 1;

const COMBO_KEYWORD_MIN_SCORE: i32 = 300;
const FIB_RECLASSIFY_MIN_SCORE: i32 = 300;
const FIB_RECLASSIFY_MIN_REASONS: usize = 2;

const COMBO_KEYWORDS: &[&str] = &["combo", "confluence", "structure"];
const FIB_KEYWORDS: &[&str] = &["fib", "golden", "retracement", "0.618", "0.786"];
const LIQUIDITY_KEYWORDS: &[&str] = &["liquidity", "sweep", "reclaim", "stop hunt"];
const PUMP_KEYWORDS: &[&str] = &["pump", "spike", "volume surge"];

pub struct TopicRouter;

impl TopicRouter {
    /// Topic of a Decision, from its kind first, content heuristics second.
    /// A COMBO dominated by fibonacci reasons at high score is reclassified
    /// as FIBONACCI so it competes in the right quota.
    pub fn classify_decision(decision: &Decision) -> Topic {
        match &decision.kind {
            DecisionKind::Combo => {
                if decision.score_total >= FIB_RECLASSIFY_MIN_SCORE
                    && fib_flavored_reasons(decision) >= FIB_RECLASSIFY_MIN_REASONS
                {
                    Topic::Fibonacci
                } else {
                    Topic::Combo
                }
            }
            DecisionKind::Idea(_) => Topic::Idea,
            // Confirmed trades graduate out of the watchlist thread and
            // compete in the COMBO quota.
            DecisionKind::Trade(_) => Topic::Combo,
            DecisionKind::FibAlert(_) => Topic::Fibonacci,
            DecisionKind::ModuleAlert { module } => match module.as_str() {
                "pump" => Topic::Pump,
                "liquidity" => Topic::Liquidity,
                "fibonacci" => Topic::Fibonacci,
                _ => Topic::General,
            },
        }
    }

    /// Text-level classification for messages without a Decision attached.
    /// Priority: explicit module metadata, combo keywords at high score, then
    /// the per-topic keyword sets, defaulting to IDEA.
    pub fn classify_text(text: &str, score: i32, module: Option<&str>) -> Topic {
        if let Some(module) = module {
            match module {
                "fibonacci" => return Topic::Fibonacci,
                "liquidity" | "smc" => return Topic::Liquidity,
                "pump" | "volume" => return Topic::Pump,
                _ => {}
            }
        }

        let lower = text.to_lowercase();
        if score >= COMBO_KEYWORD_MIN_SCORE && contains_any(&lower, COMBO_KEYWORDS) {
            return Topic::Combo;
        }
        if contains_any(&lower, FIB_KEYWORDS) {
            return Topic::Fibonacci;
        }
        if contains_any(&lower, LIQUIDITY_KEYWORDS) {
            return Topic::Liquidity;
        }
        if contains_any(&lower, PUMP_KEYWORDS) {
            return Topic::Pump;
        }
        Topic::Idea
    }

    pub fn thread_id(topic: Topic) -> i32 {
        match topic {
            Topic::Combo => THREAD_COMBO,
            Topic::Fibonacci => THREAD_FIBONACCI,
            Topic::Liquidity => THREAD_LIQUIDITY,
            Topic::Pump => THREAD_PUMP,
            Topic::Idea => THREAD_IDEA,
            Topic::General => THREAD_GENERAL,
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn fib_flavored_reasons(decision: &Decision) -> usize {
    decision
        .reasons
        .iter()
        .filter(|r| {
            let lower = r.to_lowercase();
            contains_any(&lower, FIB_KEYWORDS)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::{Direction, FibLevels, Timeframe};

    fn decision(kind: DecisionKind, score: i32, reasons: Vec<&str>) -> Decision {
        Decision {
            kind,
            symbol: "BTCUSDT".to_string(),
            timeframe: Timeframe::H1,
            side: Direction::Long,
            score_total: score,
            reasons: reasons.into_iter().map(String::from).collect(),
            candle_ts: 0,
            setup_id: None,
            extra: Default::default(),
        }
    }

    #[test]
    fn kinds_map_to_topics() {
        assert_eq!(
            TopicRouter::classify_decision(&decision(DecisionKind::Combo, 250, vec![])),
            Topic::Combo
        );
        assert_eq!(
            TopicRouter::classify_decision(&decision(
                DecisionKind::Idea(Default::default()),
                90,
                vec![]
            )),
            Topic::Idea
        );
        assert_eq!(
            TopicRouter::classify_decision(&decision(
                DecisionKind::FibAlert(FibLevels::default()),
                120,
                vec![]
            )),
            Topic::Fibonacci
        );
        assert_eq!(
            TopicRouter::classify_decision(&decision(
                DecisionKind::ModuleAlert {
                    module: "pump".to_string()
                },
                80,
                vec![]
            )),
            Topic::Pump
        );
    }

    #[test]
    fn confirmed_trades_route_to_the_combo_thread() {
        let trade = decision(DecisionKind::Trade(Default::default()), 130, vec![]);
        let topic = TopicRouter::classify_decision(&trade);
        assert_eq!(topic, Topic::Combo);
        assert_eq!(TopicRouter::thread_id(topic), THREAD_COMBO);
    }

    #[test]
    fn fib_heavy_combo_is_reclassified() {
        let combo = decision(
            DecisionKind::Combo,
            320,
            vec!["Golden zone retest", "Fib 0.618 confluence", "Volume rising"],
        );
        assert_eq!(TopicRouter::classify_decision(&combo), Topic::Fibonacci);

        // Below the score bar the same reasons stay COMBO.
        let weak = decision(
            DecisionKind::Combo,
            220,
            vec!["Golden zone retest", "Fib 0.618 confluence"],
        );
        assert_eq!(TopicRouter::classify_decision(&weak), Topic::Combo);
    }

    #[test]
    fn text_classification_priority_order() {
        assert_eq!(
            TopicRouter::classify_text("anything", 0, Some("fibonacci")),
            Topic::Fibonacci
        );
        assert_eq!(
            TopicRouter::classify_text("structure confluence", 310, None),
            Topic::Combo
        );
        assert_eq!(
            TopicRouter::classify_text("liquidity sweep below lows", 100, None),
            Topic::Liquidity
        );
        assert_eq!(
            TopicRouter::classify_text("volume surge detected", 100, None),
            Topic::Pump
        );
        // Nothing recognizable falls back to IDEA, never unroutable.
        assert_eq!(TopicRouter::classify_text("hello world", 0, None), Topic::Idea);
    }

    #[test]
    fn unmapped_module_alert_routes_to_general() {
        let alert = decision(
            DecisionKind::ModuleAlert {
                module: "orderflow".to_string(),
            },
            70,
            vec![],
        );
        let topic = TopicRouter::classify_decision(&alert);
        assert_eq!(topic, Topic::General);
        assert_eq!(TopicRouter::thread_id(topic), THREAD_GENERAL);
    }
}
