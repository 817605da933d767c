use async_trait::async_trait;

use common::models::{Candle, FeatureResult, Timeframe, UserSettings};

/// Minimum history a detector can work with; shorter series are skipped.
pub const MIN_CANDLES: usize = 80;

/// Indicator collaborators. Detectors are expected to be self-contained: a
/// failed analysis returns an empty list, never an error that would abort the
/// pass.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeatureDetector: Send + Sync {
    fn module(&self) -> &'static str;

    async fn analyze(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        candles: &[Candle],
        settings: &UserSettings,
    ) -> Vec<FeatureResult>;
}

/// Timestamp of the last *closed* candle. The newest bar is still forming and
/// would make fingerprints unstable, so decisions anchor to the one before it.
pub fn stable_candle_ts(candles: &[Candle]) -> Option<i64> {
    if candles.len() < MIN_CANDLES {
        return None;
    }
    candles.get(candles.len() - 2).map(|c| c.ts)
}

fn module_keep_count(module: &str) -> usize {
    match module {
        "volume" | "rsi_divergence" => 1,
        "macd" | "fibonacci" | "smc" => 2,
        _ => 1,
    }
}

/// Keeps only the top-K features per module by score, preserving the relative
/// order of survivors. Keeps noisy detectors from drowning out the rest of
/// the evaluation.
pub fn reduce_features(features: Vec<FeatureResult>) -> Vec<FeatureResult> {
    use std::collections::HashMap;

    // Per module, find the score cutoff for its keep count.
    let mut by_module: HashMap<&str, Vec<i32>> = HashMap::new();
    for feature in &features {
        by_module
            .entry(feature.module.as_str())
            .or_default()
            .push(feature.score);
    }
    let cutoffs: HashMap<String, i32> = by_module
        .into_iter()
        .map(|(module, mut scores)| {
            scores.sort_unstable_by(|a, b| b.cmp(a));
            let keep = module_keep_count(module).min(scores.len());
            (module.to_string(), scores[keep - 1])
        })
        .collect();

    let mut kept_per_module: HashMap<String, usize> = HashMap::new();
    features
        .into_iter()
        .filter(|feature| {
            let cutoff = cutoffs.get(&feature.module).copied().unwrap_or(i32::MIN);
            if feature.score < cutoff {
                return false;
            }
            let kept = kept_per_module.entry(feature.module.clone()).or_insert(0);
            if *kept >= module_keep_count(&feature.module) {
                // Ties at the cutoff beyond the keep count are dropped.
                return false;
            }
            *kept += 1;
            true
        })
        .collect()
}
