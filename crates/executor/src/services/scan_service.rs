use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};
use uuid::Uuid;

use common::actors::{Actor, ActorType, ControlMessage};
use common::models::{Candle, Decision, Timeframe, Topic, UserSettings};
use engine::decision::fib_alert;
use engine::dedup;
use engine::detector::{reduce_features, stable_candle_ts, FeatureDetector};
use engine::router::TopicRouter;
use engine::selector::SelectedDecision;
use engine::{BiasResolver, DecisionEngine, SignalSelector};
use market_data::traits::MarketDataSource;
use storage::repositories::{
    CooldownRepository, CursorRepository, SentSignal, SettingsRepository, SignalsRepository,
};

use crate::services::{message, Notification};

#[derive(Clone)]
pub struct ScanConfig {
    pub user_id: String,
    pub interval_secs: u64,
    pub chunk_size: usize,
    pub candle_limit: u32,
}

/// Everything a scan pass needs; cloned into the restart factory.
#[derive(Clone)]
pub struct ScanDeps {
    pub pool: SqlitePool,
    pub source: Arc<dyn MarketDataSource>,
    pub detectors: Vec<Arc<dyn FeatureDetector>>,
    pub bias: BiasResolver,
    pub engine: Arc<DecisionEngine>,
    pub selector: Arc<SignalSelector>,
    pub notify_tx: mpsc::Sender<Notification>,
    /// Single-permit lock, a tick that fires mid-pass is skipped, not queued.
    pub scan_lock: Arc<Semaphore>,
}

#[derive(Default)]
struct ScanMetrics {
    symbols_scanned: usize,
    api_calls: usize,
    symbol_errors: usize,
    decisions: usize,
    selected: usize,
    suppressed_cooldown: usize,
    suppressed_dedup: usize,
}

pub struct ScanService {
    id: Uuid,
    deps: ScanDeps,
    config: ScanConfig,
}

impl ScanService {
    pub fn new(deps: ScanDeps, config: ScanConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            deps,
            config,
        }
    }

    async fn run_pass(&self) -> anyhow::Result<()> {
        let now = Utc::now().timestamp();
        let mut metrics = ScanMetrics::default();

        let settings = SettingsRepository::get(&self.deps.pool, &self.config.user_id).await?;

        let mut symbols = self.deps.source.list_symbols().await?;
        metrics.api_calls += 1;
        if !settings.watchlist.is_empty() {
            symbols.retain(|s| settings.watchlist.contains(s));
        }
        symbols.sort();

        let cursor = CursorRepository::get(&self.deps.pool, &self.config.user_id).await?;
        let (chunk, next_cursor) = next_chunk(&symbols, cursor, self.config.chunk_size);
        CursorRepository::set(&self.deps.pool, &self.config.user_id, next_cursor).await?;

        let mut decisions: Vec<Decision> = Vec::new();
        for symbol in &chunk {
            metrics.symbols_scanned += 1;
            match self.scan_symbol(&settings, symbol, now, &mut metrics).await {
                Ok(mut found) => decisions.append(&mut found),
                Err(e) => {
                    metrics.symbol_errors += 1;
                    warn!("Evaluation failed for {}: {}", symbol, e);
                }
            }
        }
        metrics.decisions = decisions.len();

        let selection = self
            .deps
            .selector
            .select(&self.config.user_id, decisions, now)
            .await?;

        for SelectedDecision { topic, decision } in selection.selected {
            if let Err(e) = self
                .gate_and_queue(&settings, topic, decision, now, &mut metrics)
                .await
            {
                error!("Failed to queue notification: {}", e);
            }
        }

        if !selection.good_candidates.is_empty() {
            let digest = Notification {
                thread_id: TopicRouter::thread_id(Topic::General),
                text: message::build_digest(&selection.good_candidates),
            };
            if self.deps.notify_tx.try_send(digest).is_err() {
                warn!("Dispatch queue full, dropping digest");
            }
        }

        info!(
            symbols = metrics.symbols_scanned,
            api_calls = metrics.api_calls,
            errors = metrics.symbol_errors,
            decisions = metrics.decisions,
            selected = metrics.selected,
            cooldown_suppressed = metrics.suppressed_cooldown,
            dedup_suppressed = metrics.suppressed_dedup,
            "scan pass finished"
        );
        Ok(())
    }

    /// Evaluates one symbol across all timeframes. Errors here abort only
    /// this symbol, the pass continues with the rest.
    async fn scan_symbol(
        &self,
        settings: &UserSettings,
        symbol: &str,
        now: i64,
        metrics: &mut ScanMetrics,
    ) -> anyhow::Result<Vec<Decision>> {
        let mut series: HashMap<Timeframe, Vec<Candle>> = HashMap::new();
        for timeframe in Timeframe::ALL {
            let candles = self
                .deps
                .source
                .get_candles(symbol, timeframe, self.config.candle_limit)
                .await?;
            metrics.api_calls += 1;
            series.insert(timeframe, candles);
        }

        self.deps
            .bias
            .resolve_bias(
                symbol,
                &series[&Timeframe::H4],
                &series[&Timeframe::H1],
                &series[&Timeframe::M15],
            )
            .await;

        let mut decisions = Vec::new();
        for timeframe in Timeframe::ALL {
            let candles = &series[&timeframe];
            let Some(candle_ts) = stable_candle_ts(candles) else {
                continue;
            };

            let mut features = Vec::new();
            for detector in &self.deps.detectors {
                if !settings.module_enabled(detector.module()) {
                    continue;
                }
                features.extend(detector.analyze(symbol, timeframe, candles, settings).await);
            }
            let features = reduce_features(features);

            let decision = match self
                .deps
                .engine
                .evaluate(settings, symbol, timeframe, &features, candle_ts, now)
                .await?
            {
                Some(decision) => Some(decision),
                None => fib_alert(symbol, timeframe, &features, candle_ts),
            };
            let Some(mut decision) = decision else {
                continue;
            };

            if let Err(reason) = self
                .deps
                .bias
                .validate_direction(symbol, decision.side)
                .await
            {
                if decision.is_trade() {
                    decision.downgrade_to_watchlist(reason);
                } else {
                    continue;
                }
            }
            decisions.push(decision);
        }
        Ok(decisions)
    }

    /// Final gates for a selected decision: category cooldown, then the
    /// dedup-key claim that also journals the send. Both are conditional
    /// writes, a racing pass cannot double-send.
    async fn gate_and_queue(
        &self,
        settings: &UserSettings,
        topic: Topic,
        decision: Decision,
        now: i64,
        metrics: &mut ScanMetrics,
    ) -> anyhow::Result<()> {
        let message_type = decision.message_type();
        let cooldown_key = dedup::cooldown_key(message_type, &decision.symbol, decision.timeframe);
        if CooldownRepository::is_in_cooldown(&self.deps.pool, &settings.user_id, &cooldown_key, now)
            .await?
        {
            metrics.suppressed_cooldown += 1;
            return Ok(());
        }

        let dedup_key = dedup::dedup_key(
            &settings.user_id,
            &decision.symbol,
            decision.timeframe,
            &decision.signal_type(),
            decision.candle_ts,
            &decision.level_map(),
        );
        let journal_entry = SentSignal {
            user_id: settings.user_id.clone(),
            dedup_key,
            symbol: decision.symbol.clone(),
            timeframe: decision.timeframe.as_str().to_string(),
            signal_type: decision.signal_type(),
            candle_ts: decision.candle_ts,
            score_total: Some(decision.score_total),
            payload_json: serde_json::to_string(&decision)?,
            sent_at: now,
        };
        if !SignalsRepository::try_claim(&self.deps.pool, &journal_entry).await? {
            metrics.suppressed_dedup += 1;
            return Ok(());
        }

        let window = dedup::cooldown_window_secs(message_type, settings.preset);
        CooldownRepository::set_cooldown(
            &self.deps.pool,
            &settings.user_id,
            &cooldown_key,
            now + window,
        )
        .await?;

        let notification = Notification {
            thread_id: TopicRouter::thread_id(topic),
            text: message::build_message(&decision),
        };
        if self.deps.notify_tx.try_send(notification).is_err() {
            warn!("Dispatch queue full, dropping {}", decision.symbol);
            return Ok(());
        }
        metrics.selected += 1;
        Ok(())
    }
}

/// Round-robin chunking over the sorted symbol list, wrapping at the end.
fn next_chunk(symbols: &[String], cursor: usize, chunk_size: usize) -> (Vec<String>, usize) {
    if symbols.is_empty() {
        return (Vec::new(), 0);
    }
    let start = cursor % symbols.len();
    let take = chunk_size.min(symbols.len());
    let chunk = (0..take)
        .map(|i| symbols[(start + i) % symbols.len()].clone())
        .collect();
    (chunk, (start + take) % symbols.len())
}

#[async_trait]
impl Actor for ScanService {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> ActorType {
        ActorType::ScanActor
    }

    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()> {
        let heartbeat_handle = self.spawn_heartbeat(supervisor_tx.clone());
        info!("Starting Scan Service");

        let mut interval = time::interval(Duration::from_secs(self.config.interval_secs));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            let Ok(_permit) = self.deps.scan_lock.try_acquire() else {
                warn!("Previous scan pass still running, skipping tick");
                continue;
            };
            if let Err(e) = self.run_pass().await {
                error!("Scan pass failed: {}", e);
                heartbeat_handle.abort();
                supervisor_tx
                    .send(ControlMessage::Error(self.id, e.to_string()))
                    .await?;
                return Err(e);
            }
        }
    }
}
