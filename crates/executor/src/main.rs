use std::sync::Arc;

use dotenvy::dotenv;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tracing::debug;

use common::actors::ActorType;
use common::logger;
use engine::detector::FeatureDetector;
use engine::selector::SelectorConfig;
use engine::{BiasResolver, DecisionEngine, SignalSelector};
use market_data::remote::BitgetClient;
use market_data::traits::MarketDataSource;

use crate::actors::supervisor::Supervisor;
use crate::config::Config;
use crate::services::cleanup_service::CleanupService;
use crate::services::dispatch_service::DispatchService;
use crate::services::scan_service::{ScanConfig, ScanDeps, ScanService};
use crate::services::stores::{RotationStoreAdapter, SetupStoreAdapter};
use crate::services::Notification;

mod actors;
mod config;
mod services;

const NOTIFY_QUEUE_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::setup_logger();
    dotenv().ok();
    debug!("System starting up...");

    let config = Config::from_env()?;
    let pool = storage::db::connect(&config.database_path).await?;

    let mut supervisor = Supervisor::new();

    let (notify_tx, notify_rx) = mpsc::channel::<Notification>(NOTIFY_QUEUE_CAPACITY);
    let notify_rx = Arc::new(Mutex::new(notify_rx));

    let source: Arc<dyn MarketDataSource> = Arc::new(BitgetClient::new());
    // Detector collaborators register here as they come online.
    let detectors: Vec<Arc<dyn FeatureDetector>> = Vec::new();

    let scan_deps = ScanDeps {
        pool: pool.clone(),
        source,
        detectors,
        bias: BiasResolver::new(),
        engine: Arc::new(DecisionEngine::new(Arc::new(SetupStoreAdapter::new(
            pool.clone(),
        )))),
        selector: Arc::new(SignalSelector::new(
            Arc::new(RotationStoreAdapter::new(pool.clone())),
            SelectorConfig::default(),
        )),
        notify_tx,
        scan_lock: Arc::new(Semaphore::new(1)),
    };
    let scan_config = ScanConfig {
        user_id: config.scan_user_id.clone(),
        interval_secs: config.scan_interval_secs,
        chunk_size: config.scan_chunk_size,
        candle_limit: config.candle_limit,
    };
    supervisor.register_actor(
        ActorType::ScanActor,
        Box::new(move || Box::new(ScanService::new(scan_deps.clone(), scan_config.clone()))),
    );

    let pool_for_cleanup = pool.clone();
    let cleanup_interval = config.cleanup_interval_secs;
    supervisor.register_actor(
        ActorType::CleanupActor,
        Box::new(move || {
            Box::new(CleanupService::new(
                pool_for_cleanup.clone(),
                cleanup_interval,
            ))
        }),
    );

    let bot_token = config.bot_token.clone();
    let chat_id = config.chat_id;
    supervisor.register_actor(
        ActorType::DispatchActor,
        Box::new(move || {
            Box::new(DispatchService::new(
                &bot_token,
                chat_id,
                notify_rx.clone(),
            ))
        }),
    );

    supervisor.start().await;
    Ok(())
}
