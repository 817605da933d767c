use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio::time;
use tracing::{error, info};
use uuid::Uuid;

use common::actors::{Actor, ActorType, ControlMessage};
use storage::repositories::SetupsRepository;

/// Removes expired and invalidated setups on its own timer, independent of
/// scan passes.
pub struct CleanupService {
    id: Uuid,
    pool: SqlitePool,
    interval_secs: u64,
}

impl CleanupService {
    pub fn new(pool: SqlitePool, interval_secs: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            pool,
            interval_secs,
        }
    }
}

#[async_trait]
impl Actor for CleanupService {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> ActorType {
        ActorType::CleanupActor
    }

    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()> {
        let _heartbeat_handle = self.spawn_heartbeat(supervisor_tx.clone());
        info!("Starting Setup Cleanup Service");

        let mut interval = time::interval(Duration::from_secs(self.interval_secs));
        loop {
            interval.tick().await;
            match SetupsRepository::cleanup_expired(&self.pool, Utc::now().timestamp()).await {
                Ok(0) => {}
                Ok(removed) => info!("Cleanup sweep removed {} stale setups", removed),
                Err(e) => error!("Cleanup sweep failed: {}", e),
            }
        }
    }
}
