use std::sync::Arc;

use async_trait::async_trait;
use teloxide::payloads::SendMessageSetters;
use teloxide::prelude::*;
use teloxide::types::{MessageId, ThreadId};
use tokio::sync::{mpsc, Mutex};
use tracing::{error, info};
use uuid::Uuid;

use common::actors::{Actor, ActorType, ControlMessage};

use crate::services::Notification;

/// Drains the bounded notification queue into Telegram forum threads. Sends
/// are fire-and-forget: a failed send is logged and the next one proceeds,
/// no ordering or retry guarantees.
pub struct DispatchService {
    id: Uuid,
    bot: Bot,
    chat_id: ChatId,
    // Shared with the restart factory so a replacement instance keeps
    // draining the same queue.
    notify_rx: Arc<Mutex<mpsc::Receiver<Notification>>>,
}

impl DispatchService {
    pub fn new(
        bot_token: &str,
        chat_id: i64,
        notify_rx: Arc<Mutex<mpsc::Receiver<Notification>>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            bot: Bot::new(bot_token),
            chat_id: ChatId(chat_id),
            notify_rx,
        }
    }
}

#[async_trait]
impl Actor for DispatchService {
    fn id(&self) -> Uuid {
        self.id
    }

    fn name(&self) -> ActorType {
        ActorType::DispatchActor
    }

    async fn run(&mut self, supervisor_tx: mpsc::Sender<ControlMessage>) -> anyhow::Result<()> {
        let heartbeat_handle = self.spawn_heartbeat(supervisor_tx.clone());
        info!("Starting Telegram Dispatch Service");

        let mut notify_rx = self.notify_rx.lock().await;
        while let Some(Notification { thread_id, text }) = notify_rx.recv().await {
            let request = self
                .bot
                .send_message(self.chat_id, text)
                .message_thread_id(ThreadId(MessageId(thread_id)));
            if let Err(e) = request.await {
                error!("Failed to send Telegram message to thread {}: {}", thread_id, e);
            }
        }

        info!("Notification channel closed. Stopping dispatch service.");
        heartbeat_handle.abort();
        supervisor_tx
            .send(ControlMessage::Shutdown(self.id))
            .await?;
        Ok(())
    }
}
