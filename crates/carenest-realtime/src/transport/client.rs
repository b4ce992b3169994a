//! Public handle for the realtime connection.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use super::connection::connection_loop;
use super::types::{ChannelConfig, RealtimeCommand, RealtimeConfig, RealtimeEvent};
use super::RealtimeTransport;

const EVENT_CAPACITY: usize = 256;
const COMMAND_CAPACITY: usize = 64;

/// Handle for the background WebSocket task.
///
/// Commands are queued to the task; while the socket is down they wait
/// until the next successful connect. Cloning yields another handle to the
/// same connection.
#[derive(Clone)]
pub struct RealtimeClient {
    command_tx: mpsc::Sender<RealtimeCommand>,
    event_tx: broadcast::Sender<RealtimeEvent>,
    connected: Arc<RwLock<bool>>,
    shutdown: CancellationToken,
}

impl RealtimeClient {
    /// Start the background connection. Must be called inside a tokio runtime.
    pub fn connect(config: RealtimeConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let connected = Arc::new(RwLock::new(false));
        let shutdown = CancellationToken::new();

        tokio::spawn(connection_loop(
            config,
            Arc::clone(&connected),
            event_tx.clone(),
            command_rx,
            shutdown.clone(),
        ));

        Self {
            command_tx,
            event_tx,
            connected,
            shutdown,
        }
    }

    pub async fn is_connected(&self) -> bool {
        *self.connected.read().await
    }

    /// Leave every channel, close the socket and stop reconnecting.
    pub async fn disconnect(&self) {
        if self.is_connected().await {
            // The connection task sends the leaves, closes, then cancels.
            let _ = self.command_tx.send(RealtimeCommand::Disconnect).await;
        } else {
            self.shutdown.cancel();
        }
    }

    async fn send(&self, command: RealtimeCommand) {
        if self.command_tx.send(command).await.is_err() {
            tracing::debug!("Realtime connection task has stopped; command dropped");
        }
    }
}

#[async_trait]
impl RealtimeTransport for RealtimeClient {
    async fn join_channel(&self, topic: &str, config: ChannelConfig) {
        self.send(RealtimeCommand::JoinChannel {
            topic: topic.to_string(),
            config,
        })
        .await;
    }

    async fn leave_channel(&self, topic: &str) {
        self.send(RealtimeCommand::LeaveChannel {
            topic: topic.to_string(),
        })
        .await;
    }

    async fn presence_track(&self, topic: &str, payload: serde_json::Value) {
        self.send(RealtimeCommand::PresenceTrack {
            topic: topic.to_string(),
            payload,
        })
        .await;
    }

    async fn presence_untrack(&self, topic: &str) {
        self.send(RealtimeCommand::PresenceUntrack {
            topic: topic.to_string(),
        })
        .await;
    }

    fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.event_tx.subscribe()
    }
}
