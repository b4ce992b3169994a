//! Background WebSocket connection loop with auto-reconnect.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::handler::{handle_phoenix_message, JoinRefs, SharedJoinRefs};
use super::types::{ChannelConfig, PhoenixMessage, RealtimeCommand, RealtimeConfig, RealtimeEvent};

static REF_COUNTER: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_ref() -> String {
    REF_COUNTER.fetch_add(1, Ordering::Relaxed).to_string()
}

/// Channels to rejoin after a reconnect, keyed by short topic.
type JoinedChannels = Arc<RwLock<HashMap<String, ChannelConfig>>>;

/// Write half of one live socket plus the bookkeeping every writer shares.
struct ChannelWriter<S> {
    sink: Arc<Mutex<S>>,
    channels: JoinedChannels,
    joins: SharedJoinRefs,
    access_token: Option<String>,
}

impl<S> Clone for ChannelWriter<S> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            channels: Arc::clone(&self.channels),
            joins: Arc::clone(&self.joins),
            access_token: self.access_token.clone(),
        }
    }
}

impl<S> ChannelWriter<S>
where
    S: Sink<WsMessage> + Unpin,
{
    /// Send one frame. Returns `false` once the socket is gone.
    async fn send(&self, topic: &str, event: &str, payload: serde_json::Value) -> bool {
        self.send_with_ref(topic, event, payload, next_ref()).await
    }

    async fn send_with_ref(
        &self,
        topic: &str,
        event: &str,
        payload: serde_json::Value,
        msg_ref: String,
    ) -> bool {
        let msg = PhoenixMessage {
            topic: topic.to_string(),
            event: event.to_string(),
            payload,
            msg_ref: Some(msg_ref),
        };
        let Ok(json) = serde_json::to_string(&msg) else {
            return false;
        };
        let mut sink = self.sink.lock().await;
        sink.send(WsMessage::Text(json.into())).await.is_ok()
    }

    async fn join(&self, topic: &str, config: &ChannelConfig) {
        let msg_ref = next_ref();
        self.joins.lock().await.register(msg_ref.clone(), topic);
        let payload = config.to_join_payload(self.access_token.as_deref());
        debug!(topic = %topic, bindings = config.postgres_changes.len(), "Joining channel");
        self.send_with_ref(&format!("realtime:{topic}"), "phx_join", payload, msg_ref)
            .await;
    }

    async fn leave(&self, topic: &str) {
        self.send(&format!("realtime:{topic}"), "phx_leave", serde_json::json!({}))
            .await;
    }

    async fn rejoin_all(&self) {
        let channels = self.channels.read().await.clone();
        for (topic, config) in &channels {
            self.join(topic, config).await;
        }
        if !channels.is_empty() {
            info!(count = channels.len(), "Rejoined realtime channels");
        }
    }
}

/// Background task managing the WebSocket connection until `shutdown` fires.
pub(crate) async fn connection_loop(
    config: RealtimeConfig,
    connected: Arc<RwLock<bool>>,
    event_tx: broadcast::Sender<RealtimeEvent>,
    command_rx: mpsc::Receiver<RealtimeCommand>,
    shutdown: CancellationToken,
) {
    let command_rx = Arc::new(Mutex::new(command_rx));
    let channels: JoinedChannels = Arc::new(RwLock::new(HashMap::new()));
    let joins: SharedJoinRefs = Arc::new(Mutex::new(JoinRefs::default()));
    let connect_timeout = Duration::from_secs(config.connect_timeout_secs);
    let mut reconnect_delay = config.reconnect_delay_secs;

    while !shutdown.is_cancelled() {
        let url = config.ws_url();
        info!(url = %url.split('?').next().unwrap_or(""), "Connecting to Supabase Realtime");

        let attempt = tokio::select! {
            _ = shutdown.cancelled() => break,
            res = tokio::time::timeout(connect_timeout, tokio_tungstenite::connect_async(&url)) => res,
        };

        match attempt {
            Ok(Ok((ws_stream, _))) => {
                reconnect_delay = config.reconnect_delay_secs;
                *connected.write().await = true;
                let _ = event_tx.send(RealtimeEvent::Connected);

                let (ws_write, mut ws_read) = ws_stream.split();
                let writer = ChannelWriter {
                    sink: Arc::new(Mutex::new(ws_write)),
                    channels: Arc::clone(&channels),
                    joins: Arc::clone(&joins),
                    access_token: config.access_token.clone(),
                };
                writer.rejoin_all().await;

                let heartbeat_handle = tokio::spawn(heartbeat_task(
                    writer.clone(),
                    config.heartbeat_interval_secs,
                ));
                let cmd_handle = tokio::spawn(command_forwarder(
                    Arc::clone(&command_rx),
                    writer,
                    shutdown.clone(),
                ));

                loop {
                    let frame = tokio::select! {
                        _ = shutdown.cancelled() => break,
                        frame = ws_read.next() => frame,
                    };
                    match frame {
                        Some(Ok(WsMessage::Text(text))) => {
                            match serde_json::from_str::<PhoenixMessage>(&text) {
                                Ok(msg) => {
                                    handle_phoenix_message(&msg, &joins, &event_tx).await
                                }
                                Err(_) => debug!(text = %text, "Unrecognized message from Supabase"),
                            }
                        }
                        Some(Ok(WsMessage::Close(_))) => {
                            info!("Supabase Realtime closed connection");
                            break;
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "WebSocket error");
                            break;
                        }
                        None => break,
                        Some(Ok(_)) => {}
                    }
                }

                heartbeat_handle.abort();
                cmd_handle.abort();
                joins.lock().await.clear();
                *connected.write().await = false;
                let _ = event_tx.send(RealtimeEvent::Disconnected);
            }
            Ok(Err(e)) => {
                error!(error = %e, "Failed to connect to Supabase Realtime");
                let _ = event_tx.send(RealtimeEvent::Error(format!("Connection failed: {e}")));
            }
            Err(_elapsed) => {
                error!(timeout_secs = config.connect_timeout_secs, "WebSocket connection timed out");
                let _ = event_tx.send(RealtimeEvent::Error(format!(
                    "Connection timed out after {}s",
                    config.connect_timeout_secs
                )));
            }
        }

        if shutdown.is_cancelled() {
            break;
        }
        info!(delay = reconnect_delay, "Reconnecting in {} seconds", reconnect_delay);
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(Duration::from_secs(reconnect_delay)) => {}
        }
        reconnect_delay = next_delay(reconnect_delay, config.max_reconnect_delay_secs);
    }

    info!("Realtime connection stopped");
}

fn next_delay(current: u64, max: u64) -> u64 {
    current.saturating_mul(2).min(max)
}

async fn heartbeat_task<S>(writer: ChannelWriter<S>, interval_secs: u64)
where
    S: Sink<WsMessage> + Unpin,
{
    let period = Duration::from_secs(interval_secs.max(1));
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    loop {
        interval.tick().await;
        if !writer.send("phoenix", "heartbeat", serde_json::json!({})).await {
            break;
        }
    }
}

async fn command_forwarder<S>(
    cmd_rx: Arc<Mutex<mpsc::Receiver<RealtimeCommand>>>,
    writer: ChannelWriter<S>,
    shutdown: CancellationToken,
) where
    S: Sink<WsMessage> + Unpin,
{
    let mut rx = cmd_rx.lock().await;
    while let Some(cmd) = rx.recv().await {
        match cmd {
            RealtimeCommand::JoinChannel { topic, config } => {
                writer.join(&topic, &config).await;
                writer.channels.write().await.insert(topic, config);
            }
            RealtimeCommand::LeaveChannel { topic } => {
                writer.leave(&topic).await;
                writer.channels.write().await.remove(&topic);
                writer.joins.lock().await.forget(&topic);
            }
            RealtimeCommand::PresenceTrack { topic, payload } => {
                writer
                    .send(
                        &format!("realtime:{topic}"),
                        "presence",
                        serde_json::json!({
                            "type": "presence",
                            "event": "track",
                            "payload": payload
                        }),
                    )
                    .await;
            }
            RealtimeCommand::PresenceUntrack { topic } => {
                writer
                    .send(
                        &format!("realtime:{topic}"),
                        "presence",
                        serde_json::json!({"type": "presence", "event": "untrack"}),
                    )
                    .await;
            }
            RealtimeCommand::Disconnect => {
                let topics: Vec<String> =
                    writer.channels.write().await.drain().map(|(t, _)| t).collect();
                for topic in &topics {
                    writer.leave(topic).await;
                }
                let _ = writer.sink.lock().await.send(WsMessage::Close(None)).await;
                shutdown.cancel();
                return;
            }
        }
    }
    // Every client handle is gone.
    shutdown.cancel();
}
