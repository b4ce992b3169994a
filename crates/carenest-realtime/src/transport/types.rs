//! Configuration, protocol types, and event/command enums for the realtime client.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::change::ChangeEvent;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for connecting to Supabase Realtime.
#[derive(Clone)]
pub struct RealtimeConfig {
    /// Supabase project reference (e.g., "abcdefghijklmnopqrst").
    pub project_ref: String,
    /// Supabase anon key (publishable).
    pub api_key: String,
    /// Optional access token (JWT); sent with every channel join so
    /// row-level security applies to change feeds.
    pub access_token: Option<String>,
    /// Full WebSocket URL override for local stacks. `apikey` and `vsn`
    /// are appended.
    pub url_override: Option<String>,
    /// Heartbeat interval in seconds (default: 25).
    pub heartbeat_interval_secs: u64,
    /// Reconnect base delay in seconds.
    pub reconnect_delay_secs: u64,
    /// Maximum reconnect delay in seconds.
    pub max_reconnect_delay_secs: u64,
    /// WebSocket connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl std::fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("project_ref", &self.project_ref)
            .field("api_key", &"[REDACTED]")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("url_override", &self.url_override)
            .field("heartbeat_interval_secs", &self.heartbeat_interval_secs)
            .field("reconnect_delay_secs", &self.reconnect_delay_secs)
            .field("max_reconnect_delay_secs", &self.max_reconnect_delay_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            project_ref: String::new(),
            api_key: String::new(),
            access_token: None,
            url_override: None,
            heartbeat_interval_secs: 25,
            reconnect_delay_secs: 1,
            max_reconnect_delay_secs: 30,
            connect_timeout_secs: 15,
        }
    }
}

impl RealtimeConfig {
    /// Build the WebSocket URL for Supabase Realtime.
    pub(crate) fn ws_url(&self) -> String {
        match &self.url_override {
            Some(base) => format!(
                "{}?apikey={}&vsn=1.0.0",
                base.trim_end_matches('/'),
                self.api_key
            ),
            None => format!(
                "wss://{}.supabase.co/realtime/v1/websocket?apikey={}&vsn=1.0.0",
                self.project_ref, self.api_key
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Phoenix Protocol Types
// ---------------------------------------------------------------------------

/// A Phoenix protocol message envelope (v1 JSON format).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoenixMessage {
    pub topic: String,
    pub event: String,
    pub payload: serde_json::Value,
    #[serde(rename = "ref")]
    pub msg_ref: Option<String>,
}

// ---------------------------------------------------------------------------
// Channel Configuration
// ---------------------------------------------------------------------------

/// Configuration for a Supabase Realtime channel.
#[derive(Debug, Clone, Default)]
pub struct ChannelConfig {
    pub broadcast: BroadcastConfig,
    pub presence: PresenceConfig,
    /// Row-change subscriptions carried by this channel.
    pub postgres_changes: Vec<PostgresChangeBinding>,
}

/// Broadcast configuration for a channel.
#[derive(Debug, Clone, Default)]
pub struct BroadcastConfig {
    /// Whether to receive your own broadcasts (Supabase "self" key).
    pub self_send: bool,
    /// Whether broadcasts are acknowledged by the server.
    pub ack: bool,
}

/// Presence configuration for a channel.
#[derive(Debug, Clone, Default)]
pub struct PresenceConfig {
    /// The key used to identify this client in presence state.
    pub key: String,
}

/// One `postgres_changes` subscription: a table plus an equality filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostgresChangeBinding {
    /// `*`, `INSERT`, `UPDATE` or `DELETE`.
    pub event: String,
    pub schema: String,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl PostgresChangeBinding {
    /// All events on `public.{table}` where `{column} = {value}`.
    pub fn all_events(table: &str, column: &str, value: &str) -> Self {
        Self {
            event: "*".to_string(),
            schema: "public".to_string(),
            table: table.to_string(),
            filter: Some(format!("{column}=eq.{value}")),
        }
    }
}

impl ChannelConfig {
    /// Serialize to the JSON payload expected by Supabase phx_join.
    pub(crate) fn to_join_payload(&self, access_token: Option<&str>) -> serde_json::Value {
        let mut payload = serde_json::json!({
            "config": {
                "broadcast": {
                    "self": self.broadcast.self_send,
                    "ack": self.broadcast.ack
                },
                "presence": {
                    "key": self.presence.key
                },
                "postgres_changes": self.postgres_changes
            }
        });
        if let Some(token) = access_token {
            payload["access_token"] = serde_json::Value::String(token.to_string());
        }
        payload
    }
}

// ---------------------------------------------------------------------------
// Events & Commands
// ---------------------------------------------------------------------------

/// Events emitted by the realtime client. Topics are reported without the
/// `realtime:` prefix.
#[derive(Debug, Clone)]
pub enum RealtimeEvent {
    /// WebSocket connection established.
    Connected,
    /// WebSocket connection lost.
    Disconnected,
    /// The server acknowledged a channel join.
    ChannelJoined { topic: String },
    /// Channel join rejected, channel closed or errored.
    ChannelError { topic: String, message: String },
    /// Full presence state snapshot (received after joining).
    PresenceState {
        topic: String,
        state: HashMap<String, Vec<serde_json::Value>>,
    },
    /// Incremental presence changes.
    PresenceDiff {
        topic: String,
        joins: HashMap<String, Vec<serde_json::Value>>,
        leaves: HashMap<String, Vec<serde_json::Value>>,
    },
    /// A row insert/update/delete on a subscribed table.
    PostgresChange { topic: String, change: ChangeEvent },
    /// Error.
    Error(String),
}

impl RealtimeEvent {
    /// Topic this event belongs to, if it is channel-scoped.
    pub fn topic(&self) -> Option<&str> {
        match self {
            RealtimeEvent::ChannelJoined { topic }
            | RealtimeEvent::ChannelError { topic, .. }
            | RealtimeEvent::PresenceState { topic, .. }
            | RealtimeEvent::PresenceDiff { topic, .. }
            | RealtimeEvent::PostgresChange { topic, .. } => Some(topic),
            RealtimeEvent::Connected | RealtimeEvent::Disconnected | RealtimeEvent::Error(_) => {
                None
            }
        }
    }
}

/// Commands sent to the realtime client from the application layer.
#[derive(Debug)]
pub(crate) enum RealtimeCommand {
    JoinChannel {
        topic: String,
        config: ChannelConfig,
    },
    LeaveChannel {
        topic: String,
    },
    PresenceTrack {
        topic: String,
        payload: serde_json::Value,
    },
    PresenceUntrack {
        topic: String,
    },
    Disconnect,
}
