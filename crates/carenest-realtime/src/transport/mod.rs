//! Supabase Realtime transport over the Phoenix Channels v1 protocol.
//!
//! One WebSocket carries every channel. The background connection task
//! handles heartbeats, channel join/leave, presence tracking and
//! reconnects with exponential backoff, rejoining channels afterwards.

mod client;
mod connection;
pub(crate) mod handler;
mod types;

use async_trait::async_trait;
use tokio::sync::broadcast;

pub use client::RealtimeClient;
pub use types::{
    BroadcastConfig, ChannelConfig, PhoenixMessage, PostgresChangeBinding, PresenceConfig,
    RealtimeConfig, RealtimeEvent,
};

/// The operations channel owners need from a realtime connection.
#[async_trait]
pub trait RealtimeTransport: Send + Sync {
    /// Join `topic`; the server's answer arrives as `ChannelJoined` or
    /// `ChannelError`.
    async fn join_channel(&self, topic: &str, config: ChannelConfig);

    async fn leave_channel(&self, topic: &str);

    /// Announce this client in the presence set of `topic`.
    async fn presence_track(&self, topic: &str, payload: serde_json::Value);

    async fn presence_untrack(&self, topic: &str);

    /// A new receiver for every event the connection emits from now on.
    fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent>;
}
