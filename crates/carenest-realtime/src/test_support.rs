//! In-memory transport for exercising channel owners without a socket.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::transport::{ChannelConfig, RealtimeEvent, RealtimeTransport};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Join { topic: String, bindings: Vec<String> },
    Leave(String),
    Track { topic: String, payload: serde_json::Value },
    Untrack(String),
}

/// Records every command and lets tests inject events.
pub(crate) struct FakeTransport {
    calls: Mutex<Vec<Call>>,
    events: broadcast::Sender<RealtimeEvent>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            calls: Mutex::new(Vec::new()),
            events,
        }
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn emit(&self, event: RealtimeEvent) {
        let _ = self.events.send(event);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RealtimeTransport for FakeTransport {
    async fn join_channel(&self, topic: &str, config: ChannelConfig) {
        self.record(Call::Join {
            topic: topic.to_string(),
            bindings: config
                .postgres_changes
                .iter()
                .map(|b| b.table.clone())
                .collect(),
        });
    }

    async fn leave_channel(&self, topic: &str) {
        self.record(Call::Leave(topic.to_string()));
    }

    async fn presence_track(&self, topic: &str, payload: serde_json::Value) {
        self.record(Call::Track {
            topic: topic.to_string(),
            payload,
        });
    }

    async fn presence_untrack(&self, topic: &str) {
        self.record(Call::Untrack(topic.to_string()));
    }

    fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.events.subscribe()
    }
}
