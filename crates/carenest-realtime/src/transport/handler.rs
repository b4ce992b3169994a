//! Incoming Phoenix message handler and presence parsing.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

use super::types::{PhoenixMessage, RealtimeEvent};
use crate::change::ChangeEvent;

/// Join bookkeeping shared by the writer and the read loop.
///
/// Phoenix tags `phx_close` and `phx_error` with the ref of the join they
/// end, so a frame left over from an earlier join on the same topic can be
/// told apart from one that ends the current join.
#[derive(Debug, Default)]
pub(crate) struct JoinRefs {
    /// Outstanding `phx_join` refs mapped to the short topic they join.
    pending: HashMap<String, String>,
    /// Accepted join ref per short topic.
    live: HashMap<String, String>,
}

pub(crate) type SharedJoinRefs = Arc<Mutex<JoinRefs>>;

impl JoinRefs {
    pub(crate) fn register(&mut self, msg_ref: String, topic: &str) {
        self.pending.insert(msg_ref, topic.to_string());
    }

    /// Drop every ref for `topic` after a `phx_leave`.
    pub(crate) fn forget(&mut self, topic: &str) {
        self.pending.retain(|_, t| t != topic);
        self.live.remove(topic);
    }

    /// The socket is gone; no ref survives it.
    pub(crate) fn clear(&mut self) {
        self.pending.clear();
        self.live.clear();
    }

    #[cfg(test)]
    pub(crate) fn pending_topics(&self) -> impl Iterator<Item = &str> {
        self.pending.values().map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn live_ref(&self, topic: &str) -> Option<&str> {
        self.live.get(topic).map(String::as_str)
    }

    /// Match a reply to an outstanding join. Returns `true` if `msg_ref`
    /// was a join; an `ok` status makes it the live join for its topic.
    fn settle(&mut self, msg_ref: &str, ok: bool) -> bool {
        let Some(topic) = self.pending.remove(msg_ref) else {
            return false;
        };
        if ok {
            self.live.insert(topic, msg_ref.to_string());
        }
        true
    }

    /// Whether a close/error frame ends the current join on `topic`, and
    /// if so forget that join. Frames without a ref end whatever is live.
    fn ends_join(&mut self, topic: &str, msg_ref: Option<&str>) -> bool {
        if let Some(r) = msg_ref {
            if self.pending.get(r).is_some_and(|t| t == topic) {
                self.pending.remove(r);
                return true;
            }
        }
        match (self.live.get(topic), msg_ref) {
            (Some(live), Some(r)) if live != r => false,
            (Some(_), _) => {
                self.live.remove(topic);
                true
            }
            (None, _) => false,
        }
    }
}

fn strip_topic_prefix(topic: &str) -> &str {
    topic.strip_prefix("realtime:").unwrap_or(topic)
}

/// Parse a Phoenix presence map into `HashMap<key, Vec<meta>>`.
///
/// Supabase sends presence as `{ "key": { "metas": [{ ... }] } }`.
pub(crate) fn parse_presence_map(
    value: &serde_json::Value,
) -> HashMap<String, Vec<serde_json::Value>> {
    let mut result = HashMap::new();
    if let Some(obj) = value.as_object() {
        for (key, val) in obj {
            if let Some(metas) = val.get("metas").and_then(|m| m.as_array()) {
                result.insert(key.clone(), metas.clone());
            }
        }
    }
    result
}

fn reply_reason(payload: &serde_json::Value) -> String {
    let response = payload.get("response");
    response
        .and_then(|r| r.get("reason"))
        .or_else(|| response.and_then(|r| r.get("message")))
        .and_then(|r| r.as_str())
        .unwrap_or("unknown error")
        .to_string()
}

/// Translate one incoming frame into at most one [`RealtimeEvent`].
pub(crate) async fn handle_phoenix_message(
    msg: &PhoenixMessage,
    joins: &Mutex<JoinRefs>,
    event_tx: &broadcast::Sender<RealtimeEvent>,
) {
    let topic = strip_topic_prefix(&msg.topic).to_string();

    let event = match msg.event.as_str() {
        "phx_reply" => {
            let status = msg.payload.get("status").and_then(|s| s.as_str());
            let ok = status == Some("ok");
            let joined = match &msg.msg_ref {
                Some(r) => joins.lock().await.settle(r, ok),
                None => false,
            };
            match (joined, ok) {
                (true, true) => {
                    info!(topic = %topic, "Channel joined");
                    Some(RealtimeEvent::ChannelJoined { topic })
                }
                (true, false) => {
                    let message = reply_reason(&msg.payload);
                    warn!(topic = %topic, status = ?status, reason = %message, "Channel join rejected");
                    Some(RealtimeEvent::ChannelError { topic, message })
                }
                (false, _) => {
                    debug!(topic = %topic, status = ?status, "Reply");
                    None
                }
            }
        }
        "phx_error" | "phx_close" => {
            let msg_ref = msg.msg_ref.as_deref();
            if joins.lock().await.ends_join(&topic, msg_ref) {
                let message = if msg.event == "phx_error" {
                    warn!(topic = %topic, "Channel error");
                    "Channel error"
                } else {
                    info!(topic = %topic, "Channel closed");
                    "Channel closed"
                };
                Some(RealtimeEvent::ChannelError {
                    topic,
                    message: message.to_string(),
                })
            } else {
                debug!(topic = %topic, event = %msg.event, msg_ref = ?msg_ref, "Ignoring frame from an earlier join");
                None
            }
        }
        "system" => {
            let status = msg.payload.get("status").and_then(|s| s.as_str());
            let message = msg
                .payload
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or_default()
                .to_string();
            if status == Some("error") {
                warn!(topic = %topic, message = %message, "Channel system error");
                Some(RealtimeEvent::ChannelError { topic, message })
            } else {
                debug!(topic = %topic, message = %message, "System message");
                None
            }
        }
        "presence_state" => {
            let state = parse_presence_map(&msg.payload);
            debug!(topic = %topic, users = state.len(), "Presence state received");
            Some(RealtimeEvent::PresenceState { topic, state })
        }
        "presence_diff" => {
            let joins = msg
                .payload
                .get("joins")
                .map(parse_presence_map)
                .unwrap_or_default();
            let leaves = msg
                .payload
                .get("leaves")
                .map(parse_presence_map)
                .unwrap_or_default();
            debug!(
                topic = %topic,
                joins = joins.len(),
                leaves = leaves.len(),
                "Presence diff received"
            );
            Some(RealtimeEvent::PresenceDiff {
                topic,
                joins,
                leaves,
            })
        }
        "postgres_changes" => {
            let data = msg.payload.get("data").unwrap_or(&serde_json::Value::Null);
            match ChangeEvent::from_payload(data) {
                Some(change) => {
                    debug!(
                        topic = %topic,
                        table = change.category.table(),
                        kind = ?change.kind,
                        "Row change received"
                    );
                    Some(RealtimeEvent::PostgresChange { topic, change })
                }
                None => {
                    debug!(topic = %topic, "Ignoring unrecognized row change");
                    None
                }
            }
        }
        _ => {
            debug!(topic = %topic, event = %msg.event, "Unhandled Phoenix event");
            None
        }
    };

    if let Some(event) = event {
        // No receivers just means nobody is listening yet.
        let _ = event_tx.send(event);
    }
}
