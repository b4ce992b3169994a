//! Roster of other caregivers viewing the same child.

use std::collections::HashMap;
use std::sync::Arc;

use carenest_common::{EntityId, Identity};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::channel::{ChannelScope, ScopedChannel};
use crate::transport::{RealtimeEvent, RealtimeTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    Disconnected,
    Connecting,
    Connected,
}

/// One other caregiver currently online.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresenceEntry {
    pub user_id: String,
    pub display_name: Option<String>,
    pub last_seen: DateTime<Utc>,
}

struct TrackerInner {
    state: PresenceState,
    channel: Option<ScopedChannel>,
    /// Authoritative presence map: key -> metas, as synced from the server.
    raw: HashMap<String, Vec<Value>>,
    roster: Vec<PresenceEntry>,
    tracked: bool,
}

impl TrackerInner {
    fn reset(&mut self) {
        self.raw.clear();
        self.roster.clear();
        self.tracked = false;
    }
}

pub struct PresenceTracker {
    transport: Arc<dyn RealtimeTransport>,
    identity: Identity,
    inner: RwLock<TrackerInner>,
}

impl PresenceTracker {
    pub fn new(transport: Arc<dyn RealtimeTransport>, identity: Identity) -> Self {
        Self {
            transport,
            identity,
            inner: RwLock::new(TrackerInner {
                state: PresenceState::Disconnected,
                channel: None,
                raw: HashMap::new(),
                roster: Vec::new(),
                tracked: false,
            }),
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Join the presence channel for `entity`, leaving any previous one.
    pub async fn subscribe(&self, entity: EntityId) {
        let mut inner = self.inner.write().await;
        if let Some(old) = inner.channel.take() {
            old.close().await;
        }
        inner.reset();

        let scope = ChannelScope::Presence {
            entity,
            key: self.identity.user_id.clone(),
        };
        let channel = ScopedChannel::open(Arc::clone(&self.transport), scope).await;
        info!(topic = %channel.topic(), "Presence subscribing");
        inner.channel = Some(channel);
        inner.state = PresenceState::Connecting;
    }

    /// Leave the channel; peers drop us from their rosters.
    pub async fn unsubscribe(&self) {
        let mut inner = self.inner.write().await;
        if let Some(channel) = inner.channel.take() {
            channel.close().await;
        }
        inner.reset();
        inner.state = PresenceState::Disconnected;
    }

    pub async fn online_users(&self) -> Vec<PresenceEntry> {
        self.inner.read().await.roster.clone()
    }

    pub async fn online_count(&self) -> usize {
        self.inner.read().await.roster.len()
    }

    pub async fn is_connected(&self) -> bool {
        self.state().await == PresenceState::Connected
    }

    pub async fn state(&self) -> PresenceState {
        self.inner.read().await.state
    }

    /// Apply one transport event.
    pub async fn handle_event(&self, event: &RealtimeEvent) {
        let mut inner = self.inner.write().await;
        if matches!(event, RealtimeEvent::Disconnected) {
            if inner.channel.is_some() {
                inner.reset();
                inner.state = PresenceState::Connecting;
            }
            return;
        }

        let owned = inner.channel.as_ref().is_some_and(|c| c.owns(event));
        if !owned {
            return;
        }

        match event {
            RealtimeEvent::ChannelJoined { topic } => {
                if inner.state != PresenceState::Connecting || inner.tracked {
                    return;
                }
                if let Some(channel) = &inner.channel {
                    channel.track(self.track_payload()).await;
                }
                inner.tracked = true;
                inner.roster.clear();
                inner.state = PresenceState::Connected;
                info!(topic = %topic, "Presence connected");
            }
            RealtimeEvent::ChannelError { topic, message } => {
                warn!(topic = %topic, error = %message, "Presence channel failed");
                if let Some(channel) = inner.channel.take() {
                    channel.close().await;
                }
                inner.reset();
                inner.state = PresenceState::Disconnected;
            }
            RealtimeEvent::PresenceState { state, .. } => {
                inner.raw = state.clone();
                self.recompute(&mut inner);
            }
            RealtimeEvent::PresenceDiff { joins, leaves, .. } => {
                apply_diff(&mut inner.raw, joins, leaves);
                self.recompute(&mut inner);
            }
            _ => {}
        }
    }

    fn track_payload(&self) -> Value {
        serde_json::json!({
            "user_id": self.identity.user_id,
            "display_name": self.identity.display_name,
            "online_at": Utc::now().to_rfc3339(),
        })
    }

    fn recompute(&self, inner: &mut TrackerInner) {
        inner.roster = build_roster(&inner.raw, &self.identity.user_id);
        debug!(online = inner.roster.len(), "Presence roster updated");
    }

    /// Consume transport events until the transport goes away.
    pub async fn run(self: Arc<Self>, mut events: broadcast::Receiver<RealtimeEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.handle_event(&event).await,
                // The next presence_state resynchronises the roster.
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Presence tracker lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("Presence tracker stopped");
    }
}

fn phx_ref(meta: &Value) -> Option<&str> {
    meta.get("phx_ref").and_then(Value::as_str)
}

/// Phoenix presence sync: joins add metas, leaves remove them by `phx_ref`.
fn apply_diff(
    raw: &mut HashMap<String, Vec<Value>>,
    joins: &HashMap<String, Vec<Value>>,
    leaves: &HashMap<String, Vec<Value>>,
) {
    for (key, metas) in joins {
        let entry = raw.entry(key.clone()).or_default();
        for meta in metas {
            if let Some(r) = phx_ref(meta) {
                entry.retain(|m| phx_ref(m) != Some(r));
            }
            entry.push(meta.clone());
        }
    }
    for (key, metas) in leaves {
        let Some(entry) = raw.get_mut(key) else {
            continue;
        };
        let gone: Vec<&str> = metas.iter().filter_map(phx_ref).collect();
        if gone.is_empty() {
            entry.clear();
        } else {
            entry.retain(|m| phx_ref(m).map_or(true, |r| !gone.contains(&r)));
        }
        if entry.is_empty() {
            raw.remove(key);
        }
    }
}

fn build_roster(raw: &HashMap<String, Vec<Value>>, own_user_id: &str) -> Vec<PresenceEntry> {
    let mut by_user: HashMap<String, PresenceEntry> = HashMap::new();
    for (key, metas) in raw {
        if key == own_user_id {
            continue;
        }
        for meta in metas {
            let user_id = meta
                .get("user_id")
                .and_then(Value::as_str)
                .unwrap_or(key.as_str())
                .to_string();
            if user_id == own_user_id {
                continue;
            }
            let last_seen = meta
                .get("online_at")
                .and_then(Value::as_str)
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|t| t.with_timezone(&Utc))
                .unwrap_or_else(Utc::now);
            let entry = PresenceEntry {
                display_name: meta
                    .get("display_name")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                user_id: user_id.clone(),
                last_seen,
            };
            match by_user.get(&user_id) {
                Some(existing) if existing.last_seen >= entry.last_seen => {}
                _ => {
                    by_user.insert(user_id, entry);
                }
            }
        }
    }

    let mut roster: Vec<PresenceEntry> = by_user.into_values().collect();
    roster.sort_by(|a, b| {
        let name = |e: &PresenceEntry| e.display_name.clone().unwrap_or_default().to_lowercase();
        name(a).cmp(&name(b)).then_with(|| a.user_id.cmp(&b.user_id))
    });
    roster
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Call, FakeTransport};
    use serde_json::json;

    fn meta(user: &str, name: &str, phx: &str) -> Value {
        json!({
            "user_id": user,
            "display_name": name,
            "online_at": "2026-03-01T10:00:00+00:00",
            "phx_ref": phx
        })
    }

    fn tracker() -> (Arc<FakeTransport>, PresenceTracker) {
        let transport = Arc::new(FakeTransport::new());
        let identity = Identity::new("me", Some("Sam".into()));
        let tracker = PresenceTracker::new(transport.clone(), identity);
        (transport, tracker)
    }

    async fn connected_tracker() -> (Arc<FakeTransport>, PresenceTracker) {
        let (transport, tracker) = tracker();
        tracker.subscribe(EntityId::from("c1")).await;
        tracker
            .handle_event(&RealtimeEvent::ChannelJoined {
                topic: "presence:c1".into(),
            })
            .await;
        (transport, tracker)
    }

    #[tokio::test]
    async fn join_tracks_self_once() {
        let (transport, tracker) = connected_tracker().await;
        assert!(tracker.is_connected().await);
        assert_eq!(tracker.online_count().await, 0);

        tracker
            .handle_event(&RealtimeEvent::ChannelJoined {
                topic: "presence:c1".into(),
            })
            .await;

        let tracks: Vec<_> = transport
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Track { topic, payload } => Some((topic, payload)),
                _ => None,
            })
            .collect();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].0, "presence:c1");
        assert_eq!(tracks[0].1["user_id"], "me");
        assert_eq!(tracks[0].1["display_name"], "Sam");
        assert!(DateTime::parse_from_rfc3339(tracks[0].1["online_at"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn roster_excludes_self() {
        let (_, tracker) = connected_tracker().await;
        tracker
            .handle_event(&RealtimeEvent::PresenceState {
                topic: "presence:c1".into(),
                state: HashMap::from([
                    ("me".to_string(), vec![meta("me", "Sam", "a")]),
                    ("u2".to_string(), vec![meta("u2", "Alex", "b")]),
                    ("u3".to_string(), vec![meta("u3", "Blair", "c")]),
                ]),
            })
            .await;

        let users = tracker.online_users().await;
        let ids: Vec<&str> = users.iter().map(|u| u.user_id.as_str()).collect();
        assert_eq!(ids, vec!["u2", "u3"]);
        assert_eq!(tracker.online_count().await, 2);
        assert_eq!(users[0].display_name.as_deref(), Some("Alex"));
    }

    #[tokio::test]
    async fn diff_join_and_leave_recompute_roster() {
        let (_, tracker) = connected_tracker().await;
        tracker
            .handle_event(&RealtimeEvent::PresenceState {
                topic: "presence:c1".into(),
                state: HashMap::from([("u2".to_string(), vec![meta("u2", "Alex", "b")])]),
            })
            .await;

        tracker
            .handle_event(&RealtimeEvent::PresenceDiff {
                topic: "presence:c1".into(),
                joins: HashMap::from([("u3".to_string(), vec![meta("u3", "Blair", "c")])]),
                leaves: HashMap::new(),
            })
            .await;
        assert_eq!(tracker.online_count().await, 2);

        tracker
            .handle_event(&RealtimeEvent::PresenceDiff {
                topic: "presence:c1".into(),
                joins: HashMap::new(),
                leaves: HashMap::from([("u2".to_string(), vec![meta("u2", "Alex", "b")])]),
            })
            .await;
        let users = tracker.online_users().await;
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].user_id, "u3");
    }

    #[tokio::test]
    async fn second_tab_keeps_user_online() {
        let (_, tracker) = connected_tracker().await;
        tracker
            .handle_event(&RealtimeEvent::PresenceState {
                topic: "presence:c1".into(),
                state: HashMap::from([(
                    "u2".to_string(),
                    vec![meta("u2", "Alex", "b1"), meta("u2", "Alex", "b2")],
                )]),
            })
            .await;
        assert_eq!(tracker.online_count().await, 1);

        tracker
            .handle_event(&RealtimeEvent::PresenceDiff {
                topic: "presence:c1".into(),
                joins: HashMap::new(),
                leaves: HashMap::from([("u2".to_string(), vec![meta("u2", "Alex", "b1")])]),
            })
            .await;
        assert_eq!(tracker.online_count().await, 1);
    }

    #[tokio::test]
    async fn channel_error_disconnects() {
        let (transport, tracker) = connected_tracker().await;
        tracker
            .handle_event(&RealtimeEvent::ChannelError {
                topic: "presence:c1".into(),
                message: "closed".into(),
            })
            .await;
        assert_eq!(tracker.state().await, PresenceState::Disconnected);
        assert!(transport.calls().contains(&Call::Leave("presence:c1".into())));
    }

    #[tokio::test]
    async fn other_topics_are_ignored() {
        let (_, tracker) = connected_tracker().await;
        tracker
            .handle_event(&RealtimeEvent::PresenceState {
                topic: "presence:c2".into(),
                state: HashMap::from([("u2".to_string(), vec![meta("u2", "Alex", "b")])]),
            })
            .await;
        assert_eq!(tracker.online_count().await, 0);
    }

    #[tokio::test]
    async fn reconnect_tracks_again_after_rejoin() {
        let (transport, tracker) = connected_tracker().await;
        tracker.handle_event(&RealtimeEvent::Disconnected).await;
        assert_eq!(tracker.state().await, PresenceState::Connecting);

        tracker
            .handle_event(&RealtimeEvent::ChannelJoined {
                topic: "presence:c1".into(),
            })
            .await;
        assert!(tracker.is_connected().await);
        let tracks = transport
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::Track { .. }))
            .count();
        assert_eq!(tracks, 2);
    }

    #[tokio::test]
    async fn switching_child_leaves_previous_channel() {
        let (transport, tracker) = connected_tracker().await;
        tracker.subscribe(EntityId::from("c2")).await;
        assert_eq!(tracker.state().await, PresenceState::Connecting);

        let calls = transport.calls();
        let leave = calls
            .iter()
            .position(|c| c == &Call::Leave("presence:c1".into()))
            .unwrap();
        let join = calls
            .iter()
            .position(|c| matches!(c, Call::Join { topic, .. } if topic == "presence:c2"))
            .unwrap();
        assert!(leave < join);
    }

    #[tokio::test]
    async fn unsubscribe_clears_roster() {
        let (_, tracker) = connected_tracker().await;
        tracker
            .handle_event(&RealtimeEvent::PresenceState {
                topic: "presence:c1".into(),
                state: HashMap::from([("u2".to_string(), vec![meta("u2", "Alex", "b")])]),
            })
            .await;
        tracker.unsubscribe().await;
        assert_eq!(tracker.online_count().await, 0);
        assert!(!tracker.is_connected().await);
    }
}
