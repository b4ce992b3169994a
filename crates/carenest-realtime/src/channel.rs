//! One realtime channel scoped to one child profile.

use std::sync::Arc;

use carenest_common::{EntityId, RecordCategory};
use tracing::debug;

use crate::transport::{
    ChannelConfig, PostgresChangeBinding, PresenceConfig, RealtimeEvent, RealtimeTransport,
};

/// What a channel carries, and for which entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelScope {
    /// Row changes on the given categories, filtered by owner column.
    ChangeFeed {
        entity: EntityId,
        categories: Vec<RecordCategory>,
    },
    /// Presence set of everyone viewing the entity, keyed by `key`.
    Presence { entity: EntityId, key: String },
}

impl ChannelScope {
    pub fn entity(&self) -> &EntityId {
        match self {
            ChannelScope::ChangeFeed { entity, .. } | ChannelScope::Presence { entity, .. } => {
                entity
            }
        }
    }

    /// Short topic name, without the `realtime:` prefix.
    pub fn topic(&self) -> String {
        match self {
            ChannelScope::ChangeFeed { entity, .. } => format!("changes:{entity}"),
            ChannelScope::Presence { entity, .. } => format!("presence:{entity}"),
        }
    }

    pub fn channel_config(&self) -> ChannelConfig {
        match self {
            ChannelScope::ChangeFeed { entity, categories } => ChannelConfig {
                postgres_changes: categories
                    .iter()
                    .map(|c| {
                        PostgresChangeBinding::all_events(c.table(), c.owner_column(), entity.as_str())
                    })
                    .collect(),
                ..Default::default()
            },
            ChannelScope::Presence { key, .. } => ChannelConfig {
                presence: PresenceConfig { key: key.clone() },
                ..Default::default()
            },
        }
    }
}

/// A joined (or joining) channel. Dropping it does not leave; call
/// [`ScopedChannel::close`].
pub struct ScopedChannel {
    transport: Arc<dyn RealtimeTransport>,
    scope: ChannelScope,
    topic: String,
}

impl ScopedChannel {
    /// Send the join. Confirmation arrives later as a `ChannelJoined` event
    /// for [`ScopedChannel::topic`].
    pub async fn open(transport: Arc<dyn RealtimeTransport>, scope: ChannelScope) -> Self {
        let topic = scope.topic();
        transport.join_channel(&topic, scope.channel_config()).await;
        debug!(topic = %topic, "Channel opened");
        Self {
            transport,
            scope,
            topic,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn scope(&self) -> &ChannelScope {
        &self.scope
    }

    pub fn entity(&self) -> &EntityId {
        self.scope.entity()
    }

    /// Whether `event` was emitted for this channel.
    pub fn owns(&self, event: &RealtimeEvent) -> bool {
        event.topic() == Some(self.topic.as_str())
    }

    pub async fn track(&self, payload: serde_json::Value) {
        self.transport.presence_track(&self.topic, payload).await;
    }

    /// Leave the channel. Presence channels untrack first so peers drop us
    /// immediately.
    pub async fn close(self) {
        if matches!(self.scope, ChannelScope::Presence { .. }) {
            self.transport.presence_untrack(&self.topic).await;
        }
        self.transport.leave_channel(&self.topic).await;
        debug!(topic = %self.topic, "Channel closed");
    }
}
