//! Change-notification relay: row changes in, cache invalidations and
//! toasts out.

use std::sync::Arc;

use carenest_common::{EntityId, Notification, QueryCache, QueryKey, RecordCategory};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::change::{ChangeEvent, ChangeKind};
use crate::channel::{ChannelScope, ScopedChannel};
use crate::transport::{RealtimeEvent, RealtimeTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Unsubscribed,
    /// Join sent, or socket lost and waiting for the rejoin.
    Pending,
    Active,
}

struct RelayInner {
    state: RelayState,
    channel: Option<ScopedChannel>,
}

/// Watches one child's records and invalidates the matching query cache
/// entries whenever a row changes.
///
/// A channel error leaves the relay unsubscribed until the next
/// [`ChangeRelay::subscribe`].
pub struct ChangeRelay {
    transport: Arc<dyn RealtimeTransport>,
    cache: Arc<dyn QueryCache>,
    categories: Vec<RecordCategory>,
    notifications: Option<mpsc::Sender<Notification>>,
    inner: RwLock<RelayInner>,
}

impl ChangeRelay {
    pub fn new(transport: Arc<dyn RealtimeTransport>, cache: Arc<dyn QueryCache>) -> Self {
        Self {
            transport,
            cache,
            categories: RecordCategory::ALL.to_vec(),
            notifications: None,
            inner: RwLock::new(RelayInner {
                state: RelayState::Unsubscribed,
                channel: None,
            }),
        }
    }

    /// Restrict the watched categories.
    pub fn with_categories(mut self, categories: Vec<RecordCategory>) -> Self {
        self.categories = categories;
        self
    }

    /// Push a toast for every applied change and when the feed fails.
    pub fn with_notifications(mut self, tx: mpsc::Sender<Notification>) -> Self {
        self.notifications = Some(tx);
        self
    }

    pub fn categories(&self) -> &[RecordCategory] {
        &self.categories
    }

    /// Start watching `entity`. Any previous subscription is torn down
    /// first; subscribing again to the current entity is a no-op.
    pub async fn subscribe(&self, entity: EntityId) {
        let mut inner = self.inner.write().await;
        if let Some(current) = &inner.channel {
            if current.entity() == &entity {
                return;
            }
        }
        if let Some(old) = inner.channel.take() {
            old.close().await;
        }

        let scope = ChannelScope::ChangeFeed {
            entity,
            categories: self.categories.clone(),
        };
        let channel = ScopedChannel::open(Arc::clone(&self.transport), scope).await;
        info!(topic = %channel.topic(), categories = self.categories.len(), "Change relay subscribing");
        inner.channel = Some(channel);
        inner.state = RelayState::Pending;
    }

    pub async fn unsubscribe(&self) {
        let mut inner = self.inner.write().await;
        if let Some(channel) = inner.channel.take() {
            channel.close().await;
        }
        inner.state = RelayState::Unsubscribed;
    }

    /// True only once the server confirmed the join.
    pub async fn is_subscribed(&self) -> bool {
        self.state().await == RelayState::Active
    }

    pub async fn state(&self) -> RelayState {
        self.inner.read().await.state
    }

    pub async fn entity(&self) -> Option<EntityId> {
        self.inner
            .read()
            .await
            .channel
            .as_ref()
            .map(|c| c.entity().clone())
    }

    /// Invalidate every watched category for the current entity.
    pub async fn refresh(&self) {
        let Some(entity) = self.entity().await else {
            debug!("Refresh requested with no active subscription");
            return;
        };
        for category in &self.categories {
            self.cache
                .invalidate(&QueryKey::new(*category, entity.clone()))
                .await;
        }
        debug!(entity = %entity, categories = self.categories.len(), "Relay refresh");
    }

    /// Apply one transport event.
    pub async fn handle_event(&self, event: &RealtimeEvent) {
        let mut inner = self.inner.write().await;
        if matches!(event, RealtimeEvent::Disconnected) {
            if inner.state == RelayState::Active {
                inner.state = RelayState::Pending;
            }
            return;
        }

        let Some(channel) = &inner.channel else {
            return;
        };
        if !channel.owns(event) {
            return;
        }
        let entity = channel.entity().clone();

        match event {
            RealtimeEvent::ChannelJoined { topic } => {
                info!(topic = %topic, "Change relay active");
                inner.state = RelayState::Active;
            }
            RealtimeEvent::ChannelError { topic, message } => {
                warn!(topic = %topic, error = %message, "Change feed failed; relay stopped");
                if let Some(channel) = inner.channel.take() {
                    channel.close().await;
                }
                inner.state = RelayState::Unsubscribed;
                self.send_toast(Notification::warning(
                    "Live updates",
                    format!("Live updates stopped: {message}"),
                ));
            }
            RealtimeEvent::PostgresChange { change, .. } => {
                drop(inner);
                self.apply_change(&entity, change).await;
            }
            _ => {}
        }
    }

    /// Returns whether the change was applied.
    async fn apply_change(&self, entity: &EntityId, change: &ChangeEvent) -> bool {
        let table = change.category.table();
        if !self.categories.contains(&change.category) {
            debug!(table, "Dropping change for unwatched category");
            return false;
        }

        let confirmed = match change.owner_id() {
            Some(owner) if entity.matches(owner) => true,
            Some(owner) => {
                debug!(table, owner = %owner, entity = %entity, "Dropping change for another entity");
                return false;
            }
            // Deletes under the default replica identity only carry the key,
            // and the server applies no row filter to deletes, so this may
            // belong to another entity. Invalidate, but don't announce it.
            None if change.kind == ChangeKind::Delete => false,
            None => {
                debug!(table, "Dropping change without owner id");
                return false;
            }
        };

        self.cache
            .invalidate(&QueryKey::new(change.category, entity.clone()))
            .await;
        debug!(table, kind = ?change.kind, entity = %entity, "Invalidated after change");

        if confirmed {
            self.send_toast(Notification::info(
                change.category.label(),
                format!("{} {}", change.category.singular(), change.kind.verb()),
            ));
        }
        true
    }

    fn send_toast(&self, notification: Notification) {
        let Some(tx) = &self.notifications else {
            return;
        };
        if let Err(e) = tx.try_send(notification) {
            debug!(error = %e, "Toast dropped");
        }
    }

    /// Consume transport events until the transport goes away.
    pub async fn run(self: Arc<Self>, mut events: broadcast::Receiver<RealtimeEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.handle_event(&event).await,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Change relay lagged behind; refreshing");
                    self.refresh().await;
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("Change relay stopped");
    }
}
