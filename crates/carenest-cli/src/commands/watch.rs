//! `carenest watch`: live change toasts and the online roster for one child.

use std::sync::Arc;
use std::time::Duration;

use carenest_common::{
    new_id, CareError, EntityId, Identity, MemoryQueryCache, Notification, NotificationLevel,
    NotificationQueue, QueryCache, QueryKey, RecordCategory,
};
use carenest_config::schema::CareConfig;
use carenest_realtime::{
    ChangeRelay, PresenceTracker, RealtimeClient, RealtimeConfig, RealtimeTransport,
};
use carenest_search::{CachedSource, CategorySource, RestSource};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

const ROSTER_POLL: Duration = Duration::from_secs(2);
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

pub struct WatchOptions {
    pub child: EntityId,
    pub user: Option<String>,
    pub name: Option<String>,
    pub quiet: bool,
}

pub(crate) fn realtime_config(config: &CareConfig) -> RealtimeConfig {
    let rt = &config.realtime;
    RealtimeConfig {
        project_ref: config.backend.project_ref.clone(),
        api_key: config.backend.api_key.clone(),
        access_token: config.backend.access_token.clone(),
        url_override: config.backend.realtime_url.clone(),
        heartbeat_interval_secs: u64::from(rt.heartbeat_interval),
        reconnect_delay_secs: u64::from(rt.reconnect_delay),
        max_reconnect_delay_secs: u64::from(rt.max_reconnect_delay),
        connect_timeout_secs: u64::from(rt.connect_timeout),
    }
}

/// Who this process announces itself as in the presence roster.
pub(crate) fn presence_identity(config: &CareConfig, opts: &WatchOptions) -> Identity {
    Identity::new(
        opts.user.clone().unwrap_or_else(new_id),
        opts.name.clone().or_else(|| config.presence.display_name.clone()),
    )
    .with_access_token(config.backend.access_token.clone())
}

/// Fetch every watched category whose cached rows are missing or were
/// invalidated by the relay. Returns how many were refilled.
async fn refetch_stale(
    source: &dyn CategorySource,
    cache: &MemoryQueryCache,
    child: &EntityId,
    categories: &[RecordCategory],
) -> usize {
    let mut refilled = 0;
    for &category in categories {
        if !cache.is_stale(&QueryKey::new(category, child.clone())).await {
            continue;
        }
        match source.fetch(category, child).await {
            Ok(rows) => {
                info!(category = %category, rows = rows.len(), "Refetched");
                refilled += 1;
            }
            // Still stale, so the next tick retries.
            Err(e) => debug!(category = %category, error = %e, "Refetch failed"),
        }
    }
    refilled
}

pub async fn run(config: &CareConfig, opts: WatchOptions) -> Result<(), CareError> {
    super::require_backend(&config.backend)?;
    if config.backend.project_ref.is_empty() && config.backend.realtime_url.is_none() {
        return Err(CareError::Realtime(
            "backend.project_ref or backend.realtime_url is required to watch".into(),
        ));
    }
    if !config.relay.enabled && !config.presence.enabled {
        warn!("Both relay and presence are disabled; nothing to watch");
        return Ok(());
    }

    let client = RealtimeClient::connect(realtime_config(config));
    let transport: Arc<dyn RealtimeTransport> = Arc::new(client.clone());
    let cache = Arc::new(MemoryQueryCache::new());
    let shared: Arc<dyn QueryCache> = cache.clone();
    let backend = &config.backend;
    let source = CachedSource::new(
        RestSource::new(
            backend.rest_base_url(),
            backend.api_key.clone(),
            backend.access_token.clone(),
        )?,
        Arc::clone(&shared),
    );
    let categories = carenest_config::watched_categories(config);
    let (toast_tx, mut toast_rx) = mpsc::channel::<Notification>(32);

    let relay = if config.relay.enabled {
        let mut relay = ChangeRelay::new(Arc::clone(&transport), shared)
            .with_categories(categories.clone());
        if config.relay.notify && !opts.quiet {
            relay = relay.with_notifications(toast_tx.clone());
        }
        let relay = Arc::new(relay);
        let events = transport.subscribe();
        relay.subscribe(opts.child.clone()).await;
        tokio::spawn(Arc::clone(&relay).run(events));
        Some(relay)
    } else {
        None
    };
    drop(toast_tx);

    let tracker = if config.presence.enabled {
        let identity = presence_identity(config, &opts);
        info!(user_id = %identity.user_id, "Announcing presence");
        let tracker = Arc::new(PresenceTracker::new(Arc::clone(&transport), identity));
        let events = transport.subscribe();
        tracker.subscribe(opts.child.clone()).await;
        tokio::spawn(Arc::clone(&tracker).run(events));
        Some(tracker)
    } else {
        None
    };

    info!(child = %opts.child, "Watching; press Ctrl-C to stop");
    let mut toasts = NotificationQueue::default();
    let mut roster_tick = tokio::time::interval(ROSTER_POLL);
    let mut last_roster: Vec<String> = Vec::new();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            Some(toast) = toast_rx.recv() => {
                toasts.push(toast);
                let visible = toasts.visible();
                if let Some(latest) = visible.last() {
                    let marker = match latest.level {
                        NotificationLevel::Info => "",
                        NotificationLevel::Warning => "warning: ",
                    };
                    println!("{marker}[{}] {} ({} recent)", latest.title, latest.body, visible.len());
                }
            }
            _ = roster_tick.tick() => {
                if relay.is_some() {
                    refetch_stale(&source, &cache, &opts.child, &categories).await;
                }
                if let Some(tracker) = &tracker {
                    let users = tracker.online_users().await;
                    let names: Vec<String> = users
                        .iter()
                        .map(|u| u.display_name.clone().unwrap_or_else(|| u.user_id.clone()))
                        .collect();
                    if names != last_roster {
                        info!(online = names.len(), users = %names.join(", "), "Caregivers online");
                        last_roster = names;
                    }
                }
            }
        }
    }

    info!("Stopping");
    if let Some(relay) = &relay {
        relay.unsubscribe().await;
    }
    if let Some(tracker) = &tracker {
        tracker.unsubscribe().await;
    }
    client.disconnect().await;
    let _ = tokio::time::timeout(DISCONNECT_GRACE, async {
        while client.is_connected().await {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    Ok(())
}
