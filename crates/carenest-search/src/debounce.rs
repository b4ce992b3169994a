//! Debounced search-as-you-type.
//!
//! Every submission supersedes the previous one: its cancellation token is
//! fired whether the earlier search is still waiting out the quiet period
//! or already has lookups in flight, so stale responses never surface.

use std::sync::Arc;
use std::time::Duration;

use carenest_common::EntityId;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::engine::SearchEngine;
use crate::error::SearchError;
use crate::result::SearchResponse;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

pub struct DebouncedSearch {
    engine: Arc<SearchEngine>,
    delay: Duration,
    current: Mutex<Option<CancellationToken>>,
}

impl DebouncedSearch {
    pub fn new(engine: Arc<SearchEngine>, delay: Duration) -> Self {
        Self {
            engine,
            delay,
            current: Mutex::new(None),
        }
    }

    /// Submit the latest input. Resolves to `SearchError::Cancelled` if a
    /// newer submission arrives before this one completes.
    pub async fn submit(
        &self,
        entity: &EntityId,
        query: &str,
        limit: Option<usize>,
    ) -> Result<SearchResponse, SearchError> {
        let token = CancellationToken::new();
        if let Some(previous) = self.current.lock().await.replace(token.clone()) {
            previous.cancel();
        }

        tokio::select! {
            _ = token.cancelled() => return Err(SearchError::Cancelled),
            _ = tokio::time::sleep(self.delay) => {}
        }

        self.engine.search(entity, query, limit, &token).await
    }

    /// Cancel whatever submission is pending, e.g. when the search box closes.
    pub async fn cancel(&self) {
        if let Some(token) = self.current.lock().await.take() {
            token.cancel();
        }
    }
}
