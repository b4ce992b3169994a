//! In-memory `CategorySource` fakes shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use carenest_common::{EntityId, RecordCategory};
use serde_json::Value;

use crate::error::SearchError;
use crate::source::CategorySource;

/// Serves fixed rows per category, filtered by owning id, and counts calls.
#[derive(Default)]
pub(crate) struct StaticSource {
    rows: HashMap<RecordCategory, Vec<Value>>,
    failing: HashSet<RecordCategory>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl StaticSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_rows(mut self, category: RecordCategory, rows: Vec<Value>) -> Self {
        self.rows.insert(category, rows);
        self
    }

    pub(crate) fn failing(mut self, category: RecordCategory) -> Self {
        self.failing.insert(category);
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl CategorySource for StaticSource {
    async fn fetch(
        &self,
        category: RecordCategory,
        entity: &EntityId,
    ) -> Result<Vec<Value>, SearchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(&category) {
            return Err(SearchError::source(category, "HTTP 500: boom"));
        }
        let owner = category.owner_column();
        Ok(self
            .rows
            .get(&category)
            .map(|rows| {
                rows.iter()
                    .filter(|row| row.get(owner).map(|v| entity.matches(v)).unwrap_or(false))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
