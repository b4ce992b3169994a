//! Where category rows come from.

use std::sync::Arc;

use async_trait::async_trait;
use carenest_common::{EntityId, QueryCache, QueryKey, RecordCategory};
use serde_json::Value;
use tracing::debug;

use crate::error::SearchError;

/// Fetches every row of one category owned by one entity.
#[async_trait]
pub trait CategorySource: Send + Sync {
    async fn fetch(
        &self,
        category: RecordCategory,
        entity: &EntityId,
    ) -> Result<Vec<Value>, SearchError>;
}

/// Serves rows from a shared query cache, falling through to `inner` on a
/// miss or after the change relay invalidated the key.
pub struct CachedSource<S> {
    inner: S,
    cache: Arc<dyn QueryCache>,
}

impl<S: CategorySource> CachedSource<S> {
    pub fn new(inner: S, cache: Arc<dyn QueryCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<S: CategorySource> CategorySource for CachedSource<S> {
    async fn fetch(
        &self,
        category: RecordCategory,
        entity: &EntityId,
    ) -> Result<Vec<Value>, SearchError> {
        let key = QueryKey::new(category, entity.clone());
        if let Some(rows) = self.cache.get(&key).await {
            debug!(category = %category, entity = %entity, "Cache hit");
            return Ok(rows);
        }

        let rows = self.inner.fetch(category, entity).await?;
        self.cache.put(key, rows.clone()).await;
        Ok(rows)
    }
}
