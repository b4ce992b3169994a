//! Client-side cache of per-category query results.
//!
//! Results are keyed by `(category, entity)`. Invalidation marks an entry
//! stale so the next read misses and the caller refetches.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::category::RecordCategory;
use crate::id::EntityId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub category: RecordCategory,
    pub entity_id: EntityId,
}

impl QueryKey {
    pub fn new(category: RecordCategory, entity_id: EntityId) -> Self {
        Self {
            category,
            entity_id,
        }
    }
}

#[async_trait]
pub trait QueryCache: Send + Sync {
    /// Fresh rows for `key`, or `None` on a miss or a stale entry.
    async fn get(&self, key: &QueryKey) -> Option<Vec<Value>>;

    async fn put(&self, key: QueryKey, rows: Vec<Value>);

    /// Mark `key` stale so dependent reads refetch.
    async fn invalidate(&self, key: &QueryKey);
}

#[derive(Debug)]
struct CacheEntry {
    rows: Vec<Value>,
    stale: bool,
}

/// In-process `QueryCache`. Last writer wins.
#[derive(Debug, Default)]
pub struct MemoryQueryCache {
    entries: RwLock<HashMap<QueryKey, CacheEntry>>,
}

impl MemoryQueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries
            .read()
            .await
            .get(key)
            .map(|e| e.stale)
            .unwrap_or(true)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl QueryCache for MemoryQueryCache {
    async fn get(&self, key: &QueryKey) -> Option<Vec<Value>> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.stale {
            None
        } else {
            Some(entry.rows.clone())
        }
    }

    async fn put(&self, key: QueryKey, rows: Vec<Value>) {
        self.entries
            .write()
            .await
            .insert(key, CacheEntry { rows, stale: false });
    }

    async fn invalidate(&self, key: &QueryKey) {
        if let Some(entry) = self.entries.write().await.get_mut(key) {
            entry.stale = true;
            debug!(category = %key.category, entity = %key.entity_id, "Query invalidated");
        }
    }
}
