//! Concurrent fan-out search over all record categories.

use std::cmp::Ordering;
use std::sync::Arc;

use carenest_common::{EntityId, RecordCategory};
use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::SearchError;
use crate::result::{SearchResponse, SearchResult};
use crate::scorer::{score, searchable_text};
use crate::source::CategorySource;

/// Queries shorter than this (in characters, after trimming) return nothing.
pub const MIN_QUERY_LEN: usize = 2;

/// Result cap when the caller does not supply one.
pub const DEFAULT_LIMIT: usize = 20;

pub struct SearchEngine {
    source: Arc<dyn CategorySource>,
    categories: Vec<RecordCategory>,
    min_query_len: usize,
    default_limit: usize,
}

impl SearchEngine {
    pub fn new(source: Arc<dyn CategorySource>) -> Self {
        Self {
            source,
            categories: RecordCategory::ALL.to_vec(),
            min_query_len: MIN_QUERY_LEN,
            default_limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_categories(mut self, categories: Vec<RecordCategory>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_min_query_len(mut self, len: usize) -> Self {
        self.min_query_len = len.max(1);
        self
    }

    pub fn with_default_limit(mut self, limit: usize) -> Self {
        self.default_limit = limit.max(1);
        self
    }

    /// Search every category owned by `entity` for `query`.
    ///
    /// Category lookups run concurrently. A failing category is logged and
    /// listed in [`SearchResponse::failed`]; the search only fails when all
    /// lookups fail. If `cancel` fires before the lookups complete, the
    /// partial work is discarded and `SearchError::Cancelled` is returned.
    pub async fn search(
        &self,
        entity: &EntityId,
        query: &str,
        limit: Option<usize>,
        cancel: &CancellationToken,
    ) -> Result<SearchResponse, SearchError> {
        let query = query.trim();
        if query.chars().count() < self.min_query_len {
            return Ok(SearchResponse::default());
        }
        if cancel.is_cancelled() {
            return Err(SearchError::Cancelled);
        }

        let lookups = self.categories.iter().map(|&category| {
            let source = Arc::clone(&self.source);
            async move { (category, source.fetch(category, entity).await) }
        });

        let outcomes = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(query = %query, "Search cancelled in flight");
                return Err(SearchError::Cancelled);
            }
            outcomes = join_all(lookups) => outcomes,
        };

        let mut response = SearchResponse::default();
        for (category, outcome) in outcomes {
            match outcome {
                Ok(rows) => {
                    let fields = category.search_fields();
                    response.results.extend(rows.iter().filter_map(|row| {
                        let s = score(&searchable_text(row, fields), query);
                        if s == 0 {
                            return None;
                        }
                        SearchResult::from_row(category, row, s)
                    }));
                }
                Err(e) => {
                    warn!(category = %category, error = %e, "Category lookup failed");
                    response.failed.push(category);
                }
            }
        }

        if !self.categories.is_empty() && response.failed.len() == self.categories.len() {
            return Err(SearchError::AllSourcesFailed(response.failed.len()));
        }

        rank(&mut response.results);
        response
            .results
            .truncate(limit.unwrap_or(self.default_limit));

        debug!(
            query = %query,
            hits = response.results.len(),
            failed = response.failed.len(),
            "Search complete"
        );
        Ok(response)
    }
}

/// Score descending, then category order, then title, then id.
pub(crate) fn rank(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.category.cmp(&b.category))
            .then_with(|| compare_titles(&a.title, &b.title))
            .then_with(|| a.id.cmp(&b.id))
    });
}

fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StaticSource;
    use serde_json::json;
    use std::sync::atomic::Ordering as AtomicOrdering;
    use std::time::Duration;

    fn child() -> EntityId {
        EntityId::from("c1")
    }

    fn fixture() -> StaticSource {
        StaticSource::new()
            .with_rows(
                RecordCategory::Medications,
                vec![
                    json!({"id": "m1", "child_id": "c1", "name": "Lorazepam", "dosage": "0.5mg"}),
                    json!({"id": "m2", "child_id": "c1", "name": "Metformin"}),
                    json!({"id": "m3", "child_id": "c2", "name": "Lorazepam"}),
                ],
            )
            .with_rows(
                RecordCategory::Contacts,
                vec![json!({"id": "k1", "child_id": "c1", "name": "Dr. Lora Chen", "role": "Neurologist"})],
            )
            .with_rows(
                RecordCategory::Logs,
                vec![json!({"id": "l1", "child_id": "c1", "title": "Evening", "notes": "gave lorazepam at 8pm"})],
            )
            .with_rows(
                RecordCategory::ProfileInfo,
                vec![json!({"id": "c1", "name": "Lora", "diagnosis": "Epilepsy"})],
            )
    }

    #[tokio::test]
    async fn merges_and_ranks_across_categories() {
        let engine = SearchEngine::new(Arc::new(fixture()));
        let response = engine
            .search(&child(), "lora", None, &CancellationToken::new())
            .await
            .unwrap();

        let ids: Vec<_> = response.results.iter().map(|r| r.id.as_str()).collect();
        // Two prefix hits, then two substring hits, each pair in category order.
        assert_eq!(ids, vec!["m1", "c1", "k1", "l1"]);
        assert_eq!(response.results[0].score, 80);
        assert_eq!(response.results[2].score, 60);
        assert!(!response.is_partial());
    }

    #[tokio::test]
    async fn results_are_sorted_by_score_descending() {
        let engine = SearchEngine::new(Arc::new(fixture()));
        let response = engine
            .search(&child(), "lo", None, &CancellationToken::new())
            .await
            .unwrap();
        assert!(!response.results.is_empty());
        assert!(response
            .results
            .windows(2)
            .all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn other_entities_rows_are_not_returned() {
        let engine = SearchEngine::new(Arc::new(fixture()));
        let response = engine
            .search(&EntityId::from("c2"), "lorazepam", None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].id, "m3");
        assert_eq!(response.results[0].score, 100);
    }

    #[tokio::test]
    async fn short_query_makes_no_backend_calls() {
        let source = fixture();
        let calls = source.calls();
        let engine = SearchEngine::new(Arc::new(source));
        for query in ["", "l", "  l  "] {
            let response = engine
                .search(&child(), query, None, &CancellationToken::new())
                .await
                .unwrap();
            assert!(response.results.is_empty());
        }
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn limit_truncates() {
        let engine = SearchEngine::new(Arc::new(fixture()));
        let response = engine
            .search(&child(), "lora", Some(2), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.results.len(), 2);
    }

    #[tokio::test]
    async fn default_limit_applies() {
        let rows: Vec<_> = (0..30)
            .map(|i| json!({"id": format!("m{i:02}"), "child_id": "c1", "name": format!("Vitamin {i}")}))
            .collect();
        let source = StaticSource::new().with_rows(RecordCategory::Medications, rows);
        let engine = SearchEngine::new(Arc::new(source));
        let response = engine
            .search(&child(), "vitamin", None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.results.len(), DEFAULT_LIMIT);
        // Equal scores fall back to title order.
        assert_eq!(response.results[0].title, "Vitamin 0");
        assert_eq!(response.results[1].title, "Vitamin 1");
    }

    #[tokio::test]
    async fn queries_every_category_once() {
        let source = fixture();
        let calls = source.calls();
        let engine = SearchEngine::new(Arc::new(source));
        engine
            .search(&child(), "xyz", None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 6);
    }

    #[tokio::test]
    async fn lookups_run_concurrently() {
        struct BarrierSource(tokio::sync::Barrier);

        #[async_trait::async_trait]
        impl CategorySource for BarrierSource {
            async fn fetch(
                &self,
                _category: RecordCategory,
                _entity: &EntityId,
            ) -> Result<Vec<serde_json::Value>, SearchError> {
                // Only releases once all six lookups are waiting at once.
                self.0.wait().await;
                Ok(Vec::new())
            }
        }

        let engine = SearchEngine::new(Arc::new(BarrierSource(tokio::sync::Barrier::new(6))));
        let outcome = tokio::time::timeout(
            Duration::from_secs(2),
            engine.search(&child(), "query", None, &CancellationToken::new()),
        )
        .await;
        assert!(outcome.is_ok(), "category lookups did not overlap");
    }

    #[tokio::test]
    async fn partial_failure_degrades_gracefully() {
        let source = fixture().failing(RecordCategory::Contacts);
        let engine = SearchEngine::new(Arc::new(source));
        let response = engine
            .search(&child(), "lora", None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.failed, vec![RecordCategory::Contacts]);
        assert!(response.results.iter().all(|r| r.category != RecordCategory::Contacts));
        assert_eq!(response.results.len(), 3);
    }

    #[tokio::test]
    async fn total_failure_is_an_error() {
        let mut source = StaticSource::new();
        for category in RecordCategory::ALL {
            source = source.failing(category);
        }
        let engine = SearchEngine::new(Arc::new(source));
        let err = engine
            .search(&child(), "lora", None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::AllSourcesFailed(6)));
    }

    #[tokio::test]
    async fn cancelled_before_start_issues_no_calls() {
        let source = fixture();
        let calls = source.calls();
        let engine = SearchEngine::new(Arc::new(source));
        let token = CancellationToken::new();
        token.cancel();
        let err = engine.search(&child(), "lora", None, &token).await.unwrap_err();
        assert!(matches!(err, SearchError::Cancelled));
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_in_flight_drops_results() {
        let source = fixture().with_delay(Duration::from_millis(500));
        let engine = SearchEngine::new(Arc::new(source));
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });
        let err = engine.search(&child(), "lora", None, &token).await.unwrap_err();
        assert!(matches!(err, SearchError::Cancelled));
    }

    #[tokio::test]
    async fn restricted_categories_are_honoured() {
        let source = fixture();
        let calls = source.calls();
        let engine = SearchEngine::new(Arc::new(source))
            .with_categories(vec![RecordCategory::Medications]);
        let response = engine
            .search(&child(), "lora", None, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 1);
        assert!(response
            .results
            .iter()
            .all(|r| r.category == RecordCategory::Medications));
    }

    #[test]
    fn rank_tie_break_is_category_then_title() {
        let make = |id: &str, category, title: &str| SearchResult {
            id: id.into(),
            category,
            title: title.into(),
            subtitle: None,
            description: None,
            url: String::new(),
            icon: String::new(),
            score: 60,
        };
        let mut results = vec![
            make("3", RecordCategory::Suppliers, "alpha"),
            make("2", RecordCategory::Medications, "Zeta"),
            make("1", RecordCategory::Medications, "beta"),
        ];
        rank(&mut results);
        let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
    }
}
