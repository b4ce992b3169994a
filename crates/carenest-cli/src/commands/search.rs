//! `carenest search`: one query, or a stream of queries from stdin.

use std::sync::Arc;
use std::time::Duration;

use carenest_common::{CareError, EntityId, MemoryQueryCache};
use carenest_config::schema::CareConfig;
use carenest_search::{
    CachedSource, CancellationToken, DebouncedSearch, RestSource, SearchEngine, SearchError,
    SearchResponse,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

fn build_engine(config: &CareConfig) -> Result<SearchEngine, CareError> {
    super::require_backend(&config.backend)?;
    let backend = &config.backend;
    let rest = RestSource::new(
        backend.rest_base_url(),
        backend.api_key.clone(),
        backend.access_token.clone(),
    )?;
    let source = CachedSource::new(rest, Arc::new(MemoryQueryCache::new()));
    Ok(SearchEngine::new(Arc::new(source))
        .with_min_query_len(config.search.min_query_len as usize)
        .with_default_limit(config.search.default_limit as usize))
}

pub async fn run(
    config: &CareConfig,
    child: EntityId,
    limit: Option<usize>,
    json: bool,
    query: Option<String>,
) -> Result<(), CareError> {
    let engine = build_engine(config)?;
    match query {
        Some(query) => {
            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ctrl_c.cancel();
                }
            });
            let response = engine.search(&child, &query, limit, &cancel).await?;
            print_response(&response, json);
            Ok(())
        }
        None => {
            let delay = Duration::from_millis(u64::from(config.search.debounce_ms));
            interactive(Arc::new(DebouncedSearch::new(Arc::new(engine), delay)), child, limit, json)
                .await
        }
    }
}

/// Each stdin line supersedes the previous one, as keystrokes would.
async fn interactive(
    search: Arc<DebouncedSearch>,
    child: EntityId,
    limit: Option<usize>,
    json: bool,
) -> Result<(), CareError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last = None;
    while let Some(line) = lines.next_line().await? {
        let search = Arc::clone(&search);
        let child = child.clone();
        last = Some(tokio::spawn(async move {
            match search.submit(&child, &line, limit).await {
                Ok(response) => print_response(&response, json),
                Err(SearchError::Cancelled) => debug!(query = %line, "Superseded"),
                Err(e) => warn!(query = %line, "Search failed: {e}"),
            }
        }));
    }
    if let Some(handle) = last {
        let _ = handle.await;
    }
    Ok(())
}

fn print_response(response: &SearchResponse, json: bool) {
    if response.is_partial() {
        let failed: Vec<String> = response.failed.iter().map(|c| c.to_string()).collect();
        warn!(failed = %failed.join(", "), "Some categories could not be searched");
    }
    if json {
        match serde_json::to_string_pretty(response) {
            Ok(text) => println!("{text}"),
            Err(e) => warn!("Failed to serialize results: {e}"),
        }
        return;
    }
    if response.results.is_empty() {
        println!("No results.");
        return;
    }
    for r in &response.results {
        let detail = r.subtitle.as_deref().unwrap_or("");
        println!(
            "{:>3}  {:<18} {}  {}  {}",
            r.score,
            r.category.label(),
            r.title,
            detail,
            r.url
        );
    }
}
