//! Global search across a child's records.
//!
//! Every record category is fetched concurrently, each record's searchable
//! fields are scored against the query with a fixed tier scheme, and the
//! merged list is sorted by score and truncated.

pub mod debounce;
pub mod engine;
pub mod error;
pub mod rest;
pub mod result;
pub mod scorer;
pub mod source;

#[cfg(test)]
pub(crate) mod test_support;

pub use debounce::DebouncedSearch;
pub use engine::{SearchEngine, DEFAULT_LIMIT, MIN_QUERY_LEN};
pub use error::SearchError;
pub use rest::RestSource;
pub use result::{SearchResponse, SearchResult};
pub use scorer::{score, searchable_text};
pub use source::{CachedSource, CategorySource};
pub use tokio_util::sync::CancellationToken;
