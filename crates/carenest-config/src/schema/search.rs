use serde::{Deserialize, Serialize};

/// Global search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Result cap when the caller does not pass one (valid range: 1-200).
    pub default_limit: u32,
    /// Queries shorter than this never reach the backend.
    pub min_query_len: u32,
    /// Quiet period before a typed query is issued, in milliseconds.
    pub debounce_ms: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: 20,
            min_query_len: 2,
            debounce_ms: 300,
        }
    }
}
