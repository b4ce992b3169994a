use carenest_common::{CareError, RecordCategory};

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The search was superseded or explicitly cancelled.
    #[error("search cancelled")]
    Cancelled,

    #[error("{category} lookup failed: {message}")]
    Source {
        category: RecordCategory,
        message: String,
    },

    #[error("all {0} category lookups failed")]
    AllSourcesFailed(usize),

    #[error("http client error: {0}")]
    Client(String),
}

impl SearchError {
    pub fn source(category: RecordCategory, message: impl Into<String>) -> Self {
        Self::Source {
            category,
            message: message.into(),
        }
    }
}

impl From<SearchError> for CareError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::Client(message) => CareError::Network(message),
            other => CareError::Search(other.to_string()),
        }
    }
}
