//! PostgREST-backed `CategorySource`.

use std::time::Duration;

use async_trait::async_trait;
use carenest_common::{EntityId, RecordCategory};
use serde_json::Value;
use tracing::debug;

use crate::error::SearchError;
use crate::source::CategorySource;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Reads category tables through the backend's REST API. Row-level
/// security applies to whichever token is sent.
pub struct RestSource {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl std::fmt::Debug for RestSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestSource")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

impl RestSource {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        access_token: Option<String>,
    ) -> Result<Self, SearchError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SearchError::Client(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token,
        })
    }

    pub(crate) fn table_url(&self, category: RecordCategory) -> String {
        format!("{}/{}", self.base_url, category.table())
    }

    pub(crate) fn owner_filter(category: RecordCategory, entity: &EntityId) -> (&'static str, String) {
        (category.owner_column(), format!("eq.{entity}"))
    }

    fn bearer(&self) -> String {
        let token = self.access_token.as_deref().unwrap_or(&self.api_key);
        format!("Bearer {token}")
    }
}

#[async_trait]
impl CategorySource for RestSource {
    async fn fetch(
        &self,
        category: RecordCategory,
        entity: &EntityId,
    ) -> Result<Vec<Value>, SearchError> {
        let (column, filter) = Self::owner_filter(category, entity);
        debug!(table = category.table(), entity = %entity, "REST fetch");

        let response = self
            .http
            .get(self.table_url(category))
            .query(&[("select", "*"), (column, filter.as_str())])
            .header("apikey", &self.api_key)
            .header("Authorization", self.bearer())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SearchError::source(category, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text = text.chars().take(200).collect::<String>();
            return Err(SearchError::source(category, format!("HTTP {status}: {text}")));
        }

        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| SearchError::source(category, format!("invalid body: {e}")))
    }
}
