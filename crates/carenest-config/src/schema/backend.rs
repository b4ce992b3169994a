//! Hosted backend (Supabase project) connection settings.

use serde::{Deserialize, Serialize};

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Supabase project reference, e.g. "abcdefghijklmnopqrst".
    pub project_ref: String,
    /// Publishable anon key.
    pub api_key: String,
    /// Signed-in user's JWT. Usually supplied via `CARENEST_ACCESS_TOKEN`.
    pub access_token: Option<String>,
    /// Overrides the PostgREST base URL (self-hosted or local stacks).
    pub rest_url: Option<String>,
    /// WebSocket endpoint override for local stacks.
    pub realtime_url: Option<String>,
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("project_ref", &self.project_ref)
            .field("api_key", &"[REDACTED]")
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("rest_url", &self.rest_url)
            .field("realtime_url", &self.realtime_url)
            .finish()
    }
}

impl BackendConfig {
    pub fn is_configured(&self) -> bool {
        !self.project_ref.is_empty() && !self.api_key.is_empty()
    }

    /// PostgREST base URL without a trailing slash.
    pub fn rest_base_url(&self) -> String {
        match &self.rest_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.supabase.co/rest/v1", self.project_ref),
        }
    }
}
