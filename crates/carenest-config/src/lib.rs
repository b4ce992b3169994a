//! CareNest configuration system.
//!
//! TOML-based configuration with validation and environment overrides for
//! backend secrets. All sections use defaults so partial configs work.

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{CareConfig, CONFIG_SCHEMA_VERSION};

use std::path::Path;

use carenest_common::{ConfigError, RecordCategory};

pub const ENV_PROJECT_REF: &str = "CARENEST_PROJECT_REF";
pub const ENV_API_KEY: &str = "CARENEST_API_KEY";
pub const ENV_ACCESS_TOKEN: &str = "CARENEST_ACCESS_TOKEN";

/// Load config from the platform default path, apply environment
/// overrides, and validate the result.
pub fn load_config() -> Result<CareConfig, ConfigError> {
    let mut config = toml_loader::load_default()?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validation::validate(&config)?;
    Ok(config)
}

/// Same as [`load_config`] for an explicit file.
pub fn load_config_from(path: &Path) -> Result<CareConfig, ConfigError> {
    let mut config = toml_loader::load_from_path(path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validation::validate(&config)?;
    Ok(config)
}

/// Overwrite backend credentials with any non-empty `CARENEST_*` values.
pub fn apply_env_overrides<F>(config: &mut CareConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get(ENV_PROJECT_REF) {
        config.backend.project_ref = v;
    }
    if let Some(v) = get(ENV_API_KEY) {
        config.backend.api_key = v;
    }
    if let Some(v) = get(ENV_ACCESS_TOKEN) {
        config.backend.access_token = Some(v);
    }
}

/// Parse the relay's watched categories. Unknown names are skipped with a
/// warning; validation already rejects them for loaded configs.
pub fn watched_categories(config: &CareConfig) -> Vec<RecordCategory> {
    let mut out = Vec::new();
    for name in &config.relay.categories {
        match name.parse::<RecordCategory>() {
            Ok(c) if !out.contains(&c) => out.push(c),
            Ok(_) => {}
            Err(e) => tracing::warn!("ignoring relay category: {e}"),
        }
    }
    out
}

/// Serialize a config to pretty-printed JSON with secrets blanked.
pub fn config_to_json(config: &CareConfig) -> String {
    let mut redacted = config.clone();
    if !redacted.backend.api_key.is_empty() {
        redacted.backend.api_key = "[REDACTED]".into();
    }
    if redacted.backend.access_token.is_some() {
        redacted.backend.access_token = Some("[REDACTED]".into());
    }
    serde_json::to_string_pretty(&redacted)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn config_to_json_contains_all_sections() {
        let json = config_to_json(&CareConfig::default());
        for section in ["backend", "realtime", "search", "relay", "presence", "logging"] {
            assert!(json.contains(&format!("\"{section}\"")), "missing {section}");
        }
    }

    #[test]
    fn config_to_json_redacts_secrets() {
        let mut config = CareConfig::default();
        config.backend.api_key = "anon-key".into();
        config.backend.access_token = Some("jwt".into());
        let json = config_to_json(&config);
        assert!(!json.contains("anon-key"));
        assert!(!json.contains("jwt"));
        assert!(json.contains("[REDACTED]"));
    }

    #[test]
    fn env_overrides_replace_backend_fields() {
        let env: HashMap<&str, &str> = [
            (ENV_PROJECT_REF, "abcdefghij0123456789"),
            (ENV_API_KEY, "from-env"),
            (ENV_ACCESS_TOKEN, "   "),
        ]
        .into_iter()
        .collect();

        let mut config = CareConfig::default();
        apply_env_overrides(&mut config, |k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.backend.project_ref, "abcdefghij0123456789");
        assert_eq!(config.backend.api_key, "from-env");
        assert!(config.backend.access_token.is_none());
    }

    #[test]
    fn watched_categories_default_to_all_six() {
        let cats = watched_categories(&CareConfig::default());
        assert_eq!(cats, RecordCategory::ALL.to_vec());
    }

    #[test]
    fn watched_categories_dedupe_and_skip_unknown() {
        let mut config = CareConfig::default();
        config.relay.categories = vec!["logs".into(), "daily_logs".into(), "recipes".into()];
        assert_eq!(watched_categories(&config), vec![RecordCategory::Logs]);
    }

    #[test]
    fn rest_base_url_defaults_to_project() {
        let mut config = CareConfig::default();
        config.backend.project_ref = "abcdefghij0123456789".into();
        assert_eq!(
            config.backend.rest_base_url(),
            "https://abcdefghij0123456789.supabase.co/rest/v1"
        );
        config.backend.rest_url = Some("http://localhost:54321/rest/v1/".into());
        assert_eq!(config.backend.rest_base_url(), "http://localhost:54321/rest/v1");
    }

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }
}
