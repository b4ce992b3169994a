//! Full configuration validation.
//!
//! Validates numeric ranges, the project reference format, and the
//! watched category names, collecting every error before failing.

use std::sync::OnceLock;

use carenest_common::{ConfigError, RecordCategory};
use regex::Regex;

use crate::schema::CareConfig;

fn project_ref_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z0-9]{20}$").expect("static regex"))
}

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &CareConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    // Backend
    let project_ref = &config.backend.project_ref;
    if !project_ref.is_empty() && !project_ref_pattern().is_match(project_ref) {
        errors.push(format!(
            "backend.project_ref = {project_ref:?} must be 20 lowercase alphanumerics"
        ));
    }
    if let Some(url) = &config.backend.rest_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            errors.push(format!("backend.rest_url = {url:?} must be an http(s) URL"));
        }
    }

    if let Some(url) = &config.backend.realtime_url {
        if !url.starts_with("ws://") && !url.starts_with("wss://") {
            errors.push(format!("backend.realtime_url = {url:?} must be a ws(s) URL"));
        }
    }

    // Realtime transport
    let rt = &config.realtime;
    validate_range(&mut errors, "realtime.heartbeat_interval", rt.heartbeat_interval, 5, 120);
    validate_range(&mut errors, "realtime.reconnect_delay", rt.reconnect_delay, 1, 60);
    validate_range(&mut errors, "realtime.max_reconnect_delay", rt.max_reconnect_delay, 1, 600);
    validate_range(&mut errors, "realtime.connect_timeout", rt.connect_timeout, 1, 120);
    if rt.max_reconnect_delay < rt.reconnect_delay {
        errors.push(format!(
            "realtime.max_reconnect_delay = {} is below realtime.reconnect_delay = {}",
            rt.max_reconnect_delay, rt.reconnect_delay
        ));
    }

    // Search
    let search = &config.search;
    validate_range(&mut errors, "search.default_limit", search.default_limit, 1, 200);
    validate_range(&mut errors, "search.min_query_len", search.min_query_len, 1, 10);
    validate_range(&mut errors, "search.debounce_ms", search.debounce_ms, 0, 5000);

    // Relay
    for name in &config.relay.categories {
        if name.parse::<RecordCategory>().is_err() {
            errors.push(format!("relay.categories: unknown category {name:?}"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

/// Push an error if `value` is outside `[min, max]`.
fn validate_range(errors: &mut Vec<String>, name: &str, value: u32, min: u32, max: u32) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

#[cfg(test)]
mod tests;
