//! Tests for the full validation pipeline.

use super::*;

#[test]
fn default_config_validates() {
    let config = CareConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn accepts_well_formed_project_ref() {
    let mut config = CareConfig::default();
    config.backend.project_ref = "abcdefghij0123456789".into();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_malformed_project_ref() {
    let mut config = CareConfig::default();
    config.backend.project_ref = "Not-A-Ref".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("backend.project_ref"));
}

#[test]
fn catches_non_http_rest_url() {
    let mut config = CareConfig::default();
    config.backend.rest_url = Some("ftp://example.com".into());
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("backend.rest_url"));
}

#[test]
fn catches_non_websocket_realtime_url() {
    let mut config = CareConfig::default();
    config.backend.realtime_url = Some("http://localhost:54321/realtime/v1/websocket".into());
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("backend.realtime_url"));

    config.backend.realtime_url = Some("ws://localhost:54321/realtime/v1/websocket".into());
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_heartbeat_too_small() {
    let mut config = CareConfig::default();
    config.realtime.heartbeat_interval = 1;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("realtime.heartbeat_interval"));
}

#[test]
fn catches_max_delay_below_base_delay() {
    let mut config = CareConfig::default();
    config.realtime.reconnect_delay = 10;
    config.realtime.max_reconnect_delay = 5;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("realtime.max_reconnect_delay"));
}

#[test]
fn catches_zero_limit() {
    let mut config = CareConfig::default();
    config.search.default_limit = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("search.default_limit"));
}

#[test]
fn catches_debounce_too_long() {
    let mut config = CareConfig::default();
    config.search.debounce_ms = 60_000;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("search.debounce_ms"));
}

#[test]
fn catches_unknown_relay_category() {
    let mut config = CareConfig::default();
    config.relay.categories.push("recipes".into());
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("recipes"));
}

#[test]
fn accepts_table_names_in_relay_categories() {
    let mut config = CareConfig::default();
    config.relay.categories = vec!["daily_logs".into(), "emergency_protocols".into()];
    assert!(validate(&config).is_ok());
}

#[test]
fn collects_multiple_errors() {
    let mut config = CareConfig::default();
    config.search.default_limit = 0;
    config.search.min_query_len = 50;
    config.realtime.connect_timeout = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("search.default_limit"));
    assert!(err.contains("search.min_query_len"));
    assert!(err.contains("realtime.connect_timeout"));
}
