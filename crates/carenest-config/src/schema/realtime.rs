//! Realtime transport, change relay and presence configuration types.

use serde::{Deserialize, Serialize};

/// WebSocket transport tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeSettings {
    /// Heartbeat interval in seconds (valid range: 5-120).
    pub heartbeat_interval: u32,
    /// Reconnect base delay in seconds.
    pub reconnect_delay: u32,
    /// Reconnect delay ceiling in seconds.
    pub max_reconnect_delay: u32,
    /// Connect timeout in seconds.
    pub connect_timeout: u32,
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        Self {
            heartbeat_interval: 25,
            reconnect_delay: 1,
            max_reconnect_delay: 30,
            connect_timeout: 15,
        }
    }
}

/// Change-notification relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub enabled: bool,
    /// Surface a toast for every relayed change.
    pub notify: bool,
    /// Watched categories, by short or table name.
    pub categories: Vec<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            notify: true,
            categories: vec![
                "medications".into(),
                "contacts".into(),
                "protocols".into(),
                "logs".into(),
                "suppliers".into(),
                "profile_info".into(),
            ],
        }
    }
}

/// Online-caregivers indicator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    pub enabled: bool,
    /// Name shown to other caregivers.
    pub display_name: Option<String>,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            display_name: None,
        }
    }
}
