//! TOML config file loading and creation.

use crate::schema::CareConfig;
use crate::validation;
use carenest_common::ConfigError;
use std::path::Path;
use tracing::{info, warn};

/// Load config from a specific TOML file path.
///
/// Missing fields take serde defaults. If validation fails, a warning is
/// logged and the default config is returned with the file's backend
/// credentials preserved.
pub fn load_from_path(path: &Path) -> Result<CareConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::ParseError(format!("failed to read {}: {e}", path.display()))
    })?;

    let config: CareConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    if let Err(e) = validation::validate(&config) {
        warn!("config validation warning: {e}");
        warn!("falling back to default config");
        return Ok(CareConfig {
            backend: config.backend,
            ..CareConfig::default()
        });
    }

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// On macOS: `~/Library/Application Support/carenest/config.toml`
/// On Linux: `~/.config/carenest/config.toml`
///
/// If the file does not exist, creates a default config file and returns defaults.
pub fn load_default() -> Result<CareConfig, ConfigError> {
    let path = default_config_path()?;

    if !path.exists() {
        info!("no config found at {}, creating default", path.display());
        create_default_config(&path)?;
        return Ok(CareConfig::default());
    }

    load_from_path(&path)
}

/// Get the platform-specific default config file path.
pub fn default_config_path() -> Result<std::path::PathBuf, ConfigError> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::ParseError("could not determine config directory".into()))?;
    Ok(config_dir.join("carenest").join("config.toml"))
}

/// Create a default TOML config file with documentation comments.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            ConfigError::ParseError(format!(
                "failed to create config directory {}: {e}",
                parent.display()
            ))
        })?;
    }

    std::fs::write(path, default_config_toml()).map_err(|e| {
        ConfigError::ParseError(format!(
            "failed to write default config to {}: {e}",
            path.display()
        ))
    })?;

    info!("created default config at {}", path.display());
    Ok(())
}

/// Generate the default TOML config content with comments.
fn default_config_toml() -> String {
    r##"# CareNest Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[backend]
# project_ref = ""        # Supabase project reference (20 chars)
# api_key = ""            # publishable anon key
# rest_url = "http://localhost:54321/rest/v1"
# realtime_url = "ws://localhost:54321/realtime/v1/websocket"
# access_token is best supplied via CARENEST_ACCESS_TOKEN

[realtime]
# heartbeat_interval = 25     # 5-120 seconds
# reconnect_delay = 1         # 1-60 seconds
# max_reconnect_delay = 30    # 1-600 seconds
# connect_timeout = 15        # 1-120 seconds

[search]
# default_limit = 20          # 1-200
# min_query_len = 2           # 1-10
# debounce_ms = 300           # 0-5000

[relay]
# enabled = true
# notify = true
# categories = ["medications", "contacts", "protocols", "logs", "suppliers", "profile_info"]

[presence]
# enabled = true
# display_name = "Sam"

[logging]
# level = "info"              # trace, debug, info, warn, error
"##
    .to_string()
}
