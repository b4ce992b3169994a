//! Logging configuration.

use serde::{Deserialize, Serialize};

/// Log level.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// `tracing_subscriber` filter directive for the workspace crates.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "carenest=trace",
            LogLevel::Debug => "carenest=debug",
            LogLevel::Info => "carenest=info",
            LogLevel::Warn => "carenest=warn",
            LogLevel::Error => "carenest=error",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}
