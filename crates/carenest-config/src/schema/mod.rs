//! Configuration schema types for CareNest.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod backend;
mod realtime;
mod search;
mod system;

pub use backend::*;
pub use realtime::*;
pub use search::*;
pub use system::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration for CareNest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CareConfig {
    pub backend: BackendConfig,
    pub realtime: RealtimeSettings,
    pub search: SearchConfig,
    pub relay: RelayConfig,
    pub presence: PresenceConfig,
    pub logging: LoggingConfig,
}
