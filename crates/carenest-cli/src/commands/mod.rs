pub mod search;
pub mod watch;

use carenest_common::{CareError, ConfigError};
use carenest_config::schema::BackendConfig;

/// Fail early when the backend cannot be reached with the given settings.
pub(crate) fn require_backend(backend: &BackendConfig) -> Result<(), CareError> {
    if backend.is_configured() {
        return Ok(());
    }
    if backend.api_key.is_empty() {
        return Err(ConfigError::ValidationError(
            "backend.api_key is not set (config file or CARENEST_API_KEY)".into(),
        )
        .into());
    }
    if backend.project_ref.is_empty() && backend.rest_url.is_none() {
        return Err(ConfigError::ValidationError(
            "backend.project_ref is not set (config file or CARENEST_PROJECT_REF)".into(),
        )
        .into());
    }
    Ok(())
}
