//! Settings Commands
//!
//! Commands for reading and resetting analyzer settings.

use crate::models::settings::AppConfig;
use crate::state::AppState;
use crate::utils::error::AppResult;

/// Current settings with environment keys applied and all keys masked
pub async fn get_settings(state: &AppState) -> AppResult<AppConfig> {
    let mut config = state.get_config().await?;
    config.apply_env_overrides();
    Ok(config.redacted())
}

/// Reset settings to defaults; returns the new settings, masked
pub async fn reset_settings(state: &AppState) -> AppResult<AppConfig> {
    Ok(state.reset_config().await?.redacted())
}
