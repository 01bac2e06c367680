//! Health Check Commands
//!
//! Reports whether the config loaded and whether each provider answers.

use serde::Serialize;

use crate::services::analysis::ProviderHealth;
use crate::state::AppState;
use crate::utils::error::AppResult;

/// Health of the config and every provider.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// "healthy" or "degraded"
    pub status: String,
    pub config: bool,
    pub providers: Vec<ProviderHealth>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.config && self.providers.iter().all(ProviderHealth::is_healthy)
    }
}

/// Check the config and each provider.
pub async fn health(state: &AppState) -> AppResult<HealthReport> {
    let config = state.is_config_healthy();
    let service = state.analysis_service().await?;
    let providers = service.check_providers().await;

    let mut report = HealthReport {
        status: String::new(),
        config,
        providers,
    };
    report.status = if report.is_healthy() {
        "healthy".to_string()
    } else {
        "degraded".to_string()
    };
    Ok(report)
}
