//! Provider Health
//!
//! Checks each configured provider with its cheapest model so a user can
//! tell a missing key from a rejected key or an unreachable endpoint.

use serde::{Deserialize, Serialize};

use anr_analyzer_core::{AnalysisMode, ProviderType};
use anr_analyzer_llm::{LlmError, ProviderFactory};

/// Mode whose model is used for health checks.
pub const HEALTH_CHECK_MODE: AnalysisMode = AnalysisMode::Quick;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    /// No API key
    Unconfigured,
    Unhealthy,
}

/// Outcome of probing one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub provider: ProviderType,
    pub model: String,
    pub state: HealthState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProviderHealth {
    pub fn is_healthy(&self) -> bool {
        self.state == HealthState::Healthy
    }
}

/// Create `provider` through `factory` and run its health check.
pub async fn check_provider(
    factory: &dyn ProviderFactory,
    provider: ProviderType,
    model: String,
) -> ProviderHealth {
    let (state, message) = match factory.create(provider, HEALTH_CHECK_MODE) {
        Err(LlmError::AuthenticationFailed { message }) => {
            (HealthState::Unconfigured, Some(message))
        }
        Err(e) => (HealthState::Unhealthy, Some(e.to_string())),
        Ok(client) => match client.health_check().await {
            Ok(()) => (HealthState::Healthy, None),
            Err(e) => {
                tracing::warn!(provider = %provider, error = %e, "provider health check failed");
                (HealthState::Unhealthy, Some(e.to_string()))
            }
        },
    };
    ProviderHealth {
        provider,
        model,
        state,
        message,
    }
}
