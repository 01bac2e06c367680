//! Provider Factory
//!
//! Builds HTTP providers from the application configuration.

use std::sync::Arc;

use anr_analyzer_core::{AnalysisMode, ProviderType};
use anr_analyzer_llm::provider::missing_api_key_error;
use anr_analyzer_llm::{create_provider, LlmProvider, LlmResult, ProviderFactory};

use crate::models::settings::AppConfig;

/// Creates Anthropic/OpenAI providers with the model configured per mode.
#[derive(Debug, Clone)]
pub struct HttpProviderFactory {
    config: AppConfig,
}

impl HttpProviderFactory {
    /// `config` should already carry environment overrides.
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }
}

impl ProviderFactory for HttpProviderFactory {
    fn create(
        &self,
        provider: ProviderType,
        mode: AnalysisMode,
    ) -> LlmResult<Arc<dyn LlmProvider>> {
        let config = self.config.provider_config(provider, mode);
        if config.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(missing_api_key_error(&provider.to_string()));
        }
        create_provider(config)
    }
}
