//! Provider Factory
//!
//! Maps a provider selection to a concrete [`LlmProvider`].

use std::sync::Arc;

use crate::anthropic::AnthropicProvider;
use crate::openai::OpenAIProvider;
use crate::provider::LlmProvider;
use crate::types::{LlmResult, ProviderConfig};
use anr_analyzer_core::{AnalysisMode, ProviderType};

/// Supplies one provider handle per (provider, mode) selection.
///
/// The mode matters because each mode may run on a different model.
pub trait ProviderFactory: Send + Sync {
    fn create(&self, provider: ProviderType, mode: AnalysisMode)
        -> LlmResult<Arc<dyn LlmProvider>>;
}

/// Instantiate the HTTP provider named by `config.provider`.
pub fn create_provider(config: ProviderConfig) -> LlmResult<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match config.provider {
        ProviderType::Anthropic => Arc::new(AnthropicProvider::new(config)?),
        ProviderType::OpenAI => Arc::new(OpenAIProvider::new(config)?),
    };
    Ok(provider)
}
