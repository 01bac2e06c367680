//! LLM Provider Trait
//!
//! Defines the common interface for all streaming providers.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{CompletionRequest, LlmError, LlmResult, ProviderConfig, UsageStats};
use anr_analyzer_core::streaming::UnifiedStreamEvent;

/// Trait that all LLM providers must implement.
///
/// A provider only knows how to run one streamed completion and push the
/// normalized events into a channel. Abort handling lives in
/// [`crate::stream::ProviderStream`], which owns the task running this call.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the current model being used.
    fn model(&self) -> &str;

    /// Stream a completion via a channel.
    ///
    /// Emits `TextDelta`, cumulative `Usage` snapshots, and in-band `Error`
    /// events on `tx`; returns the final usage once the provider finishes.
    /// A closed receiver ends the call with `LlmError::StreamAborted`.
    async fn stream_completion(
        &self,
        request: CompletionRequest,
        tx: mpsc::Sender<UnifiedStreamEvent>,
    ) -> LlmResult<UsageStats>;

    /// Check if the provider is healthy and reachable.
    ///
    /// For API providers, this validates the API key.
    async fn health_check(&self) -> LlmResult<()>;

    /// Get the configuration for this provider.
    fn config(&self) -> &ProviderConfig;
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}
