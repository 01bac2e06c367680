//! HTTP Client Factory
//!
//! Builds the reqwest client shared by the streaming providers.

use std::time::Duration;

use crate::types::{LlmError, LlmResult, ProviderConfig};

/// Build a `reqwest::Client` for the given provider configuration.
///
/// Only the connect phase is bounded here. Streamed responses can run for
/// many minutes, so the overall deadline is enforced by the caller.
pub fn build_http_client(config: &ProviderConfig) -> LlmResult<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .map_err(|e| LlmError::Other {
            message: format!("failed to build HTTP client: {}", e),
        })
}
