//! ANR Analyzer LLM
//!
//! Streaming provider clients behind one abortable interface:
//! - Anthropic Claude
//! - OpenAI
//!
//! Also includes provider-specific stream adapters, SSE line handling,
//! model pricing and the HTTP client factory.

pub mod anthropic;
pub mod factory;
pub mod http_client;
pub mod openai;
pub mod pricing;
pub mod provider;
pub mod sse;
pub mod stream;
pub mod streaming_adapters;
pub mod types;

// Re-export main types
pub use anthropic::AnthropicProvider;
pub use factory::{create_provider, ProviderFactory};
pub use http_client::build_http_client;
pub use openai::OpenAIProvider;
pub use pricing::{ModelPricing, PricingTable};
pub use provider::LlmProvider;
pub use stream::{ProviderStream, StreamAbortHandle, DEFAULT_STREAM_BUFFER};
pub use types::*;

// Re-export streaming adapters
pub use streaming_adapters::{ClaudeApiAdapter, OpenAIAdapter};
