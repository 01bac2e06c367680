//! Analysis Request Types
//!
//! The immutable request value handed to the coordinator, plus the
//! enumerations that select log category, analysis mode, and provider.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of Android crash log being analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogCategory {
    /// Application Not Responding trace (`/data/anr/traces.txt`)
    Anr,
    /// Native crash tombstone (`/data/tombstones/tombstone_NN`)
    Tombstone,
}

impl LogCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogCategory::Anr => "anr",
            LogCategory::Tombstone => "tombstone",
        }
    }
}

impl fmt::Display for LogCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anr" => Ok(LogCategory::Anr),
            "tombstone" => Ok(LogCategory::Tombstone),
            other => Err(format!("Invalid log type: {}", other)),
        }
    }
}

/// Analysis depth. Each mode fixes a chunk size, output token budget and timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Quick,
    Intelligent,
    LargeFile,
    MaxToken,
}

impl AnalysisMode {
    pub const ALL: [AnalysisMode; 4] = [
        AnalysisMode::Quick,
        AnalysisMode::Intelligent,
        AnalysisMode::LargeFile,
        AnalysisMode::MaxToken,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::Quick => "quick",
            AnalysisMode::Intelligent => "intelligent",
            AnalysisMode::LargeFile => "large_file",
            AnalysisMode::MaxToken => "max_token",
        }
    }
}

impl Default for AnalysisMode {
    fn default() -> Self {
        Self::Intelligent
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "quick" => Ok(AnalysisMode::Quick),
            "intelligent" => Ok(AnalysisMode::Intelligent),
            "large_file" => Ok(AnalysisMode::LargeFile),
            "max_token" => Ok(AnalysisMode::MaxToken),
            other => Err(format!("Invalid analysis mode: {}", other)),
        }
    }
}

/// Supported text-generation providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Anthropic,
    OpenAI,
}

impl ProviderType {
    pub const ALL: [ProviderType; 2] = [ProviderType::Anthropic, ProviderType::OpenAI];
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderType::Anthropic => write!(f, "anthropic"),
            ProviderType::OpenAI => write!(f, "openai"),
        }
    }
}

impl FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderType::Anthropic),
            "openai" => Ok(ProviderType::OpenAI),
            other => Err(format!("Unknown provider: {}", other)),
        }
    }
}

/// Per-mode limits consumed by the chunker and the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeProfile {
    /// Maximum characters per chunk. Content at or below this size is one chunk.
    pub chunk_size_chars: usize,
    /// Output token budget for each provider call
    pub max_output_tokens: u32,
    /// Wall-clock limit for the whole analysis
    pub timeout_secs: u64,
    /// Number of chunk streams that may be open at once (read-ahead)
    #[serde(default = "default_parallel_chunks")]
    pub max_parallel_chunks: usize,
}

fn default_parallel_chunks() -> usize {
    1
}

impl ModeProfile {
    /// Built-in profile for a mode.
    pub fn defaults_for(mode: AnalysisMode) -> Self {
        match mode {
            AnalysisMode::Quick => Self {
                chunk_size_chars: 50_000,
                max_output_tokens: 4_096,
                timeout_secs: 120,
                max_parallel_chunks: 1,
            },
            AnalysisMode::Intelligent => Self {
                chunk_size_chars: 150_000,
                max_output_tokens: 8_192,
                timeout_secs: 300,
                max_parallel_chunks: 1,
            },
            AnalysisMode::LargeFile => Self {
                chunk_size_chars: 200_000,
                max_output_tokens: 8_192,
                timeout_secs: 900,
                max_parallel_chunks: 2,
            },
            AnalysisMode::MaxToken => Self {
                chunk_size_chars: 180_000,
                max_output_tokens: 16_000,
                timeout_secs: 600,
                max_parallel_chunks: 1,
            },
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size_chars == 0 {
            return Err("chunk_size_chars must be greater than 0".to_string());
        }
        if self.max_output_tokens == 0 {
            return Err("max_output_tokens must be greater than 0".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("timeout_secs must be greater than 0".to_string());
        }
        if self.max_parallel_chunks == 0 || self.max_parallel_chunks > 4 {
            return Err("max_parallel_chunks must be between 1 and 4".to_string());
        }
        Ok(())
    }
}

/// One request to analyze a log. Created once per analysis and never mutated.
///
/// Construct through [`crate::AnalysisRequestBuilder`] or [`AnalysisRequest::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub(crate) content: String,
    pub(crate) category: LogCategory,
    pub(crate) mode: AnalysisMode,
    pub(crate) provider: ProviderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) budget_usd: Option<f64>,
}

impl AnalysisRequest {
    /// Create a request without a budget ceiling.
    pub fn new(
        content: impl Into<String>,
        category: LogCategory,
        mode: AnalysisMode,
        provider: ProviderType,
    ) -> Self {
        Self {
            content: content.into(),
            category,
            mode,
            provider,
            budget_usd: None,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn category(&self) -> LogCategory {
        self.category
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    pub fn provider(&self) -> ProviderType {
        self.provider
    }

    pub fn budget_usd(&self) -> Option<f64> {
        self.budget_usd
    }

    /// Copy of this request with a budget applied if none was set.
    pub fn with_default_budget(mut self, budget_usd: Option<f64>) -> Self {
        if self.budget_usd.is_none() {
            self.budget_usd = budget_usd;
        }
        self
    }
}
