//! Settings Models
//!
//! Analyzer configuration stored in config.json.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use anr_analyzer_core::{AnalysisMode, ModeProfile, ProviderType};
use anr_analyzer_llm::{ModelPricing, ProviderConfig};

/// Environment variable holding the Anthropic key
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
/// Environment variable holding the OpenAI key
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Model used by `provider` for `mode` when the config names none.
pub fn default_model_for(provider: ProviderType, mode: AnalysisMode) -> &'static str {
    match (provider, mode) {
        (ProviderType::Anthropic, AnalysisMode::Quick) => "claude-3-5-haiku-20241022",
        (ProviderType::Anthropic, AnalysisMode::Intelligent)
        | (ProviderType::Anthropic, AnalysisMode::LargeFile) => "claude-sonnet-4-20250514",
        (ProviderType::Anthropic, AnalysisMode::MaxToken) => "claude-opus-4-20250514",
        (ProviderType::OpenAI, AnalysisMode::Quick) => "gpt-4o-mini",
        (ProviderType::OpenAI, AnalysisMode::Intelligent)
        | (ProviderType::OpenAI, AnalysisMode::LargeFile) => "gpt-4o",
        (ProviderType::OpenAI, AnalysisMode::MaxToken) => "gpt-4-turbo",
    }
}

/// Per-provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// API key; the environment is consulted when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Endpoint override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Model per analysis mode; missing modes use the built-in choice
    #[serde(default)]
    pub models: BTreeMap<AnalysisMode, String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_temperature() -> f32 {
    0.3
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            models: BTreeMap::new(),
            temperature: default_temperature(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Application configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chunk size, output tokens, timeout and fan-out per mode
    #[serde(default)]
    pub modes: BTreeMap<AnalysisMode, ModeProfile>,
    /// Generated characters between cancellation/budget checks
    #[serde(default = "default_check_interval_chars")]
    pub check_interval_chars: usize,
    /// Budget ceiling applied when a request carries none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_budget_usd: Option<f64>,
    /// Capacity of the per-analysis event channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
    /// How long terminal statuses stay queryable
    #[serde(default = "default_status_retention_secs")]
    pub status_retention_secs: u64,
    /// Maximum number of retained terminal statuses
    #[serde(default = "default_status_capacity")]
    pub status_capacity: u64,
    /// Completed analyses kept for replay; 0 disables the result cache
    #[serde(default = "default_result_cache_capacity")]
    pub result_cache_capacity: u64,
    /// How long a completed analysis stays replayable
    #[serde(default = "default_result_cache_ttl_secs")]
    pub result_cache_ttl_secs: u64,
    #[serde(default)]
    pub providers: BTreeMap<ProviderType, ProviderSettings>,
    /// Pricing overrides keyed by model name
    #[serde(default)]
    pub pricing: HashMap<String, ModelPricing>,
}

fn default_check_interval_chars() -> usize {
    100
}

fn default_event_buffer() -> usize {
    256
}

fn default_status_retention_secs() -> u64 {
    3600
}

fn default_status_capacity() -> u64 {
    10_000
}

fn default_result_cache_capacity() -> u64 {
    100
}

fn default_result_cache_ttl_secs() -> u64 {
    24 * 3600
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            modes: AnalysisMode::ALL
                .iter()
                .map(|mode| (*mode, ModeProfile::defaults_for(*mode)))
                .collect(),
            check_interval_chars: default_check_interval_chars(),
            default_budget_usd: None,
            event_buffer: default_event_buffer(),
            status_retention_secs: default_status_retention_secs(),
            status_capacity: default_status_capacity(),
            result_cache_capacity: default_result_cache_capacity(),
            result_cache_ttl_secs: default_result_cache_ttl_secs(),
            providers: [ProviderType::Anthropic, ProviderType::OpenAI]
                .into_iter()
                .map(|p| (p, ProviderSettings::default()))
                .collect(),
            pricing: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Profile for `mode`, falling back to the built-in defaults.
    pub fn mode_profile(&self, mode: AnalysisMode) -> ModeProfile {
        self.modes
            .get(&mode)
            .copied()
            .unwrap_or_else(|| ModeProfile::defaults_for(mode))
    }

    pub fn provider_settings(&self, provider: ProviderType) -> ProviderSettings {
        self.providers.get(&provider).cloned().unwrap_or_default()
    }

    /// Model `provider` runs for `mode`.
    pub fn model_for(&self, provider: ProviderType, mode: AnalysisMode) -> String {
        self.providers
            .get(&provider)
            .and_then(|s| s.models.get(&mode).cloned())
            .unwrap_or_else(|| default_model_for(provider, mode).to_string())
    }

    /// Resolve the client configuration for one (provider, mode) pair.
    pub fn provider_config(&self, provider: ProviderType, mode: AnalysisMode) -> ProviderConfig {
        let settings = self.provider_settings(provider);
        ProviderConfig {
            provider,
            api_key: settings.api_key,
            base_url: settings.base_url,
            model: self.model_for(provider, mode),
            max_tokens: self.mode_profile(mode).max_output_tokens,
            temperature: settings.temperature,
            connect_timeout_secs: settings.connect_timeout_secs,
        }
    }

    /// Fill unset API keys from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_overrides_from(|key| std::env::var(key).ok());
    }

    /// Fill unset API keys using `lookup` (injectable for tests).
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for (provider, env_key) in [
            (ProviderType::Anthropic, ANTHROPIC_API_KEY_ENV),
            (ProviderType::OpenAI, OPENAI_API_KEY_ENV),
        ] {
            let settings = self.providers.entry(provider).or_default();
            if settings.api_key.is_none() {
                settings.api_key = lookup(env_key).filter(|v| !v.trim().is_empty());
            }
        }
    }

    /// Copy with API keys masked, for display.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for settings in copy.providers.values_mut() {
            if settings.api_key.is_some() {
                settings.api_key = Some("********".to_string());
            }
        }
        copy
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        for (mode, profile) in &self.modes {
            profile
                .validate()
                .map_err(|e| format!("mode {}: {}", mode, e))?;
        }

        if self.check_interval_chars == 0 {
            return Err("check_interval_chars must be at least 1".to_string());
        }

        if self.event_buffer == 0 {
            return Err("event_buffer must be at least 1".to_string());
        }

        if self.status_capacity == 0 {
            return Err("status_capacity must be at least 1".to_string());
        }

        if self.result_cache_capacity > 0 && self.result_cache_ttl_secs == 0 {
            return Err("result_cache_ttl_secs must be at least 1".to_string());
        }

        if let Some(budget) = self.default_budget_usd {
            if !budget.is_finite() || budget < 0.0 {
                return Err(format!("default_budget_usd must be non-negative, got {}", budget));
            }
        }

        for (provider, settings) in &self.providers {
            if !(0.0..=2.0).contains(&settings.temperature) {
                return Err(format!(
                    "{}: temperature must be between 0.0 and 2.0, got {}",
                    provider, settings.temperature
                ));
            }
            if settings.connect_timeout_secs == 0 {
                return Err(format!("{}: connect_timeout_secs must be at least 1", provider));
            }
        }

        for (model, price) in &self.pricing {
            if price.input_per_1k < 0.0 || price.output_per_1k < 0.0 {
                return Err(format!("pricing for {} cannot be negative", model));
            }
        }

        Ok(())
    }
}
