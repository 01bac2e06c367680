//! Builder Pattern for Analysis Requests
//!
//! Fluent construction of [`AnalysisRequest`] with validation at `build()`.
//!
//! ```ignore
//! let request = AnalysisRequestBuilder::new(content)
//!     .category(LogCategory::Tombstone)
//!     .mode(AnalysisMode::LargeFile)
//!     .provider(ProviderType::OpenAI)
//!     .budget_usd(1.5)
//!     .build()?;
//! ```

use crate::analysis::{AnalysisMode, AnalysisRequest, LogCategory, ProviderType};
use crate::error::AnalysisError;

/// Builder for [`AnalysisRequest`].
#[derive(Debug, Clone)]
pub struct AnalysisRequestBuilder {
    content: String,
    category: LogCategory,
    mode: AnalysisMode,
    provider: ProviderType,
    budget_usd: Option<f64>,
}

impl AnalysisRequestBuilder {
    /// Start a builder for the given content.
    ///
    /// Defaults: ANR category, intelligent mode, Anthropic, no budget.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            category: LogCategory::Anr,
            mode: AnalysisMode::default(),
            provider: ProviderType::Anthropic,
            budget_usd: None,
        }
    }

    pub fn category(mut self, category: LogCategory) -> Self {
        self.category = category;
        self
    }

    pub fn mode(mut self, mode: AnalysisMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn provider(mut self, provider: ProviderType) -> Self {
        self.provider = provider;
        self
    }

    /// Set a budget ceiling in USD.
    pub fn budget_usd(mut self, budget: f64) -> Self {
        self.budget_usd = Some(budget);
        self
    }

    /// Optionally set a budget ceiling.
    pub fn maybe_budget_usd(mut self, budget: Option<f64>) -> Self {
        self.budget_usd = budget;
        self
    }

    /// Validate and produce the request.
    ///
    /// Empty (or whitespace-only) content is a chunking error; a negative or
    /// non-finite budget is a validation error.
    pub fn build(self) -> Result<AnalysisRequest, AnalysisError> {
        if self.content.trim().is_empty() {
            return Err(AnalysisError::chunking("content is empty"));
        }
        if let Some(budget) = self.budget_usd {
            if !budget.is_finite() || budget < 0.0 {
                return Err(AnalysisError::validation(format!(
                    "budget must be a non-negative amount, got {}",
                    budget
                )));
            }
        }
        Ok(AnalysisRequest {
            content: self.content,
            category: self.category,
            mode: self.mode,
            provider: self.provider,
            budget_usd: self.budget_usd,
        })
    }
}
