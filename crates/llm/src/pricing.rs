//! Model Pricing
//!
//! Per-1k-token prices used for running cost accounting and pre-flight
//! estimates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Price of one model, in USD per 1,000 tokens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl ModelPricing {
    pub const fn new(input_per_1k: f64, output_per_1k: f64) -> Self {
        Self {
            input_per_1k,
            output_per_1k,
        }
    }

    /// Cost in USD for the given token counts.
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1000.0) * self.input_per_1k
            + (output_tokens as f64 / 1000.0) * self.output_per_1k
    }
}

/// Built-in prices.
const BUILTIN_PRICES: &[(&str, ModelPricing)] = &[
    ("claude-3-5-haiku-20241022", ModelPricing::new(0.00025, 0.00125)),
    ("claude-3-5-sonnet-20241022", ModelPricing::new(0.003, 0.015)),
    ("claude-sonnet-4-20250514", ModelPricing::new(0.005, 0.025)),
    ("claude-opus-4-20250514", ModelPricing::new(0.015, 0.075)),
    ("gpt-4o-mini", ModelPricing::new(0.00015, 0.0006)),
    ("gpt-4o", ModelPricing::new(0.0025, 0.01)),
    ("gpt-4-turbo", ModelPricing::new(0.01, 0.03)),
    ("gpt-3.5-turbo", ModelPricing::new(0.0005, 0.0015)),
];

/// Price charged for models missing from the table.
pub const FALLBACK_PRICING: ModelPricing = ModelPricing::new(0.003, 0.015);

/// Lookup table from model name to price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingTable {
    models: HashMap<String, ModelPricing>,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self {
            models: BUILTIN_PRICES
                .iter()
                .map(|(name, price)| (name.to_string(), *price))
                .collect(),
        }
    }
}

impl PricingTable {
    /// Built-in table with user overrides layered on top.
    pub fn with_overrides(overrides: &HashMap<String, ModelPricing>) -> Self {
        let mut table = Self::default();
        for (name, price) in overrides {
            table.models.insert(name.clone(), *price);
        }
        table
    }

    /// Exact match first, then the longest table entry the model name
    /// starts with (`gpt-4o-2024-08-06` prices as `gpt-4o`).
    pub fn lookup(&self, model: &str) -> Option<ModelPricing> {
        if let Some(price) = self.models.get(model) {
            return Some(*price);
        }
        self.models
            .iter()
            .filter(|(name, _)| model.starts_with(name.as_str()))
            .max_by_key(|(name, _)| name.len())
            .map(|(_, price)| *price)
    }

    /// Like [`lookup`](Self::lookup) but never fails.
    pub fn price_for(&self, model: &str) -> ModelPricing {
        self.lookup(model).unwrap_or_else(|| {
            tracing::debug!(model, "no pricing entry, using fallback");
            FALLBACK_PRICING
        })
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
