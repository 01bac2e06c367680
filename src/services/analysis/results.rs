//! Result Cache
//!
//! Completed analyses keyed by the preprocessed content and the settings that
//! shape the output (category, mode, model). A repeated request is replayed
//! from here instead of calling the provider again.

use std::time::Duration;

use mini_moka::sync::Cache;
use sha2::{Digest, Sha256};

use anr_analyzer_core::{AnalysisMode, LogCategory};

/// Output of one completed analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResult {
    pub text: String,
    pub total_tokens: u64,
    pub total_cost: f64,
}

/// Hex SHA-256 over category, mode, model and content.
pub fn result_key(content: &str, category: LogCategory, mode: AnalysisMode, model: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [category.as_str(), mode.as_str(), model] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Bounded TTL cache of completed analyses. Cloning shares the entries.
#[derive(Clone)]
pub struct ResultCache {
    entries: Option<Cache<String, CachedResult>>,
}

impl ResultCache {
    /// A `capacity` of 0 disables caching.
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        let entries = (capacity > 0).then(|| {
            Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build()
        });
        Self { entries }
    }

    pub fn disabled() -> Self {
        Self { entries: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    pub fn get(&self, key: &str) -> Option<CachedResult> {
        self.entries.as_ref()?.get(&key.to_string())
    }

    pub fn insert(&self, key: impl Into<String>, result: CachedResult) {
        if let Some(entries) = &self.entries {
            entries.insert(key.into(), result);
        }
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
