//! Analysis Status
//!
//! Out-of-band status lookup. Running analyses are answered from the
//! cancellation registry; terminal outcomes are kept for a bounded time in a
//! TTL cache so late polls still see how an analysis ended.

use std::fmt;
use std::time::Duration;

use mini_moka::sync::Cache;
use serde::{Deserialize, Serialize};

use crate::services::cancellation::CancellationRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
    NotFound,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Running => "running",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Cancelled => "cancelled",
            AnalysisStatus::Failed => "failed",
            AnalysisStatus::NotFound => "not_found",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AnalysisStatus::Completed | AnalysisStatus::Cancelled | AnalysisStatus::Failed
        )
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recent terminal outcomes, keyed by analysis id.
#[derive(Clone)]
pub struct StatusBoard {
    finished: Cache<String, AnalysisStatus>,
}

impl StatusBoard {
    pub fn new(retention: Duration, capacity: u64) -> Self {
        Self {
            finished: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(retention)
                .build(),
        }
    }

    /// Record how an analysis ended. Non-terminal statuses are ignored.
    pub fn record(&self, analysis_id: &str, status: AnalysisStatus) {
        if status.is_terminal() {
            self.finished.insert(analysis_id.to_string(), status);
        }
    }

    /// Forget a previous outcome (the id is being reused).
    pub fn forget(&self, analysis_id: &str) {
        self.finished.invalidate(&analysis_id.to_string());
    }

    pub fn terminal_status(&self, analysis_id: &str) -> Option<AnalysisStatus> {
        self.finished.get(&analysis_id.to_string())
    }

    /// Running if registered, else the retained outcome, else NotFound.
    pub fn query(&self, registry: &CancellationRegistry, analysis_id: &str) -> AnalysisStatus {
        if registry.contains(analysis_id) {
            return AnalysisStatus::Running;
        }
        self.terminal_status(analysis_id)
            .unwrap_or(AnalysisStatus::NotFound)
    }
}

impl fmt::Debug for StatusBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusBoard")
            .field("entries", &self.finished.entry_count())
            .finish()
    }
}
