//! Analysis Error Types
//!
//! The error taxonomy of the analysis pipeline. Errors raised before an
//! analysis emits its `start` event are returned to the caller; everything
//! after that point is reported as a terminal `error` event carrying an
//! [`ErrorKind`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a cancellation token was flipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// A caller asked for the analysis to stop
    UserCancelled,
    /// The mode's wall-clock limit elapsed
    Timeout,
    /// Accumulated cost passed the request's ceiling
    BudgetExceeded,
    /// The process is shutting down
    SystemShutdown,
}

impl CancelReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelReason::UserCancelled => "user_cancelled",
            CancelReason::Timeout => "timeout",
            CancelReason::BudgetExceeded => "budget_exceeded",
            CancelReason::SystemShutdown => "system_shutdown",
        }
    }

    /// Whether this reason ends the analysis with `cancelled` rather than `error`.
    pub fn is_user_visible_cancel(&self) -> bool {
        matches!(self, CancelReason::UserCancelled | CancelReason::SystemShutdown)
    }
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discriminator carried by terminal `error` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ProviderFailure,
    BudgetExceeded,
    Timeout,
    Internal,
}

/// Errors produced by the analysis pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// An active analysis already owns this identifier
    #[error("Duplicate analysis id: {0}")]
    DuplicateAnalysisId(String),

    /// Content could not be split (empty or invalid)
    #[error("Chunking error: {0}")]
    Chunking(String),

    /// Malformed request
    #[error("Validation error: {0}")]
    Validation(String),

    /// No provider is configured for the requested provider type
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The provider raised or returned malformed output mid-stream
    #[error("Provider failure: {0}")]
    ProviderFailure(String),

    /// Internal unwind signal for an aborted consumption loop
    #[error("Stream aborted: {0}")]
    StreamAborted(CancelReason),

    /// Accumulated cost passed the ceiling
    #[error("Budget exceeded: ${spent:.4} > ${ceiling:.4}")]
    BudgetExceeded { spent: f64, ceiling: f64 },

    /// The mode's wall-clock limit elapsed
    #[error("Analysis timeout after {seconds} seconds")]
    Timeout { seconds: u64 },
}

/// Result type alias for analysis errors
pub type AnalysisResult<T> = Result<T, AnalysisError>;

impl AnalysisError {
    /// Create a chunking error
    pub fn chunking(msg: impl Into<String>) -> Self {
        Self::Chunking(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a provider failure
    pub fn provider_failure(msg: impl Into<String>) -> Self {
        Self::ProviderFailure(msg.into())
    }

    /// Create a provider-unavailable error
    pub fn provider_unavailable(msg: impl Into<String>) -> Self {
        Self::ProviderUnavailable(msg.into())
    }

    /// Whether the error is raised before any event is emitted.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AnalysisError::DuplicateAnalysisId(_)
                | AnalysisError::Chunking(_)
                | AnalysisError::Validation(_)
                | AnalysisError::ProviderUnavailable(_)
        )
    }

    /// Map to the kind serialized in terminal `error` events.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::ProviderFailure(_) => ErrorKind::ProviderFailure,
            AnalysisError::BudgetExceeded { .. } => ErrorKind::BudgetExceeded,
            AnalysisError::Timeout { .. } => ErrorKind::Timeout,
            AnalysisError::StreamAborted(CancelReason::Timeout) => ErrorKind::Timeout,
            AnalysisError::StreamAborted(CancelReason::BudgetExceeded) => {
                ErrorKind::BudgetExceeded
            }
            _ => ErrorKind::Internal,
        }
    }
}

/// Convert AnalysisError to a string
impl From<AnalysisError> for String {
    fn from(err: AnalysisError) -> String {
        err.to_string()
    }
}
