//! Stream Event Types
//!
//! Two event vocabularies live here:
//!
//! - [`StreamEvent`]: the consumer-facing protocol of one analysis. Exactly
//!   one `start` first, exactly one terminal event (`complete`, `cancelled`
//!   or `error`) last.
//! - [`UnifiedStreamEvent`]: what provider adapters normalize raw SSE lines
//!   into before the coordinator consumes them.

use serde::{Deserialize, Serialize};

use crate::error::ErrorKind;

/// Severity of a feedback message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackLevel {
    Info,
    Warning,
    Error,
}

/// Event emitted by the analysis coordinator.
///
/// Serialized with a `type` discriminator, one event per transport frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// First event of every analysis
    Start { analysis_id: String },

    /// Generated text fragment
    Content { text: String },

    /// Progress and running token counts
    Progress {
        percentage: f64,
        current_chunk: usize,
        total_chunks: usize,
        input_tokens: u64,
        output_tokens: u64,
    },

    /// Out-of-band message for the user (content warnings, chunk plan)
    Feedback { level: FeedbackLevel, message: String },

    /// Terminal: every chunk was analyzed
    Complete {
        total_tokens: u64,
        total_cost: f64,
        duration_seconds: f64,
    },

    /// Terminal: the analysis was cancelled by a caller or by shutdown
    Cancelled {},

    /// Terminal: the analysis failed
    Error { kind: ErrorKind, message: String },
}

impl StreamEvent {
    pub fn start(analysis_id: impl Into<String>) -> Self {
        Self::Start {
            analysis_id: analysis_id.into(),
        }
    }

    pub fn content(text: impl Into<String>) -> Self {
        Self::Content { text: text.into() }
    }

    pub fn feedback(level: FeedbackLevel, message: impl Into<String>) -> Self {
        Self::Feedback {
            level,
            message: message.into(),
        }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error {
            kind,
            message: message.into(),
        }
    }

    /// The serialized `type` discriminator.
    pub fn event_type(&self) -> &'static str {
        match self {
            StreamEvent::Start { .. } => "start",
            StreamEvent::Content { .. } => "content",
            StreamEvent::Progress { .. } => "progress",
            StreamEvent::Feedback { .. } => "feedback",
            StreamEvent::Complete { .. } => "complete",
            StreamEvent::Cancelled {} => "cancelled",
            StreamEvent::Error { .. } => "error",
        }
    }

    /// Whether this event ends the sequence.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamEvent::Complete { .. } | StreamEvent::Cancelled {} | StreamEvent::Error { .. }
        )
    }
}

/// Provider-agnostic event produced by a [`StreamAdapter`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UnifiedStreamEvent {
    /// Text content delta from the model
    TextDelta { content: String },

    /// Token usage snapshot. Counts are cumulative for the current call;
    /// a zero means "not reported in this snapshot".
    Usage { input_tokens: u32, output_tokens: u32 },

    /// Error reported in-band by the provider
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },

    /// Stream complete
    Complete {
        #[serde(skip_serializing_if = "Option::is_none")]
        stop_reason: Option<String>,
    },
}

/// Errors that can occur during stream adaptation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AdapterError {
    /// Invalid format that couldn't be parsed
    InvalidFormat(String),
    /// JSON/data parsing error
    ParseError(String),
}

impl std::fmt::Display for AdapterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdapterError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            AdapterError::ParseError(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for AdapterError {}

/// Converts one provider's raw stream lines into [`UnifiedStreamEvent`]s.
pub trait StreamAdapter: Send + Sync {
    /// Returns the provider name for logging and identification.
    fn provider_name(&self) -> &'static str;

    /// Adapt a raw stream line to unified events.
    ///
    /// A single input line may produce zero, one, or multiple events.
    fn adapt(&mut self, input: &str) -> Result<Vec<UnifiedStreamEvent>, AdapterError>;

    /// Reset adapter state for a new stream.
    fn reset(&mut self) {}
}
