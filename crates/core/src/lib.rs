//! ANR Analyzer Core
//!
//! Foundational types shared by the analyzer workspace. This crate has no
//! dependency on provider clients, the async runtime, or configuration files.
//!
//! ## Module Organization
//!
//! - `analysis` - Request value and its enumerations (`AnalysisRequest`, `AnalysisMode`, ...)
//! - `builders` - Validating builder for `AnalysisRequest`
//! - `error` - Analysis error taxonomy (`AnalysisError`, `ErrorKind`)
//! - `streaming` - Consumer-facing `StreamEvent` protocol and provider-normalized events
//! - `sink` - `EventSink` trait through which events leave the coordinator
//!
//! ## Design Principles
//!
//! 1. **Zero external dependencies beyond serde/async-trait/thiserror**
//! 2. **Closed sum types** for every protocol that crosses a crate boundary
//! 3. **Unidirectional dependency** - this crate depends on nothing else in the workspace

pub mod analysis;
pub mod builders;
pub mod error;
pub mod sink;
pub mod streaming;

// ── Request Types ──────────────────────────────────────────────────────
pub use analysis::{AnalysisMode, AnalysisRequest, LogCategory, ModeProfile, ProviderType};

// ── Builders ───────────────────────────────────────────────────────────
pub use builders::AnalysisRequestBuilder;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{AnalysisError, AnalysisResult, CancelReason, ErrorKind};

// ── Event Protocol ─────────────────────────────────────────────────────
pub use sink::{EventSink, SinkClosed};
pub use streaming::{AdapterError, FeedbackLevel, StreamAdapter, StreamEvent, UnifiedStreamEvent};
