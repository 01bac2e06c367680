//! ANR Analyzer - Rust Backend Library
//!
//! Streams AI analysis of Android ANR traces and native tombstones with
//! cooperative cancellation. It includes:
//! - Command handlers used by the CLI
//! - Business logic services (chunking, cancellation, coordination, events)
//! - Storage layer (JSON config)
//! - Data models and utilities

pub mod commands;
pub mod models;
pub mod services;
pub mod state;
pub mod storage;
pub mod utils;

// Re-export commonly used items from commands
pub use commands::{
    analyze, estimate, get_settings, health, reset_settings, AnalyzeOutcome, HealthReport,
};
pub use models::settings::AppConfig;
pub use services::analysis::{AnalysisService, AnalysisStatus, CostEstimate, HttpProviderFactory};
pub use services::cancellation::{CancellationRegistry, CancellationToken};
pub use services::events::{AnalysisEventStream, OutputFormat};
pub use state::AppState;
pub use utils::error::{AppError, AppResult};
