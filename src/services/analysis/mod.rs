//! Analysis Pipeline
//!
//! Coordinator, usage accounting, status tracking, result caching, provider
//! health and the service facade that ties them to the cancellation registry
//! and provider factory.

pub mod coordinator;
pub mod health;
pub mod providers;
pub mod results;
pub mod service;
pub mod status;
pub mod usage;

pub use coordinator::{AnalysisCoordinator, CoordinatorSettings};
pub use health::{HealthState, ProviderHealth};
pub use providers::HttpProviderFactory;
pub use results::{result_key, CachedResult, ResultCache};
pub use service::{AnalysisService, CostEstimate};
pub use status::{AnalysisStatus, StatusBoard};
pub use usage::{estimate_tokens, UsageAccumulator};
