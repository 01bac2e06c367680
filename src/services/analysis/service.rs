//! Analysis Service
//!
//! Boundary of the analysis pipeline: start, cancel, query and estimate.
//! Requests are validated, chunked and given a provider before any event is
//! emitted; those failures are returned to the caller. Everything after
//! `start` is reported through the event sequence.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use anr_analyzer_core::{
    AnalysisError, AnalysisMode, AnalysisRequest, AnalysisResult, CancelReason, EventSink,
    ProviderType,
};
use anr_analyzer_llm::{PricingTable, ProviderFactory, DEFAULT_STREAM_BUFFER};

use super::coordinator::{AnalysisCoordinator, CoordinatorSettings};
use super::health::{check_provider, ProviderHealth, HEALTH_CHECK_MODE};
use super::results::{result_key, ResultCache};
use super::status::{AnalysisStatus, StatusBoard};
use super::usage::estimate_tokens;
use crate::models::settings::AppConfig;
use crate::services::cancellation::CancellationRegistry;
use crate::services::chunker::ChunkPlan;
use crate::services::events::{event_channel, AnalysisEventStream};

/// Share of input tokens assumed for output in a pre-flight estimate.
const ESTIMATED_OUTPUT_RATIO: f64 = 0.3;

/// Pre-flight cost estimate for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub provider: ProviderType,
    pub mode: AnalysisMode,
    pub model: String,
    pub total_chunks: usize,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub estimated_cost: f64,
}

/// Starts and tracks analyses.
pub struct AnalysisService {
    config: AppConfig,
    factory: Arc<dyn ProviderFactory>,
    registry: Arc<CancellationRegistry>,
    status: StatusBoard,
    results: ResultCache,
    pricing: PricingTable,
}

impl AnalysisService {
    /// Create a service with its own registry.
    pub fn new(config: AppConfig, factory: Arc<dyn ProviderFactory>) -> Self {
        Self::with_registry(config, factory, Arc::new(CancellationRegistry::new()))
    }

    /// Create a service sharing an existing registry.
    pub fn with_registry(
        config: AppConfig,
        factory: Arc<dyn ProviderFactory>,
        registry: Arc<CancellationRegistry>,
    ) -> Self {
        let status = StatusBoard::new(
            Duration::from_secs(config.status_retention_secs),
            config.status_capacity,
        );
        let results = ResultCache::new(
            Duration::from_secs(config.result_cache_ttl_secs),
            config.result_cache_capacity,
        );
        Self::from_parts(config, factory, registry, status, results)
    }

    fn from_parts(
        config: AppConfig,
        factory: Arc<dyn ProviderFactory>,
        registry: Arc<CancellationRegistry>,
        status: StatusBoard,
        results: ResultCache,
    ) -> Self {
        let pricing = PricingTable::with_overrides(&config.pricing);
        Self {
            config,
            factory,
            registry,
            status,
            results,
            pricing,
        }
    }

    /// Build a service for a new configuration that keeps this one's
    /// registry, recorded statuses and cached results, so analyses still
    /// running here stay cancellable and queryable.
    pub fn reconfigure(&self, config: AppConfig, factory: Arc<dyn ProviderFactory>) -> Self {
        let results = if config.result_cache_capacity == 0 {
            ResultCache::disabled()
        } else {
            self.results.clone()
        };
        Self::from_parts(
            config,
            factory,
            Arc::clone(&self.registry),
            self.status.clone(),
            results,
        )
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CancellationRegistry> {
        &self.registry
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    /// Start an analysis under a fresh id.
    ///
    /// Returns the id and the lazy event sequence. The analysis runs on its
    /// own task; dropping the sequence cancels it.
    pub fn start_analysis(
        &self,
        request: AnalysisRequest,
    ) -> AnalysisResult<(String, AnalysisEventStream)> {
        let analysis_id = Uuid::new_v4().to_string();
        let events = self.start_analysis_with_id(&analysis_id, request)?;
        Ok((analysis_id, events))
    }

    /// Start an analysis under a caller-chosen id.
    ///
    /// Fails with `DuplicateAnalysisId` while another analysis holds the id.
    pub fn start_analysis_with_id(
        &self,
        analysis_id: &str,
        request: AnalysisRequest,
    ) -> AnalysisResult<AnalysisEventStream> {
        let coordinator = self.prepare(analysis_id, request)?;
        let (mut sink, events) = event_channel(analysis_id, self.config.event_buffer);
        tokio::spawn(async move {
            coordinator.run(&mut sink).await;
        });
        Ok(events)
    }

    /// Run an analysis on the current task, emitting into `sink`.
    pub async fn run_to_sink<S: EventSink + ?Sized>(
        &self,
        request: AnalysisRequest,
        sink: &mut S,
    ) -> AnalysisResult<(String, AnalysisStatus)> {
        let analysis_id = Uuid::new_v4().to_string();
        let coordinator = self.prepare(&analysis_id, request)?;
        let status = coordinator.run(sink).await;
        Ok((analysis_id, status))
    }

    /// Validate, chunk, pick the provider, then register the token.
    ///
    /// The token is registered last so a rejection leaves nothing behind.
    pub fn prepare(
        &self,
        analysis_id: &str,
        request: AnalysisRequest,
    ) -> AnalysisResult<AnalysisCoordinator> {
        if analysis_id.trim().is_empty() {
            return Err(AnalysisError::validation("analysis id cannot be empty"));
        }
        let request = request.with_default_budget(self.config.default_budget_usd);
        if let Some(budget) = request.budget_usd() {
            if !budget.is_finite() || budget < 0.0 {
                return Err(AnalysisError::validation(format!(
                    "budget must be non-negative, got {}",
                    budget
                )));
            }
        }
        if self.registry.contains(analysis_id) {
            return Err(AnalysisError::DuplicateAnalysisId(analysis_id.to_string()));
        }

        let profile = self.config.mode_profile(request.mode());
        let plan = ChunkPlan::new(request.content(), profile.chunk_size_chars)?;

        let provider = self
            .factory
            .create(request.provider(), request.mode())
            .map_err(|e| AnalysisError::provider_unavailable(e.to_string()))?;
        let pricing = self.pricing.price_for(provider.model());
        let cache_key = result_key(
            plan.content(),
            request.category(),
            request.mode(),
            provider.model(),
        );

        let token = self.registry.create(analysis_id)?;
        self.status.forget(analysis_id);

        tracing::debug!(
            analysis_id,
            total_chunks = plan.len(),
            budget_usd = request.budget_usd(),
            "analysis prepared"
        );

        Ok(AnalysisCoordinator::new(
            request,
            plan,
            CoordinatorSettings {
                profile,
                check_interval_chars: self.config.check_interval_chars,
                stream_buffer: DEFAULT_STREAM_BUFFER,
            },
            provider,
            pricing,
            token,
            Arc::clone(&self.registry),
            self.status.clone(),
        )
        .with_result_cache(self.results.clone(), cache_key))
    }

    /// Request cancellation. `false` means not found or already finished.
    pub fn cancel_analysis(&self, analysis_id: &str, reason: Option<&str>) -> bool {
        let cancelled = self.registry.cancel(analysis_id);
        tracing::info!(
            analysis_id,
            reason = reason.unwrap_or("none given"),
            cancelled,
            "cancel requested"
        );
        cancelled
    }

    pub fn query_status(&self, analysis_id: &str) -> AnalysisStatus {
        self.status.query(&self.registry, analysis_id)
    }

    /// Estimate tokens and cost without calling a provider.
    pub fn estimate_cost(&self, request: &AnalysisRequest) -> AnalysisResult<CostEstimate> {
        let profile = self.config.mode_profile(request.mode());
        let plan = ChunkPlan::new(request.content(), profile.chunk_size_chars)?;
        let model = self.config.model_for(request.provider(), request.mode());

        let input_tokens = estimate_tokens(plan.content().chars().count());
        let output_tokens = (input_tokens as f64 * ESTIMATED_OUTPUT_RATIO).round() as u64;
        let estimated_cost = self.pricing.price_for(&model).cost(input_tokens, output_tokens);

        Ok(CostEstimate {
            provider: request.provider(),
            mode: request.mode(),
            model,
            total_chunks: plan.len(),
            input_tokens,
            output_tokens,
            estimated_cost,
        })
    }

    /// Health-check every provider with the model it would use for a quick analysis.
    pub async fn check_providers(&self) -> Vec<ProviderHealth> {
        let checks = ProviderType::ALL.into_iter().map(|provider| {
            let model = self.config.model_for(provider, HEALTH_CHECK_MODE);
            check_provider(self.factory.as_ref(), provider, model)
        });
        join_all(checks).await
    }

    /// Cancel every running analysis for process shutdown.
    pub fn shutdown(&self) -> usize {
        self.registry.cancel_all(CancelReason::SystemShutdown)
    }
}

impl std::fmt::Debug for AnalysisService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisService")
            .field("active", &self.registry.active_count())
            .field("status", &self.status)
            .finish()
    }
}
