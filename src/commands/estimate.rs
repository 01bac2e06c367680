//! Estimate Command

use anr_analyzer_core::AnalysisRequest;

use crate::services::analysis::CostEstimate;
use crate::state::AppState;
use crate::utils::error::AppResult;

/// Estimate tokens and cost for `request` without calling a provider.
pub async fn estimate(state: &AppState, request: &AnalysisRequest) -> AppResult<CostEstimate> {
    let service = state.analysis_service().await?;
    Ok(service.estimate_cost(request)?)
}
