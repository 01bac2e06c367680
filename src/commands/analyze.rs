//! Analyze Command
//!
//! Streams one analysis to a writer, one encoded event per frame.

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWrite;

use anr_analyzer_core::AnalysisRequest;

use crate::services::analysis::AnalysisStatus;
use crate::services::events::{JsonLinesSink, OutputFormat};
use crate::state::AppState;
use crate::utils::error::AppResult;

/// How a streamed analysis ended
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeOutcome {
    pub analysis_id: String,
    pub status: AnalysisStatus,
}

/// Run `request` and write its events to `writer` in `format`.
///
/// Rejections (empty content, unavailable provider) are returned as errors
/// before anything is written.
pub async fn analyze<W>(
    state: &AppState,
    request: AnalysisRequest,
    writer: W,
    format: OutputFormat,
) -> AppResult<AnalyzeOutcome>
where
    W: AsyncWrite + Unpin + Send,
{
    let service = state.analysis_service().await?;
    let mut sink = JsonLinesSink::with_format(writer, format);
    let (analysis_id, status) = service.run_to_sink(request, &mut sink).await?;
    Ok(AnalyzeOutcome {
        analysis_id,
        status,
    })
}
