//! Analysis Coordinator
//!
//! Drives one analysis from `start` to its single terminal event:
//!
//! ```text
//! Created -> Streaming(chunk i of N) -> Completed | Cancelled | Failed
//! ```
//!
//! Chunks are consumed strictly in order. With `max_parallel_chunks > 1`
//! later chunk streams are opened ahead of time and buffer in their own
//! channels, but are only drained once every earlier chunk is done, so the
//! emitted sequence is identical to sequential mode.
//!
//! Cancellation is checked before each chunk and after every
//! `check_interval_chars` characters of output. The token's abort signal also
//! reaches every open provider stream directly, so a cancel lands even while
//! the coordinator is waiting on provider I/O. A chunk ends at the provider's
//! `Complete` event (or when its stream closes); once the last chunk has
//! ended the token is no longer consulted and the analysis completes.
//!
//! On every terminal path the outcome is recorded and the token released
//! before the terminal event is emitted.
//!
//! With a result cache attached, a hit replays the cached text as a single
//! `content` event after `start`; a completed run stores its text.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anr_analyzer_core::{
    AnalysisError, AnalysisRequest, CancelReason, EventSink, FeedbackLevel, LogCategory,
    ModeProfile, SinkClosed, StreamEvent, UnifiedStreamEvent,
};
use anr_analyzer_llm::{LlmError, LlmProvider, ModelPricing, ProviderStream};

use super::results::{CachedResult, ResultCache};
use super::status::{AnalysisStatus, StatusBoard};
use super::usage::UsageAccumulator;
use crate::services::cancellation::{check_cancelled, CancellationRegistry, CancellationToken};
use crate::services::chunker::ChunkPlan;
use crate::services::log_signature::check_signature;
use crate::services::prompt::build_chunk_request;

/// Why the chunk loop stopped early.
#[derive(Debug)]
enum Halt {
    Failed(AnalysisError),
    /// The consumer went away
    Disconnected,
}

impl From<AnalysisError> for Halt {
    fn from(err: AnalysisError) -> Self {
        Halt::Failed(err)
    }
}

impl From<SinkClosed> for Halt {
    fn from(_: SinkClosed) -> Self {
        Halt::Disconnected
    }
}

/// A provider stream opened for one chunk.
struct OpenChunk {
    index: usize,
    prompt_chars: usize,
    stream: ProviderStream,
}

/// Tunables for one coordinator run.
#[derive(Debug, Clone, Copy)]
pub struct CoordinatorSettings {
    pub profile: ModeProfile,
    pub check_interval_chars: usize,
    pub stream_buffer: usize,
}

/// Removes the token if the run is dropped before reaching cleanup.
struct RegistryGuard {
    registry: Arc<CancellationRegistry>,
    token: Arc<CancellationToken>,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        if self.registry.release(&self.token) {
            tracing::warn!(
                analysis_id = self.token.analysis_id(),
                "analysis dropped before reaching a terminal state"
            );
        }
    }
}

/// Runs one analysis. Consumed by [`AnalysisCoordinator::run`].
pub struct AnalysisCoordinator {
    request: AnalysisRequest,
    plan: ChunkPlan,
    settings: CoordinatorSettings,
    provider: Arc<dyn LlmProvider>,
    token: Arc<CancellationToken>,
    registry: Arc<CancellationRegistry>,
    status: StatusBoard,
    usage: UsageAccumulator,
    results: ResultCache,
    result_key: String,
    transcript: String,
    replayed: bool,
}

impl AnalysisCoordinator {
    /// `token` must already be registered in `registry`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        request: AnalysisRequest,
        plan: ChunkPlan,
        settings: CoordinatorSettings,
        provider: Arc<dyn LlmProvider>,
        pricing: ModelPricing,
        token: Arc<CancellationToken>,
        registry: Arc<CancellationRegistry>,
        status: StatusBoard,
    ) -> Self {
        Self {
            request,
            plan,
            settings,
            provider,
            token,
            registry,
            status,
            usage: UsageAccumulator::new(pricing),
            results: ResultCache::disabled(),
            result_key: String::new(),
            transcript: String::new(),
            replayed: false,
        }
    }

    /// Replay from and store into `results` under `key`.
    pub fn with_result_cache(mut self, results: ResultCache, key: impl Into<String>) -> Self {
        self.results = results;
        self.result_key = key.into();
        self
    }

    pub fn analysis_id(&self) -> &str {
        self.token.analysis_id()
    }

    pub fn total_chunks(&self) -> usize {
        self.plan.len()
    }

    /// Run to completion, emitting every event into `sink`.
    ///
    /// Never fails: mid-flight problems end the sequence with an `error`
    /// event. Returns the terminal status.
    pub async fn run<S: EventSink + ?Sized>(mut self, sink: &mut S) -> AnalysisStatus {
        let _guard = RegistryGuard {
            registry: Arc::clone(&self.registry),
            token: Arc::clone(&self.token),
        };
        let started = Instant::now();
        let timeout = Duration::from_secs(self.settings.profile.timeout_secs);
        let deadline = tokio::time::Instant::now() + timeout;

        tracing::info!(
            analysis_id = self.analysis_id(),
            category = %self.request.category(),
            mode = %self.request.mode(),
            provider = self.provider.name(),
            model = self.provider.model(),
            total_chunks = self.plan.len(),
            "analysis started"
        );

        let mut open: VecDeque<OpenChunk> = VecDeque::new();
        let outcome = self.drive(sink, deadline, &mut open).await;
        for chunk in open.drain(..) {
            chunk.stream.abort();
        }

        let (status, terminal) = self.conclude(outcome, started);

        self.status.record(self.analysis_id(), status);
        self.registry.release(&self.token);

        if let Some(event) = terminal {
            // The consumer may already be gone; the outcome is recorded either way.
            let _ = sink.emit(event).await;
        }
        status
    }

    async fn drive<S: EventSink + ?Sized>(
        &mut self,
        sink: &mut S,
        deadline: tokio::time::Instant,
        open: &mut VecDeque<OpenChunk>,
    ) -> Result<(), Halt> {
        sink.emit(StreamEvent::start(self.analysis_id())).await?;

        let total = self.plan.len();
        let window = self.settings.profile.max_parallel_chunks.max(1);

        for index in 0..total {
            self.checkpoint(deadline)?;
            if index == 0 {
                if let Some(cached) = self.results.get(&self.result_key) {
                    tracing::info!(
                        analysis_id = self.analysis_id(),
                        cached_tokens = cached.total_tokens,
                        "replaying cached result"
                    );
                    self.replayed = true;
                    sink.emit(StreamEvent::content(cached.text)).await?;
                    return Ok(());
                }
                self.emit_preflight_feedback(sink).await?;
            }

            let window_end = (index + window).min(total);
            while index + open.len() < window_end {
                let next = index + open.len();
                open.push_back(self.open_chunk(next)?);
            }

            let Some(mut current) = open.pop_front() else {
                return Err(AnalysisError::validation(format!(
                    "no stream opened for chunk {}",
                    index + 1
                ))
                .into());
            };
            let result = self.consume_chunk(&mut current, sink, deadline).await;
            current.stream.abort();
            result?;

            sink.emit(self.progress(index + 1, index + 1, total)).await?;
        }
        Ok(())
    }

    async fn emit_preflight_feedback<S: EventSink + ?Sized>(
        &self,
        sink: &mut S,
    ) -> Result<(), SinkClosed> {
        let category = self.request.category();
        let check = check_signature(self.plan.content(), category);
        if !check.is_match() {
            tracing::warn!(
                analysis_id = self.analysis_id(),
                matched = check.matched,
                required = check.required,
                "content does not match category signature"
            );
            sink.emit(StreamEvent::feedback(
                FeedbackLevel::Warning,
                format!(
                    "Content does not look like {} (matched {} of the {} required markers); analysis will continue",
                    describe_category(category),
                    check.matched,
                    check.required
                ),
            ))
            .await?;
        }

        let total = self.plan.len();
        let message = if total == 1 {
            format!("Analyzing {} characters in a single pass", self.plan.content().chars().count())
        } else {
            format!(
                "Content split into {} chunks of up to {} characters",
                total, self.settings.profile.chunk_size_chars
            )
        };
        sink.emit(StreamEvent::feedback(FeedbackLevel::Info, message)).await
    }

    fn open_chunk(&self, index: usize) -> Result<OpenChunk, AnalysisError> {
        let chunk = self.plan.chunk(index).ok_or_else(|| {
            AnalysisError::chunking(format!("chunk {} out of range", index + 1))
        })?;
        let request = build_chunk_request(
            self.request.category(),
            self.request.mode(),
            &self.settings.profile,
            &chunk,
            self.plan.content(),
        );
        let prompt_chars = request.system.chars().count() + request.prompt.chars().count();

        tracing::debug!(
            analysis_id = self.analysis_id(),
            chunk = chunk.number(),
            total_chunks = chunk.total,
            chars = chunk.char_len(),
            "opening chunk stream"
        );

        let stream = ProviderStream::open(
            Arc::clone(&self.provider),
            request,
            self.token.abort_signal().child_token(),
            self.settings.stream_buffer,
        );
        Ok(OpenChunk {
            index,
            prompt_chars,
            stream,
        })
    }

    async fn consume_chunk<S: EventSink + ?Sized>(
        &mut self,
        current: &mut OpenChunk,
        sink: &mut S,
        deadline: tokio::time::Instant,
    ) -> Result<(), Halt> {
        let total = self.plan.len();
        let interval = self.settings.check_interval_chars.max(1);
        let mut since_check = 0usize;
        self.usage.begin_chunk(current.prompt_chars);

        loop {
            let next = tokio::select! {
                event = current.stream.next_event() => event,
                _ = tokio::time::sleep_until(deadline) => {
                    return Err(self.timed_out().into());
                }
            };

            let event = match next {
                Ok(Some(event)) => event,
                Ok(None) => break,
                Err(LlmError::StreamAborted) => return Err(self.aborted().into()),
                Err(e) => return Err(AnalysisError::provider_failure(e.to_string()).into()),
            };

            match event {
                UnifiedStreamEvent::TextDelta { content } => {
                    if content.is_empty() {
                        continue;
                    }
                    since_check += self.usage.record_text(&content);
                    if self.results.is_enabled() {
                        self.transcript.push_str(&content);
                    }
                    sink.emit(StreamEvent::content(content)).await?;

                    if since_check >= interval {
                        since_check = 0;
                        self.checkpoint(deadline)?;
                        sink.emit(self.progress(current.index, current.index + 1, total))
                            .await?;
                    }
                }
                UnifiedStreamEvent::Usage {
                    input_tokens,
                    output_tokens,
                } => self.usage.record_usage(input_tokens, output_tokens),
                UnifiedStreamEvent::Error { message, code } => {
                    tracing::warn!(
                        analysis_id = self.analysis_id(),
                        chunk = current.index + 1,
                        code = code.as_deref().unwrap_or("unknown"),
                        "provider reported an error mid-stream"
                    );
                    return Err(AnalysisError::provider_failure(message).into());
                }
                UnifiedStreamEvent::Complete { stop_reason } => {
                    tracing::debug!(
                        analysis_id = self.analysis_id(),
                        chunk = current.index + 1,
                        stop_reason = stop_reason.as_deref().unwrap_or("none"),
                        "chunk stream complete"
                    );
                    // All output for this chunk is in hand.
                    break;
                }
            }
        }

        self.usage.finish_chunk();
        Ok(())
    }

    /// Cancellation, deadline and budget check.
    fn checkpoint(&self, deadline: tokio::time::Instant) -> Result<(), AnalysisError> {
        if check_cancelled(&self.token) {
            return Err(self.aborted());
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(self.timed_out());
        }
        if let Some((spent, ceiling)) = self.usage.over_budget(self.request.budget_usd()) {
            tracing::warn!(
                analysis_id = self.analysis_id(),
                spent,
                ceiling,
                "budget exceeded"
            );
            return Err(self.self_cancel(
                CancelReason::BudgetExceeded,
                AnalysisError::BudgetExceeded { spent, ceiling },
            ));
        }
        Ok(())
    }

    fn timed_out(&self) -> AnalysisError {
        let seconds = self.settings.profile.timeout_secs;
        tracing::warn!(analysis_id = self.analysis_id(), seconds, "analysis timed out");
        self.self_cancel(CancelReason::Timeout, AnalysisError::Timeout { seconds })
    }

    /// Flip our own token. If someone else already cancelled it, their
    /// reason decides the outcome.
    fn self_cancel(&self, reason: CancelReason, error: AnalysisError) -> AnalysisError {
        if self.token.cancel(reason) {
            error
        } else {
            self.aborted()
        }
    }

    fn aborted(&self) -> AnalysisError {
        AnalysisError::StreamAborted(self.token.reason().unwrap_or(CancelReason::UserCancelled))
    }

    fn progress(&self, completed: usize, current_chunk: usize, total: usize) -> StreamEvent {
        let percentage = if total == 0 {
            100.0
        } else {
            ((completed as f64 / total as f64) * 1000.0).round() / 10.0
        };
        StreamEvent::Progress {
            percentage,
            current_chunk,
            total_chunks: total,
            input_tokens: self.usage.input_tokens(),
            output_tokens: self.usage.output_tokens(),
        }
    }

    fn conclude(
        &self,
        outcome: Result<(), Halt>,
        started: Instant,
    ) -> (AnalysisStatus, Option<StreamEvent>) {
        let analysis_id = self.analysis_id();
        match outcome {
            Ok(()) => {
                let total_tokens = self.usage.total_tokens();
                let total_cost = self.usage.cost();
                let duration_seconds = started.elapsed().as_secs_f64();
                if !self.replayed && !self.transcript.is_empty() {
                    self.results.insert(
                        self.result_key.clone(),
                        CachedResult {
                            text: self.transcript.clone(),
                            total_tokens,
                            total_cost,
                        },
                    );
                }
                tracing::info!(
                    analysis_id,
                    total_tokens,
                    total_cost,
                    duration_seconds,
                    "analysis completed"
                );
                (
                    AnalysisStatus::Completed,
                    Some(StreamEvent::Complete {
                        total_tokens,
                        total_cost,
                        duration_seconds,
                    }),
                )
            }
            Err(Halt::Disconnected) => {
                self.token.cancel(CancelReason::UserCancelled);
                tracing::info!(analysis_id, "event consumer disconnected, analysis cancelled");
                (AnalysisStatus::Cancelled, None)
            }
            Err(Halt::Failed(AnalysisError::StreamAborted(reason)))
                if reason.is_user_visible_cancel() =>
            {
                tracing::info!(analysis_id, reason = %reason, "analysis cancelled");
                (AnalysisStatus::Cancelled, Some(StreamEvent::Cancelled {}))
            }
            Err(Halt::Failed(err)) => {
                let err = self.describe_abort(err);
                tracing::error!(analysis_id, error = %err, "analysis failed");
                (
                    AnalysisStatus::Failed,
                    Some(StreamEvent::error(err.kind(), err.to_string())),
                )
            }
        }
    }

    /// Replace a bare abort signal with the concrete error it stands for.
    fn describe_abort(&self, err: AnalysisError) -> AnalysisError {
        match err {
            AnalysisError::StreamAborted(CancelReason::Timeout) => AnalysisError::Timeout {
                seconds: self.settings.profile.timeout_secs,
            },
            AnalysisError::StreamAborted(CancelReason::BudgetExceeded) => {
                let ceiling = self.request.budget_usd().unwrap_or_default();
                AnalysisError::BudgetExceeded {
                    spent: self.usage.cost(),
                    ceiling,
                }
            }
            other => other,
        }
    }
}

fn describe_category(category: LogCategory) -> &'static str {
    match category {
        LogCategory::Anr => "an ANR trace",
        LogCategory::Tombstone => "a tombstone",
    }
}
