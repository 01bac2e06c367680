//! Provider Stream
//!
//! One abortable streamed provider call. The provider runs on its own task
//! and pushes normalized events into a bounded channel; the consumer pulls
//! them with [`ProviderStream::next_event`].
//!
//! Aborting is safe while the consumer is suspended inside `next_event`:
//! the pending call resolves promptly with `LlmError::StreamAborted` and the
//! producer task (and its HTTP response) is torn down.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::provider::LlmProvider;
use crate::types::{CompletionRequest, LlmError, LlmResult};
use anr_analyzer_core::streaming::UnifiedStreamEvent;

/// Default channel capacity between the provider task and the consumer.
pub const DEFAULT_STREAM_BUFFER: usize = 64;

/// Handle that aborts a [`ProviderStream`] from anywhere.
#[derive(Debug, Clone)]
pub struct StreamAbortHandle {
    signal: CancellationToken,
}

impl StreamAbortHandle {
    pub fn abort(&self) {
        self.signal.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.signal.is_cancelled()
    }
}

/// A lazy, finite, non-restartable sequence of provider events.
pub struct ProviderStream {
    provider: &'static str,
    events: ReceiverStream<UnifiedStreamEvent>,
    signal: CancellationToken,
    task: JoinHandle<()>,
}

impl ProviderStream {
    /// Start a streamed completion on a background task.
    ///
    /// `signal` is usually a child of the analysis' abort signal so that a
    /// cancellation of the analysis reaches every open stream. A provider
    /// failure surfaces as a trailing in-band `UnifiedStreamEvent::Error`.
    pub fn open(
        provider: Arc<dyn LlmProvider>,
        request: CompletionRequest,
        signal: CancellationToken,
        buffer: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let name = provider.name();
        let task_signal = signal.clone();

        let task = tokio::spawn(async move {
            let error_tx = tx.clone();
            let outcome = tokio::select! {
                _ = task_signal.cancelled() => return,
                result = provider.stream_completion(request, tx) => result,
            };
            match outcome {
                Ok(_) | Err(LlmError::StreamAborted) => {}
                Err(e) => {
                    tracing::warn!(provider = name, error = %e, "provider call failed");
                    let _ = error_tx
                        .send(UnifiedStreamEvent::Error {
                            message: e.to_string(),
                            code: Some(e.code().to_string()),
                        })
                        .await;
                }
            }
        });

        Self {
            provider: name,
            events: ReceiverStream::new(rx),
            signal,
            task,
        }
    }

    /// Name of the provider feeding this stream.
    pub fn provider_name(&self) -> &'static str {
        self.provider
    }

    /// Next event, `Ok(None)` once the provider has finished.
    ///
    /// Fails with `StreamAborted` as soon as the stream is aborted, even if
    /// the provider has buffered events that were never read.
    pub async fn next_event(&mut self) -> LlmResult<Option<UnifiedStreamEvent>> {
        if self.signal.is_cancelled() {
            return Err(LlmError::StreamAborted);
        }
        tokio::select! {
            biased;
            _ = self.signal.cancelled() => Err(LlmError::StreamAborted),
            event = self.events.next() => Ok(event),
        }
    }

    /// Abort the stream and release the provider call.
    pub fn abort(&self) {
        self.signal.cancel();
        self.task.abort();
    }

    pub fn abort_handle(&self) -> StreamAbortHandle {
        StreamAbortHandle {
            signal: self.signal.clone(),
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.signal.is_cancelled()
    }
}

impl Drop for ProviderStream {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for ProviderStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderStream")
            .field("provider", &self.provider)
            .field("aborted", &self.signal.is_cancelled())
            .finish()
    }
}
