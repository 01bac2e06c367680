//! Event Sinks
//!
//! Concrete [`EventSink`] implementations:
//! - [`ChannelSink`] feeds the lazy [`AnalysisEventStream`] handed back by
//!   `start_analysis`
//! - [`JsonLinesSink`] writes encoded frames to any `AsyncWrite` (stdout)
//! - [`VecSink`] collects events in memory

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures_util::Stream;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use anr_analyzer_core::{EventSink, SinkClosed, StreamEvent};

use super::encode::OutputFormat;

/// Create a connected channel sink and event stream.
pub fn event_channel(
    analysis_id: impl Into<String>,
    buffer: usize,
) -> (ChannelSink, AnalysisEventStream) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (
        ChannelSink { tx },
        AnalysisEventStream {
            analysis_id: analysis_id.into(),
            events: ReceiverStream::new(rx),
        },
    )
}

/// Sending half of an analysis' event channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<StreamEvent>,
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&mut self, event: StreamEvent) -> Result<(), SinkClosed> {
        self.tx.send(event).await.map_err(|_| SinkClosed)
    }
}

/// Lazy, finite, non-restartable sequence of one analysis' events.
///
/// Ends after the terminal event. Dropping it tells the coordinator the
/// consumer went away.
#[derive(Debug)]
pub struct AnalysisEventStream {
    analysis_id: String,
    events: ReceiverStream<StreamEvent>,
}

impl AnalysisEventStream {
    pub fn analysis_id(&self) -> &str {
        &self.analysis_id
    }
}

impl Stream for AnalysisEventStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

/// Writes each event as one frame and flushes it.
pub struct JsonLinesSink<W> {
    writer: W,
    format: OutputFormat,
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self::with_format(writer, OutputFormat::JsonLines)
    }

    pub fn with_format(writer: W, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> EventSink for JsonLinesSink<W> {
    async fn emit(&mut self, event: StreamEvent) -> Result<(), SinkClosed> {
        let frame = self.format.encode(&event).map_err(|e| {
            tracing::warn!(error = %e, "failed to encode event");
            SinkClosed
        })?;
        self.writer.write_all(frame.as_bytes()).await.map_err(|e| {
            tracing::debug!(error = %e, "event writer closed");
            SinkClosed
        })?;
        self.writer.flush().await.map_err(|_| SinkClosed)
    }
}

/// In-memory sink. Optionally reports closed after a number of events.
#[derive(Debug, Default)]
pub struct VecSink {
    events: Vec<StreamEvent>,
    close_after: Option<usize>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `limit` events, then behave like a disconnected consumer.
    pub fn closing_after(limit: usize) -> Self {
        Self {
            events: Vec::new(),
            close_after: Some(limit),
        }
    }

    pub fn events(&self) -> &[StreamEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<StreamEvent> {
        self.events
    }
}

#[async_trait]
impl EventSink for VecSink {
    async fn emit(&mut self, event: StreamEvent) -> Result<(), SinkClosed> {
        if self.close_after.is_some_and(|limit| self.events.len() >= limit) {
            return Err(SinkClosed);
        }
        self.events.push(event);
        Ok(())
    }
}
