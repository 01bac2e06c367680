//! Event Sink Trait
//!
//! The single seam through which the coordinator hands events to a
//! transport (channel, stdout, SSE response body).

use async_trait::async_trait;

use crate::streaming::StreamEvent;

/// The receiving side of a sink has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkClosed;

impl std::fmt::Display for SinkClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "event sink closed")
    }
}

impl std::error::Error for SinkClosed {}

/// Destination for the events of one analysis.
///
/// Events arrive in emission order. After `SinkClosed` is returned the
/// coordinator stops emitting.
#[async_trait]
pub trait EventSink: Send {
    async fn emit(&mut self, event: StreamEvent) -> Result<(), SinkClosed>;
}

#[async_trait]
impl<S: EventSink + ?Sized> EventSink for Box<S> {
    async fn emit(&mut self, event: StreamEvent) -> Result<(), SinkClosed> {
        (**self).emit(event).await
    }
}
