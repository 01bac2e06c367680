//! Event Transport
//!
//! Encoders and sinks that carry an analysis' `StreamEvent`s to a consumer.

pub mod encode;
pub mod sink;

pub use encode::{encode_json_line, encode_sse_frame, OutputFormat};
pub use sink::{event_channel, AnalysisEventStream, ChannelSink, JsonLinesSink, VecSink};
