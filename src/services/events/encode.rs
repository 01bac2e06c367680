//! Event Encoders
//!
//! Serialize [`StreamEvent`]s into transport frames. Every frame carries the
//! `type` discriminator.

use std::fmt;
use std::str::FromStr;

use anr_analyzer_core::StreamEvent;

/// Wire format for an event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One JSON object per line
    #[default]
    JsonLines,
    /// Server-Sent Events frames
    Sse,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::JsonLines => "jsonl",
            OutputFormat::Sse => "sse",
        }
    }

    /// Encode one event as a complete frame in this format.
    pub fn encode(&self, event: &StreamEvent) -> serde_json::Result<String> {
        match self {
            OutputFormat::JsonLines => encode_json_line(event),
            OutputFormat::Sse => encode_sse_frame(event),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jsonl" | "json" | "ndjson" => Ok(OutputFormat::JsonLines),
            "sse" => Ok(OutputFormat::Sse),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// `{"type":"...",...}\n`
pub fn encode_json_line(event: &StreamEvent) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(event)?;
    line.push('\n');
    Ok(line)
}

/// `event: <type>\ndata: <json>\n\n`
pub fn encode_sse_frame(event: &StreamEvent) -> serde_json::Result<String> {
    let data = serde_json::to_string(event)?;
    Ok(format!("event: {}\ndata: {}\n\n", event.event_type(), data))
}
