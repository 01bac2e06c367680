//! SSE Line Handling
//!
//! Splits a chunked HTTP body into lines and pumps them through a
//! [`StreamAdapter`] into the provider's event channel.

use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::types::{LlmError, LlmResult, UsageStats};
use anr_analyzer_core::streaming::{StreamAdapter, UnifiedStreamEvent};

/// Accumulates raw body bytes and yields complete lines.
///
/// Works on bytes so a multi-byte UTF-8 character split across two network
/// chunks is decoded only once its line is complete.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    buf: Vec<u8>,
    /// Bytes of `buf` already known to contain no newline
    scanned: usize,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes and drain every complete, non-blank line.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buf[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            let line = String::from_utf8_lossy(&self.buf[start..end]);
            let line = line.trim_end_matches('\r');
            if !line.trim().is_empty() {
                lines.push(line.to_string());
            }
            start = end + 1;
            self.scanned = start;
        }
        self.buf.drain(..start);
        self.scanned = self.buf.len();
        lines
    }

    /// Flush a trailing line that had no terminating newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        let raw = std::mem::take(&mut self.buf);
        self.scanned = 0;
        let line = String::from_utf8_lossy(&raw).trim_end_matches('\r').to_string();
        if line.trim().is_empty() {
            None
        } else {
            Some(line)
        }
    }
}

/// Drive a streaming HTTP response to completion.
///
/// Text deltas and in-band errors are forwarded as-is. Usage snapshots are
/// merged so every forwarded `Usage` event carries the best-known cumulative
/// counts for this call. Adapter parse failures are forwarded as in-band
/// `Error` events with code `parse_error`.
pub(crate) async fn pump_sse<A: StreamAdapter>(
    response: reqwest::Response,
    adapter: &mut A,
    tx: &mpsc::Sender<UnifiedStreamEvent>,
) -> LlmResult<UsageStats> {
    let mut usage = UsageStats::default();
    let mut lines = SseLineBuffer::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;
        for line in lines.push(&chunk) {
            forward_line(&line, adapter, tx, &mut usage).await?;
        }
    }
    if let Some(line) = lines.finish() {
        forward_line(&line, adapter, tx, &mut usage).await?;
    }

    Ok(usage)
}

async fn forward_line<A: StreamAdapter>(
    line: &str,
    adapter: &mut A,
    tx: &mpsc::Sender<UnifiedStreamEvent>,
    usage: &mut UsageStats,
) -> LlmResult<()> {
    let events = match adapter.adapt(line) {
        Ok(events) => events,
        Err(e) => {
            tracing::warn!(provider = adapter.provider_name(), error = %e, "unparseable stream line");
            vec![UnifiedStreamEvent::Error {
                message: e.to_string(),
                code: Some("parse_error".to_string()),
            }]
        }
    };

    for event in events {
        let event = match event {
            UnifiedStreamEvent::Usage {
                input_tokens,
                output_tokens,
            } => {
                usage.merge_snapshot(input_tokens, output_tokens);
                UnifiedStreamEvent::Usage {
                    input_tokens: usage.input_tokens,
                    output_tokens: usage.output_tokens,
                }
            }
            other => other,
        };
        tx.send(event).await.map_err(|_| LlmError::StreamAborted)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_split_across_chunks() {
        let mut buf = SseLineBuffer::new();
        assert!(buf.push(b"data: {\"a\"").is_empty());
        let lines = buf.push(b":1}\n\ndata: [DONE]\n");
        assert_eq!(lines, vec!["data: {\"a\":1}", "data: [DONE]"]);
        assert!(buf.finish().is_none());
    }

    #[test]
    fn test_crlf_lines() {
        let mut buf = SseLineBuffer::new();
        let lines = buf.push(b"event: ping\r\ndata: x\r\n\r\n");
        assert_eq!(lines, vec!["event: ping", "data: x"]);
    }

    #[test]
    fn test_multibyte_character_split() {
        let bytes = "data: é\n".as_bytes();
        let (head, tail) = bytes.split_at(7);
        let mut buf = SseLineBuffer::new();
        assert!(buf.push(head).is_empty());
        assert_eq!(buf.push(tail), vec!["data: é"]);
    }

    #[test]
    fn test_long_line_in_small_pieces() {
        let mut buf = SseLineBuffer::new();
        assert!(buf.push(b"data: ").is_empty());
        for _ in 0..10_000 {
            assert!(buf.push(b"x").is_empty());
        }
        let lines = buf.push(b"\ndata: next");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 6 + 10_000);
        assert!(lines[0].starts_with("data: xxx"));

        // The partial line left behind is still found once its newline lands
        assert_eq!(buf.push(b"!\n\n"), vec!["data: next!"]);
        assert!(buf.finish().is_none());
    }

    #[test]
    fn test_finish_flushes_trailing_line() {
        let mut buf = SseLineBuffer::new();
        assert!(buf.push(b"data: tail").is_empty());
        assert_eq!(buf.finish(), Some("data: tail".to_string()));
        assert!(buf.finish().is_none());
    }
}
