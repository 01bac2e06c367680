//! OpenAI API Adapter
//!
//! Handles the OpenAI chat-completions SSE format. Usage arrives in a final
//! chunk with empty `choices` when `stream_options.include_usage` is set,
//! after `finish_reason`, so `Complete` is held back until `[DONE]`.

use anr_analyzer_core::streaming::{AdapterError, StreamAdapter, UnifiedStreamEvent};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct OpenAIEvent {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Option<Delta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// Adapter for OpenAI API SSE format
#[derive(Debug)]
pub struct OpenAIAdapter {
    model: String,
    stop_reason: Option<String>,
    finished: bool,
}

impl OpenAIAdapter {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            stop_reason: None,
            finished: false,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl StreamAdapter for OpenAIAdapter {
    fn provider_name(&self) -> &'static str {
        "openai"
    }

    fn adapt(&mut self, input: &str) -> Result<Vec<UnifiedStreamEvent>, AdapterError> {
        let trimmed = input.trim();

        let json_str = if let Some(rest) = trimmed.strip_prefix("data:") {
            rest.trim_start()
        } else if trimmed.starts_with('{') {
            trimmed
        } else {
            return Ok(vec![]);
        };

        if json_str.is_empty() {
            return Ok(vec![]);
        }
        if json_str == "[DONE]" {
            if self.finished {
                return Ok(vec![]);
            }
            self.finished = true;
            return Ok(vec![UnifiedStreamEvent::Complete {
                stop_reason: self.stop_reason.take(),
            }]);
        }

        let event: OpenAIEvent =
            serde_json::from_str(json_str).map_err(|e| AdapterError::ParseError(e.to_string()))?;

        let mut events = vec![];

        if let Some(error) = event.error {
            events.push(UnifiedStreamEvent::Error {
                message: error.message,
                code: error.code,
            });
            return Ok(events);
        }

        for choice in event.choices {
            if let Some(content) = choice.delta.and_then(|d| d.content) {
                if !content.is_empty() {
                    events.push(UnifiedStreamEvent::TextDelta { content });
                }
            }
            if let Some(finish_reason) = choice.finish_reason {
                self.stop_reason = Some(finish_reason);
            }
        }

        if let Some(usage) = event.usage {
            events.push(UnifiedStreamEvent::Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            });
        }

        Ok(events)
    }
}
