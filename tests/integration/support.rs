//! Shared fixtures: a scripted provider that plays back one script per
//! chunk, and helpers to build a service around it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use anr_analyzer::services::analysis::AnalysisService;
use anr_analyzer::services::events::AnalysisEventStream;
use anr_analyzer::AppConfig;
use anr_analyzer_core::{
    AnalysisMode, AnalysisRequest, LogCategory, ModeProfile, ProviderType, StreamEvent,
    UnifiedStreamEvent,
};
use anr_analyzer_llm::{
    CompletionRequest, LlmError, LlmProvider, LlmResult, ProviderConfig, ProviderFactory,
    UsageStats,
};

pub const ANR_SAMPLE: &str = r#"----- pid 4321 at 2024-03-01 10:22:33 -----
Cmd line: com.example.app
DALVIK THREADS (12):
"main" prio=5 tid=1 Blocked
  at com.example.app.Repository.load(Repository.java:88)
  - waiting to lock <0x0a1b2c3d> held by thread 14
  at android.os.Handler.dispatchMessage(Handler.java:106)
"#;

/// One step of a chunk's scripted response.
#[derive(Debug, Clone)]
pub enum Step {
    Text(String),
    Usage(u32, u32),
    Sleep(Duration),
    /// Provider call fails (surfaced in-band by the stream)
    Fail(LlmError),
    /// Provider reports an error event
    InBandError(String),
    /// Provider reports the end of its output; later steps still run
    Complete,
    /// Never finishes
    Hang,
}

pub fn text(s: &str) -> Step {
    Step::Text(s.to_string())
}

/// 1-based chunk number read from the prompt's part header.
pub fn chunk_number(prompt: &str) -> usize {
    prompt
        .strip_prefix("This is part ")
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|n| n.parse().ok())
        .unwrap_or(1)
}

pub struct ScriptedProvider {
    config: ProviderConfig,
    scripts: HashMap<usize, Vec<Step>>,
    default_script: Vec<Step>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(default_script: Vec<Step>) -> Self {
        Self {
            config: ProviderConfig {
                model: "claude-sonnet-4-20250514".to_string(),
                ..Default::default()
            },
            scripts: HashMap::new(),
            default_script,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Script for the 1-based chunk `number`.
    pub fn with_chunk(mut self, number: usize, steps: Vec<Step>) -> Self {
        self.scripts.insert(number, steps);
        self
    }

    /// Chunk numbers the provider was called for, in call order.
    pub fn called_chunks(&self) -> Vec<usize> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .map(|p| chunk_number(p))
            .collect()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn stream_completion(
        &self,
        request: CompletionRequest,
        tx: mpsc::Sender<UnifiedStreamEvent>,
    ) -> LlmResult<UsageStats> {
        let number = chunk_number(&request.prompt);
        self.prompts.lock().unwrap().push(request.prompt);
        let steps = self
            .scripts
            .get(&number)
            .cloned()
            .unwrap_or_else(|| self.default_script.clone());

        let mut usage = UsageStats::default();
        for step in steps {
            let event = match step {
                Step::Text(content) => UnifiedStreamEvent::TextDelta { content },
                Step::Usage(input_tokens, output_tokens) => {
                    usage.merge_snapshot(input_tokens, output_tokens);
                    UnifiedStreamEvent::Usage {
                        input_tokens,
                        output_tokens,
                    }
                }
                Step::Sleep(duration) => {
                    tokio::time::sleep(duration).await;
                    continue;
                }
                Step::Fail(err) => return Err(err),
                Step::InBandError(message) => UnifiedStreamEvent::Error {
                    message,
                    code: Some("overloaded_error".to_string()),
                },
                Step::Complete => UnifiedStreamEvent::Complete {
                    stop_reason: Some("end_turn".to_string()),
                },
                Step::Hang => {
                    std::future::pending::<()>().await;
                    continue;
                }
            };
            tx.send(event).await.map_err(|_| LlmError::StreamAborted)?;
        }

        tx.send(UnifiedStreamEvent::Complete {
            stop_reason: Some("end_turn".to_string()),
        })
        .await
        .map_err(|_| LlmError::StreamAborted)?;
        Ok(usage)
    }

    async fn health_check(&self) -> LlmResult<()> {
        Ok(())
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }
}

pub struct ScriptedFactory {
    provider: Arc<ScriptedProvider>,
}

impl ProviderFactory for ScriptedFactory {
    fn create(
        &self,
        _provider: ProviderType,
        _mode: AnalysisMode,
    ) -> LlmResult<Arc<dyn LlmProvider>> {
        let provider: Arc<dyn LlmProvider> = self.provider.clone();
        Ok(provider)
    }
}

/// Default config with `mode` overridden to `profile`.
pub fn config_with(mode: AnalysisMode, profile: ModeProfile) -> AppConfig {
    let mut config = AppConfig::default();
    config.modes.insert(mode, profile);
    config
}

/// Sequential profile with small chunks.
pub fn small_chunks(chunk_size_chars: usize) -> ModeProfile {
    ModeProfile {
        chunk_size_chars,
        max_output_tokens: 1_024,
        timeout_secs: 60,
        max_parallel_chunks: 1,
    }
}

pub fn service(config: AppConfig, provider: &Arc<ScriptedProvider>) -> AnalysisService {
    AnalysisService::new(
        config,
        Arc::new(ScriptedFactory {
            provider: Arc::clone(provider),
        }),
    )
}

pub fn request(content: impl Into<String>, mode: AnalysisMode) -> AnalysisRequest {
    AnalysisRequest::new(content, LogCategory::Anr, mode, ProviderType::Anthropic)
}

/// Content that splits into exactly `chunks` chunks of `size` characters.
pub fn content_of_chunks(chunks: usize, size: usize) -> String {
    "y".repeat(chunks * size)
}

/// Drain the stream, failing the test if it does not end in time.
pub async fn collect(mut events: AnalysisEventStream) -> Vec<StreamEvent> {
    tokio::time::timeout(Duration::from_secs(30), async move {
        let mut out = Vec::new();
        while let Some(event) = events.next().await {
            out.push(event);
        }
        out
    })
    .await
    .expect("event stream did not terminate")
}

/// Concatenated text of all content events.
pub fn content_text(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Content { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

/// Exactly one start first, exactly one terminal last.
pub fn assert_well_formed(events: &[StreamEvent]) {
    assert!(
        matches!(events.first(), Some(StreamEvent::Start { .. })),
        "first event must be start: {:?}",
        events.first()
    );
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, StreamEvent::Start { .. }))
            .count(),
        1
    );
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(events.last().is_some_and(StreamEvent::is_terminal));
}
