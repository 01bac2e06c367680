//! Coordinator Integration Tests
//!
//! Drive full analyses through the service with a scripted provider and
//! check the emitted event sequences.

use std::sync::Arc;
use std::time::Duration;

use anr_analyzer::services::analysis::AnalysisStatus;
use anr_analyzer::services::events::VecSink;
use anr_analyzer_core::{
    AnalysisMode, AnalysisRequestBuilder, ErrorKind, FeedbackLevel, ModeProfile, StreamEvent,
};
use anr_analyzer_llm::LlmError;

use crate::support::*;

fn progress_chunks(events: &[StreamEvent]) -> Vec<(usize, usize, f64)> {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Progress {
                current_chunk,
                total_chunks,
                percentage,
                ..
            } => Some((*current_chunk, *total_chunks, *percentage)),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Completion
// ============================================================================

#[tokio::test]
async fn test_single_chunk_reproduces_provider_output() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        text("The main thread "),
        text("is blocked on "),
        text("a monitor held by thread 14."),
    ]));
    let service = service(Default::default(), &provider);

    let (id, stream) = service
        .start_analysis(request(ANR_SAMPLE, AnalysisMode::Quick))
        .unwrap();
    let events = collect(stream).await;

    assert_well_formed(&events);
    assert_eq!(events[0], StreamEvent::start(id.clone()));
    assert_eq!(
        content_text(&events),
        "The main thread is blocked on a monitor held by thread 14."
    );
    match events.last().unwrap() {
        StreamEvent::Complete {
            total_tokens,
            total_cost,
            duration_seconds,
        } => {
            assert!(*total_tokens > 0);
            assert!(*total_cost > 0.0);
            assert!(*duration_seconds >= 0.0);
        }
        other => panic!("expected complete, got {:?}", other),
    }

    assert_eq!(service.query_status(&id), AnalysisStatus::Completed);
    assert_eq!(service.registry().active_count(), 0);
    assert_eq!(progress_chunks(&events), vec![(1, 1, 100.0)]);
}

#[tokio::test]
async fn test_large_file_three_chunks_in_order() {
    let provider = Arc::new(
        ScriptedProvider::new(vec![])
            .with_chunk(1, vec![text("[part 1]")])
            .with_chunk(2, vec![text("[part 2]")])
            .with_chunk(3, vec![text("[part 3]")]),
    );
    let service = service(Default::default(), &provider);

    let content = "x".repeat(500_000);
    let (_, stream) = service
        .start_analysis(request(content, AnalysisMode::LargeFile))
        .unwrap();
    let events = collect(stream).await;

    assert_well_formed(&events);
    assert!(matches!(events.last(), Some(StreamEvent::Complete { .. })));
    assert_eq!(content_text(&events), "[part 1][part 2][part 3]");
    assert_eq!(
        progress_chunks(&events),
        vec![(1, 3, 33.3), (2, 3, 66.7), (3, 3, 100.0)]
    );

    let mut called = provider.called_chunks();
    called.sort_unstable();
    assert_eq!(called, vec![1, 2, 3]);
    assert!(provider
        .prompts()
        .iter()
        .any(|p| p.starts_with("This is part 2 of 3")));
}

#[tokio::test]
async fn test_read_ahead_keeps_chunk_order() {
    let profile = ModeProfile {
        max_parallel_chunks: 3,
        ..small_chunks(100)
    };
    let provider = Arc::new(
        ScriptedProvider::new(vec![])
            .with_chunk(1, vec![Step::Sleep(Duration::from_millis(150)), text("first ")])
            .with_chunk(2, vec![text("second ")])
            .with_chunk(3, vec![text("third")]),
    );
    let service = service(config_with(AnalysisMode::LargeFile, profile), &provider);

    let (_, stream) = service
        .start_analysis(request(content_of_chunks(3, 100), AnalysisMode::LargeFile))
        .unwrap();
    let events = collect(stream).await;

    assert_well_formed(&events);
    assert_eq!(content_text(&events), "first second third");

    // Each chunk's content is immediately followed by its own progress
    let order: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Content { text } => Some(text.trim().to_string()),
            StreamEvent::Progress { current_chunk, .. } => Some(current_chunk.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(order, vec!["first", "1", "second", "2", "third", "3"]);
}

#[tokio::test]
async fn test_provider_complete_ends_chunk_without_waiting_for_close() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        text("done"),
        Step::Complete,
        Step::Hang,
    ]));
    let service = service(Default::default(), &provider);

    let (id, stream) = service
        .start_analysis(request(ANR_SAMPLE, AnalysisMode::Quick))
        .unwrap();
    let events = collect(stream).await;

    assert_well_formed(&events);
    assert!(matches!(events.last(), Some(StreamEvent::Complete { .. })));
    assert_eq!(content_text(&events), "done");
    assert_eq!(service.query_status(&id), AnalysisStatus::Completed);
}

#[tokio::test]
async fn test_reported_usage_replaces_estimate() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        Step::Usage(1_000, 1),
        text("short answer"),
        Step::Usage(0, 50),
    ]));
    let service = service(Default::default(), &provider);

    let (_, stream) = service
        .start_analysis(request(ANR_SAMPLE, AnalysisMode::Quick))
        .unwrap();
    let events = collect(stream).await;

    match events.last().unwrap() {
        StreamEvent::Complete { total_tokens, .. } => assert_eq!(*total_tokens, 1_050),
        other => panic!("expected complete, got {:?}", other),
    }
}

#[tokio::test]
async fn test_progress_emitted_at_check_interval() {
    let provider = Arc::new(ScriptedProvider::new(vec![text(&"a".repeat(60)); 5]));
    let service = service(Default::default(), &provider);

    let (_, stream) = service
        .start_analysis(request(ANR_SAMPLE, AnalysisMode::Quick))
        .unwrap();
    let events = collect(stream).await;

    // 300 chars with a 100-char interval: checks after 120, 240 plus chunk end
    let progress = progress_chunks(&events);
    assert_eq!(progress.len(), 3);
    assert_eq!(progress.last(), Some(&(1, 1, 100.0)));
    assert!(progress[..2].iter().all(|(_, _, pct)| *pct == 0.0));
}

// ============================================================================
// Feedback
// ============================================================================

#[tokio::test]
async fn test_signature_mismatch_warns_but_continues() {
    let provider = Arc::new(ScriptedProvider::new(vec![text("ok")]));
    let service = service(Default::default(), &provider);

    let (_, stream) = service
        .start_analysis(request("just some unrelated text", AnalysisMode::Quick))
        .unwrap();
    let events = collect(stream).await;

    assert!(events.iter().any(|e| matches!(
        e,
        StreamEvent::Feedback {
            level: FeedbackLevel::Warning,
            ..
        }
    )));
    assert!(matches!(events.last(), Some(StreamEvent::Complete { .. })));
}

#[tokio::test]
async fn test_matching_log_gets_info_only() {
    let provider = Arc::new(ScriptedProvider::new(vec![text("ok")]));
    let service = service(Default::default(), &provider);

    let (_, stream) = service
        .start_analysis(request(ANR_SAMPLE, AnalysisMode::Quick))
        .unwrap();
    let events = collect(stream).await;

    let levels: Vec<FeedbackLevel> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Feedback { level, .. } => Some(*level),
            _ => None,
        })
        .collect();
    assert_eq!(levels, vec![FeedbackLevel::Info]);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_provider_error_on_first_of_two_chunks() {
    let provider = Arc::new(
        ScriptedProvider::new(vec![])
            .with_chunk(
                1,
                vec![
                    text("partial"),
                    Step::Fail(LlmError::ServerError {
                        message: "overloaded".to_string(),
                        status: Some(529),
                    }),
                ],
            )
            .with_chunk(2, vec![text("never")]),
    );
    let service = service(
        config_with(AnalysisMode::Quick, small_chunks(100)),
        &provider,
    );

    let (id, stream) = service
        .start_analysis(request(content_of_chunks(2, 100), AnalysisMode::Quick))
        .unwrap();
    let events = collect(stream).await;

    assert_well_formed(&events);
    match events.last().unwrap() {
        StreamEvent::Error { kind, message } => {
            assert_eq!(*kind, ErrorKind::ProviderFailure);
            assert!(message.contains("overloaded"));
        }
        other => panic!("expected error, got {:?}", other),
    }
    assert_eq!(content_text(&events), "partial");
    assert_eq!(provider.called_chunks(), vec![1]);
    assert!(!service.registry().contains(&id));
    assert_eq!(service.query_status(&id), AnalysisStatus::Failed);
}

#[tokio::test]
async fn test_in_band_provider_error() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        text("thinking"),
        Step::InBandError("Overloaded".to_string()),
        text("unreachable"),
    ]));
    let service = service(Default::default(), &provider);

    let (_, stream) = service
        .start_analysis(request(ANR_SAMPLE, AnalysisMode::Quick))
        .unwrap();
    let events = collect(stream).await;

    assert_well_formed(&events);
    assert_eq!(
        events.last(),
        Some(&StreamEvent::error(
            ErrorKind::ProviderFailure,
            "Provider failure: Overloaded"
        ))
    );
    assert_eq!(content_text(&events), "thinking");
}

#[tokio::test]
async fn test_budget_exceeded() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        text(&"b".repeat(150)),
        text("more"),
    ]));
    let service = service(Default::default(), &provider);

    let request = AnalysisRequestBuilder::new(ANR_SAMPLE)
        .mode(AnalysisMode::Quick)
        .budget_usd(0.0)
        .build()
        .unwrap();
    let (id, stream) = service.start_analysis(request).unwrap();
    let events = collect(stream).await;

    assert_well_formed(&events);
    match events.last().unwrap() {
        StreamEvent::Error { kind, message } => {
            assert_eq!(*kind, ErrorKind::BudgetExceeded);
            assert!(message.starts_with("Budget exceeded"));
        }
        other => panic!("expected budget error, got {:?}", other),
    }
    assert!(!content_text(&events).contains("more"));
    assert_eq!(service.query_status(&id), AnalysisStatus::Failed);
}

#[tokio::test]
async fn test_budget_counts_output_beyond_placeholder_usage() {
    // Anthropic reports output_tokens: 1 at message_start
    let mut script = vec![Step::Usage(100, 1)];
    script.extend(std::iter::repeat_with(|| text(&"o".repeat(100))).take(100));
    let provider = Arc::new(ScriptedProvider::new(script));
    let service = service(Default::default(), &provider);

    let request = AnalysisRequestBuilder::new(ANR_SAMPLE)
        .mode(AnalysisMode::Quick)
        .budget_usd(0.002)
        .build()
        .unwrap();
    let (id, stream) = service.start_analysis(request).unwrap();
    let events = collect(stream).await;

    assert_well_formed(&events);
    assert!(
        matches!(
            events.last(),
            Some(StreamEvent::Error {
                kind: ErrorKind::BudgetExceeded,
                ..
            })
        ),
        "expected budget error, got {:?}",
        events.last()
    );
    assert!(content_text(&events).len() < 10_000);
    assert_eq!(service.query_status(&id), AnalysisStatus::Failed);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_while_provider_hangs() {
    let profile = ModeProfile {
        timeout_secs: 1,
        ..small_chunks(10_000)
    };
    let provider = Arc::new(ScriptedProvider::new(vec![text("begin"), Step::Hang]));
    let service = service(config_with(AnalysisMode::Quick, profile), &provider);

    let (id, stream) = service
        .start_analysis(request(ANR_SAMPLE, AnalysisMode::Quick))
        .unwrap();
    let events = collect(stream).await;

    assert_well_formed(&events);
    assert_eq!(
        events.last(),
        Some(&StreamEvent::error(
            ErrorKind::Timeout,
            "Analysis timeout after 1 seconds"
        ))
    );
    assert_eq!(service.query_status(&id), AnalysisStatus::Failed);
    assert_eq!(service.registry().active_count(), 0);
}

// ============================================================================
// Sinks
// ============================================================================

#[tokio::test]
async fn test_closed_sink_cancels_analysis() {
    let provider = Arc::new(ScriptedProvider::new(vec![text("chunk "); 20]));
    let service = service(Default::default(), &provider);
    let mut sink = VecSink::closing_after(3);

    let (id, status) = service
        .run_to_sink(request(ANR_SAMPLE, AnalysisMode::Quick), &mut sink)
        .await
        .unwrap();

    assert_eq!(status, AnalysisStatus::Cancelled);
    assert_eq!(sink.events().len(), 3);
    assert!(!sink.events().iter().any(StreamEvent::is_terminal));
    assert_eq!(service.query_status(&id), AnalysisStatus::Cancelled);
    assert_eq!(service.registry().active_count(), 0);
}

#[tokio::test]
async fn test_run_to_sink_collects_everything() {
    let provider = Arc::new(ScriptedProvider::new(vec![text("done")]));
    let service = service(Default::default(), &provider);
    let mut sink = VecSink::new();

    let (_, status) = service
        .run_to_sink(request(ANR_SAMPLE, AnalysisMode::Intelligent), &mut sink)
        .await
        .unwrap();

    assert_eq!(status, AnalysisStatus::Completed);
    let events = sink.into_events();
    assert_well_formed(&events);
    assert_eq!(content_text(&events), "done");
}
