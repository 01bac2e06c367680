//! Cancellation Integration Tests
//!
//! Cancel analyses at every stage and check that each ends with exactly one
//! terminal event and leaves nothing registered.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;

use anr_analyzer::services::analysis::AnalysisStatus;
use anr_analyzer::services::events::AnalysisEventStream;
use anr_analyzer_core::{AnalysisError, AnalysisMode, StreamEvent};

use crate::support::*;

/// Read events until one matches, returning everything read so far.
async fn read_until(
    events: &mut AnalysisEventStream,
    stop: impl Fn(&StreamEvent) -> bool,
) -> Vec<StreamEvent> {
    tokio::time::timeout(Duration::from_secs(10), async {
        let mut seen = Vec::new();
        while let Some(event) = events.next().await {
            let done = stop(&event);
            seen.push(event);
            if done {
                break;
            }
        }
        seen
    })
    .await
    .expect("expected event never arrived")
}

fn is_content(text: &'static str) -> impl Fn(&StreamEvent) -> bool {
    move |e: &StreamEvent| matches!(e, StreamEvent::Content { text: t } if t == text)
}

#[tokio::test]
async fn test_cancel_before_streaming() {
    let provider = Arc::new(ScriptedProvider::new(vec![text("never sent")]));
    let service = service(Default::default(), &provider);

    let (id, stream) = service
        .start_analysis(request(ANR_SAMPLE, AnalysisMode::Quick))
        .unwrap();
    assert_eq!(service.query_status(&id), AnalysisStatus::Running);
    assert!(service.cancel_analysis(&id, Some("user clicked stop")));

    let events = collect(stream).await;
    assert_eq!(
        events,
        vec![StreamEvent::start(id.clone()), StreamEvent::Cancelled {}]
    );
    assert!(provider.prompts().is_empty());
    assert_eq!(service.query_status(&id), AnalysisStatus::Cancelled);
    assert_eq!(service.registry().active_count(), 0);
}

#[tokio::test]
async fn test_second_cancel_returns_false() {
    let provider = Arc::new(ScriptedProvider::new(vec![text("x")]));
    let service = service(Default::default(), &provider);

    let (id, stream) = service
        .start_analysis(request(ANR_SAMPLE, AnalysisMode::Quick))
        .unwrap();
    assert!(service.cancel_analysis(&id, None));
    assert!(!service.cancel_analysis(&id, None));

    let events = collect(stream).await;
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
    assert_eq!(events.last(), Some(&StreamEvent::Cancelled {}));
}

#[tokio::test]
async fn test_cancel_unknown_analysis() {
    let provider = Arc::new(ScriptedProvider::new(vec![]));
    let service = service(Default::default(), &provider);

    assert!(!service.cancel_analysis("does-not-exist", None));
    assert_eq!(
        service.query_status("does-not-exist"),
        AnalysisStatus::NotFound
    );
}

#[tokio::test]
async fn test_cancel_mid_second_chunk() {
    let provider = Arc::new(
        ScriptedProvider::new(vec![])
            .with_chunk(1, vec![text("c1")])
            .with_chunk(2, vec![text("c2-a"), Step::Hang])
            .with_chunk(3, vec![text("c3")]),
    );
    let service = service(
        config_with(AnalysisMode::Quick, small_chunks(100)),
        &provider,
    );

    let (id, mut stream) = service
        .start_analysis(request(content_of_chunks(3, 100), AnalysisMode::Quick))
        .unwrap();
    let mut events = read_until(&mut stream, is_content("c2-a")).await;

    assert!(service.cancel_analysis(&id, Some("enough")));
    events.extend(collect(stream).await);

    assert_well_formed(&events);
    assert_eq!(events.last(), Some(&StreamEvent::Cancelled {}));
    assert_eq!(content_text(&events), "c1c2-a");
    assert_eq!(provider.called_chunks(), vec![1, 2]);
    assert_eq!(service.query_status(&id), AnalysisStatus::Cancelled);
    assert_eq!(service.registry().active_count(), 0);
}

#[tokio::test]
async fn test_shutdown_cancels_running_analyses() {
    let provider = Arc::new(ScriptedProvider::new(vec![text("working"), Step::Hang]));
    let service = service(Default::default(), &provider);

    let (id, mut stream) = service
        .start_analysis(request(ANR_SAMPLE, AnalysisMode::Quick))
        .unwrap();
    let mut events = read_until(&mut stream, is_content("working")).await;

    assert_eq!(service.shutdown(), 1);
    events.extend(collect(stream).await);

    assert_well_formed(&events);
    assert_eq!(events.last(), Some(&StreamEvent::Cancelled {}));
    assert_eq!(service.query_status(&id), AnalysisStatus::Cancelled);
}

#[tokio::test]
async fn test_dropping_stream_cancels_analysis() {
    let mut script = Vec::new();
    for _ in 0..200 {
        script.push(text("tick "));
        script.push(Step::Sleep(Duration::from_millis(10)));
    }
    let provider = Arc::new(ScriptedProvider::new(script));
    let service = service(Default::default(), &provider);

    let (id, mut stream) = service
        .start_analysis(request(ANR_SAMPLE, AnalysisMode::Quick))
        .unwrap();
    read_until(&mut stream, is_content("tick ")).await;
    drop(stream);

    let status = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let status = service.query_status(&id);
            if status != AnalysisStatus::Running {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("analysis kept running after its consumer went away");

    assert_eq!(status, AnalysisStatus::Cancelled);
    assert_eq!(service.registry().active_count(), 0);
}

#[tokio::test]
async fn test_cancel_after_completion_is_a_no_op() {
    let provider = Arc::new(ScriptedProvider::new(vec![text("finished")]));
    let service = service(Default::default(), &provider);

    let (id, stream) = service
        .start_analysis(request(ANR_SAMPLE, AnalysisMode::Quick))
        .unwrap();
    let events = collect(stream).await;
    assert!(matches!(events.last(), Some(StreamEvent::Complete { .. })));

    assert!(!service.cancel_analysis(&id, None));
    assert_eq!(service.query_status(&id), AnalysisStatus::Completed);
}

#[tokio::test]
async fn test_cancel_after_provider_finished_keeps_completion() {
    // The provider has reported everything but keeps its connection open
    let provider = Arc::new(ScriptedProvider::new(vec![
        text("final"),
        Step::Usage(50, 5),
        Step::Complete,
        Step::Sleep(Duration::from_millis(400)),
    ]));
    let service = service(Default::default(), &provider);

    let (id, mut stream) = service
        .start_analysis(request(ANR_SAMPLE, AnalysisMode::Quick))
        .unwrap();
    let mut events = read_until(&mut stream, is_content("final")).await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!service.cancel_analysis(&id, Some("too late")));
    events.extend(collect(stream).await);

    assert_well_formed(&events);
    assert!(matches!(events.last(), Some(StreamEvent::Complete { .. })));
    assert_eq!(service.query_status(&id), AnalysisStatus::Completed);
}

#[tokio::test]
async fn test_duplicate_id_rejected_then_reusable() {
    let provider = Arc::new(ScriptedProvider::new(vec![text("busy"), Step::Hang]));
    let service = service(Default::default(), &provider);

    let first = service
        .start_analysis_with_id("fixed-id", request(ANR_SAMPLE, AnalysisMode::Quick))
        .unwrap();
    assert_eq!(first.analysis_id(), "fixed-id");

    let err = service
        .start_analysis_with_id("fixed-id", request(ANR_SAMPLE, AnalysisMode::Quick))
        .err()
        .unwrap();
    assert_eq!(err, AnalysisError::DuplicateAnalysisId("fixed-id".to_string()));
    assert!(err.is_rejection());

    assert!(service.cancel_analysis("fixed-id", None));
    let events = collect(first).await;
    assert_eq!(events.last(), Some(&StreamEvent::Cancelled {}));
    assert_eq!(service.query_status("fixed-id"), AnalysisStatus::Cancelled);

    let second = service
        .start_analysis_with_id("fixed-id", request(ANR_SAMPLE, AnalysisMode::Quick))
        .unwrap();
    assert_eq!(service.query_status("fixed-id"), AnalysisStatus::Running);
    assert!(service.cancel_analysis("fixed-id", None));
    let events = collect(second).await;
    assert_well_formed(&events);
    assert_eq!(service.registry().active_count(), 0);
}
