//! Service Integration Tests
//!
//! Result replay and provider health through the public service API.

use std::sync::Arc;

use anr_analyzer::services::analysis::{AnalysisStatus, HealthState};
use anr_analyzer::AppConfig;
use anr_analyzer_core::{AnalysisMode, ProviderType, StreamEvent};

use crate::support::*;

#[tokio::test]
async fn test_repeated_request_replays_cached_result() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        text("Main thread blocked "),
        text("on thread 14."),
        Step::Usage(300, 20),
    ]));
    let service = service(Default::default(), &provider);

    let (_, stream) = service
        .start_analysis(request(ANR_SAMPLE, AnalysisMode::Quick))
        .unwrap();
    let first = collect(stream).await;
    assert!(matches!(first.last(), Some(StreamEvent::Complete { .. })));

    let (id, stream) = service
        .start_analysis(request(ANR_SAMPLE, AnalysisMode::Quick))
        .unwrap();
    let replay = collect(stream).await;

    assert_eq!(replay.len(), 3);
    assert_eq!(replay[0], StreamEvent::start(id.clone()));
    assert_eq!(
        replay[1],
        StreamEvent::content("Main thread blocked on thread 14.")
    );
    match &replay[2] {
        StreamEvent::Complete {
            total_tokens,
            total_cost,
            ..
        } => {
            assert_eq!(*total_tokens, 0);
            assert_eq!(*total_cost, 0.0);
        }
        other => panic!("expected complete, got {:?}", other),
    }
    assert_eq!(provider.prompts().len(), 1);
    assert_eq!(service.query_status(&id), AnalysisStatus::Completed);
    assert_eq!(service.registry().active_count(), 0);
}

#[tokio::test]
async fn test_different_mode_is_not_replayed() {
    let provider = Arc::new(ScriptedProvider::new(vec![text("answer")]));
    let service = service(Default::default(), &provider);

    for mode in [AnalysisMode::Quick, AnalysisMode::Intelligent] {
        let (_, stream) = service.start_analysis(request(ANR_SAMPLE, mode)).unwrap();
        let events = collect(stream).await;
        assert_well_formed(&events);
        assert_eq!(content_text(&events), "answer");
    }
    assert_eq!(provider.prompts().len(), 2);
}

#[tokio::test]
async fn test_cancelled_run_is_not_replayed() {
    let provider = Arc::new(ScriptedProvider::new(vec![text("partial")]));
    let service = service(Default::default(), &provider);

    let (id, stream) = service
        .start_analysis(request(ANR_SAMPLE, AnalysisMode::Quick))
        .unwrap();
    assert!(service.cancel_analysis(&id, None));
    assert_eq!(collect(stream).await.last(), Some(&StreamEvent::Cancelled {}));

    let (_, stream) = service
        .start_analysis(request(ANR_SAMPLE, AnalysisMode::Quick))
        .unwrap();
    let events = collect(stream).await;
    assert_eq!(content_text(&events), "partial");
    assert_eq!(provider.prompts().len(), 1);
}

#[tokio::test]
async fn test_disabled_cache_always_calls_provider() {
    let provider = Arc::new(ScriptedProvider::new(vec![text("answer")]));
    let config = AppConfig {
        result_cache_capacity: 0,
        ..Default::default()
    };
    let service = service(config, &provider);

    for _ in 0..2 {
        let (_, stream) = service
            .start_analysis(request(ANR_SAMPLE, AnalysisMode::Quick))
            .unwrap();
        assert_eq!(content_text(&collect(stream).await), "answer");
    }
    assert_eq!(provider.prompts().len(), 2);
}

#[tokio::test]
async fn test_reachable_providers_report_healthy() {
    let provider = Arc::new(ScriptedProvider::new(vec![]));
    let service = service(Default::default(), &provider);

    let report = service.check_providers().await;
    assert_eq!(report.len(), ProviderType::ALL.len());
    assert!(report.iter().all(|h| h.state == HealthState::Healthy));
    assert!(report.iter().all(|h| h.message.is_none()));
    assert!(provider.prompts().is_empty());
}
