//! Execution history survives a restart through the JSON-lines log.

use std::io::Write;
use std::sync::Arc;

use tempfile::TempDir;

use veille_core::{
    execution::{ExecutionStatus, ExecutionTracker, JsonlHistoryStore, TriggerSource},
    pipeline::{BackoffPolicy, PipelineConfig, PipelineOrchestrator, PipelinePhase, RetryPolicy},
    service::DigestService,
    testing::{fixtures, MockMessenger, MockNewsSource},
};

fn service(history_path: &std::path::Path, articles: usize) -> DigestService {
    let store = Arc::new(JsonlHistoryStore::new(history_path));
    let tracker = Arc::new(ExecutionTracker::with_store(50, store).expect("history loads"));
    let config = PipelineConfig::default();
    let mut retry = RetryPolicy::from_config(&config);
    retry.backoff = BackoffPolicy::None;

    let orchestrator = PipelineOrchestrator::new(
        config,
        20,
        Arc::new(MockNewsSource::with_articles(fixtures::articles(articles))),
        Arc::new(fixtures::scripted_model(articles, 10, 5)),
        Arc::new(MockMessenger::new()),
        tracker,
    )
    .with_retry_policy(retry);
    DigestService::new(Arc::new(orchestrator))
}

#[tokio::test]
async fn test_history_survives_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.jsonl");

    let completed = service(&path, 20)
        .trigger(TriggerSource::Scheduled)
        .await
        .unwrap();

    // Second process sees an empty news feed.
    let failed = service(&path, 0)
        .trigger(TriggerSource::Manual)
        .await
        .unwrap();
    assert_eq!(failed.failed_stage, Some(PipelinePhase::Fetching));

    let restarted = service(&path, 20);
    let history = restarted.history(10);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0], failed);
    assert_eq!(history[1], completed);
    assert_eq!(history[1].counters.ideas_translated, 5);

    let status = restarted.status();
    assert!(!status.is_running);
    assert_eq!(
        status.last_execution.map(|e| e.status),
        Some(ExecutionStatus::Failed)
    );
}

#[tokio::test]
async fn test_corrupted_lines_are_skipped() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("history.jsonl");

    let first = {
        let service = service(&path, 20);
        service.trigger(TriggerSource::Manual).await.unwrap()
    };

    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .open(&path)
        .unwrap();
    writeln!(file, "this is not json").unwrap();
    writeln!(file, "{}", serde_json::to_string(&first).unwrap()).unwrap();
    drop(file);

    let restarted = service(&path, 20);
    let history = restarted.history(10);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, first.id);

    let second = restarted.trigger(TriggerSource::Manual).await.unwrap();
    let history = service(&path, 20).history(10);
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, second.id);
}
