//! Runs whose driving task stops early still release the run slot.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use veille_core::{
    execution::{ExecutionStatus, ExecutionTracker, TriggerSource},
    llm::{GenerationRequest, LanguageModel, ModelError},
    pipeline::{PipelineConfig, PipelineOrchestrator, PipelinePhase, RUN_ABORTED},
    service::DigestService,
    testing::{fixtures, MockMessenger, MockNewsSource},
};

/// Model whose every call panics.
struct PanickingModel;

#[async_trait]
impl LanguageModel for PanickingModel {
    fn provider(&self) -> &str {
        "panicking"
    }

    fn model(&self) -> &str {
        "panicking-model"
    }

    async fn generate(&self, _request: GenerationRequest) -> Result<String, ModelError> {
        panic!("model client bug");
    }
}

fn orchestrator(model: Arc<dyn LanguageModel>) -> Arc<PipelineOrchestrator> {
    Arc::new(PipelineOrchestrator::new(
        PipelineConfig::default(),
        20,
        Arc::new(MockNewsSource::with_articles(fixtures::articles(20))),
        model,
        Arc::new(MockMessenger::new()),
        Arc::new(ExecutionTracker::default()),
    ))
}

fn slow_model() -> Arc<dyn LanguageModel> {
    Arc::new(fixtures::scripted_model(20, 10, 5).with_delay(Duration::from_millis(100)))
}

async fn wait_until_idle(tracker: &ExecutionTracker) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while tracker.is_running() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("run did not finish");
}

#[tokio::test]
async fn test_dropped_trigger_lets_run_finish_and_frees_slot() {
    let service = DigestService::new(orchestrator(slow_model()));

    let waited =
        tokio::time::timeout(Duration::from_millis(50), service.trigger(TriggerSource::Manual))
            .await;
    assert!(waited.is_err());
    assert!(service.tracker().is_running());

    wait_until_idle(service.tracker()).await;

    let history = service.history(10);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, ExecutionStatus::Completed);

    let next = tokio_test::assert_ok!(service.trigger(TriggerSource::Manual).await);
    assert_eq!(next.status, ExecutionStatus::Completed);
    assert_eq!(service.history(10).len(), 2);
}

#[tokio::test]
async fn test_dropped_run_future_fails_execution() {
    let orchestrator = orchestrator(slow_model());
    let tracker = Arc::clone(orchestrator.tracker());
    let execution = tracker.begin(TriggerSource::Scheduled).unwrap();

    let waited =
        tokio::time::timeout(Duration::from_millis(50), orchestrator.run(execution.clone())).await;
    assert!(waited.is_err());

    assert!(!tracker.is_running());
    let history = tracker.history(10);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, execution.id);
    assert_eq!(history[0].status, ExecutionStatus::Failed);
    assert_eq!(history[0].failed_stage, Some(PipelinePhase::Analyzing));
    assert_eq!(history[0].error.as_deref(), Some(RUN_ABORTED));

    assert!(tracker.begin(TriggerSource::Manual).is_ok());
}

#[tokio::test]
async fn test_panicking_stage_fails_execution() {
    let service = DigestService::new(orchestrator(Arc::new(PanickingModel)));

    let execution = tokio_test::assert_ok!(service.trigger(TriggerSource::Manual).await);
    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert_eq!(execution.failed_stage, Some(PipelinePhase::Analyzing));
    assert_eq!(execution.error.as_deref(), Some(RUN_ABORTED));
    assert_eq!(execution.counters.articles_fetched, 20);
    assert!(!service.tracker().is_running());
    assert_eq!(service.history(10).len(), 1);
}

#[tokio::test]
async fn test_panicking_detached_run_frees_slot() {
    let service = DigestService::new(orchestrator(Arc::new(PanickingModel)));

    let running = tokio_test::assert_ok!(service.trigger_detached(TriggerSource::Scheduled));
    wait_until_idle(service.tracker()).await;

    let finished = service.get(running.id).expect("execution recorded");
    assert_eq!(finished.status, ExecutionStatus::Failed);
    assert_eq!(finished.error.as_deref(), Some(RUN_ABORTED));
    assert!(service.trigger_detached(TriggerSource::Manual).is_ok());
}
