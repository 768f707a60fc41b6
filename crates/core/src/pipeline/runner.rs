//! Pipeline orchestrator.
//!
//! Drives one execution through the linear chain
//! fetch → analyze → extract → select → translate → deliver.
//! Each stage's output is validated before it feeds the next stage; any
//! terminal failure stops the run and is recorded on the execution.

use std::sync::Arc;
use std::time::Instant;

use chrono::{FixedOffset, Offset, Utc};
use tracing::{debug, error, info, warn};

use super::config::PipelineConfig;
use super::error::StageFailure;
use super::phase::PipelinePhase;
use super::retry::{call_with_retry, AttemptError, RetryPolicy};
use crate::execution::{Execution, ExecutionId, ExecutionTracker};
use crate::llm::{GenerationRequest, LanguageModel, ModelError};
use crate::messenger::{format_digest, format_failure_notice, DeliveryError, Messenger};
use crate::metrics;
use crate::news::{Article, FetchError, NewsSource};
use crate::stage::{StageContract, StageContracts};

/// Error recorded when the task driving an execution stops before the
/// execution reaches a terminal state.
pub const RUN_ABORTED: &str = "run aborted";

/// Releases the run slot if `run` is dropped or unwinds before recording an
/// outcome.
struct RunGuard<'a> {
    tracker: &'a ExecutionTracker,
    id: ExecutionId,
    armed: bool,
}

impl<'a> RunGuard<'a> {
    fn new(tracker: &'a ExecutionTracker, id: ExecutionId) -> Self {
        Self {
            tracker,
            id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match self.tracker.abandon(self.id, RUN_ABORTED) {
            Ok(execution) => warn!(
                execution_id = %self.id,
                stage = ?execution.failed_stage,
                "Pipeline run aborted before finishing"
            ),
            Err(e) => warn!(execution_id = %self.id, error = %e, "Failed to release aborted run"),
        }
    }
}

/// Runs the stages of an execution that was begun on the tracker.
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    contracts: StageContracts,
    retry: RetryPolicy,
    news_limit: usize,
    display_offset: FixedOffset,
    news: Arc<dyn NewsSource>,
    model: Arc<dyn LanguageModel>,
    messenger: Arc<dyn Messenger>,
    tracker: Arc<ExecutionTracker>,
}

impl PipelineOrchestrator {
    pub fn new(
        config: PipelineConfig,
        news_limit: usize,
        news: Arc<dyn NewsSource>,
        model: Arc<dyn LanguageModel>,
        messenger: Arc<dyn Messenger>,
        tracker: Arc<ExecutionTracker>,
    ) -> Self {
        Self {
            contracts: StageContracts::new(config.selection_size, config.target_language.clone()),
            retry: RetryPolicy::from_config(&config),
            config,
            news_limit,
            display_offset: Utc.fix(),
            news,
            model,
            messenger,
            tracker,
        }
    }

    /// Offset used for timestamps in delivered messages.
    pub fn with_display_offset(mut self, offset: FixedOffset) -> Self {
        self.display_offset = offset;
        self
    }

    /// Override the retry policy (tests use a zero backoff).
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn tracker(&self) -> &Arc<ExecutionTracker> {
        &self.tracker
    }

    /// Drive `execution` to a terminal record. Never fails: every error ends
    /// up on the returned execution. Dropping the future, or a panic inside
    /// a stage, fails the execution with [`RUN_ABORTED`].
    pub async fn run(&self, execution: Execution) -> Execution {
        let id = execution.id;
        let started = Instant::now();
        let mut guard = RunGuard::new(&self.tracker, id);
        info!(execution_id = %id, trigger = %execution.trigger, "Pipeline run started");

        match self.execute(id).await {
            Ok(()) => {
                info!(
                    execution_id = %id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Pipeline run completed"
                );
                let finished = self
                    .tracker
                    .complete(id, true)
                    .unwrap_or_else(|e| self.fallback_record(id, execution, e));
                guard.disarm();
                finished
            }
            Err(failure) => {
                let stage = failure.stage();
                let message = failure.to_string();
                error!(execution_id = %id, stage = %stage, error = %message, "Pipeline run failed");

                let finished = self
                    .tracker
                    .fail(id, stage, message.clone())
                    .unwrap_or_else(|e| self.fallback_record(id, execution, e));
                guard.disarm();

                if self.config.notify_on_failure && !failure.is_delivery() {
                    self.notify_failure(id, stage, &message).await;
                }
                finished
            }
        }
    }

    fn fallback_record(
        &self,
        id: ExecutionId,
        execution: Execution,
        err: crate::execution::TrackerError,
    ) -> Execution {
        warn!(execution_id = %id, error = %err, "Tracker rejected terminal transition");
        self.tracker.get(id).unwrap_or(execution)
    }

    async fn execute(&self, id: ExecutionId) -> Result<(), StageFailure> {
        let articles = self.fetch().await?;
        self.record(id, |c| c.articles_fetched = articles.len());

        self.enter(id, PipelinePhase::Analyzing);
        let analysis = self.run_stage(&self.contracts.analyze, &articles[..]).await?;
        self.record(id, |c| c.articles_categorized = analysis.articles.len());

        self.enter(id, PipelinePhase::Extracting);
        let extraction = self
            .run_stage(&self.contracts.extract, &analysis.articles[..])
            .await?;
        self.record(id, |c| c.ideas_extracted = extraction.ideas.len());

        self.enter(id, PipelinePhase::Selecting);
        let selection = self
            .run_stage(&self.contracts.select, &extraction.ideas[..])
            .await?;
        self.record(id, |c| c.ideas_selected = selection.ideas.len());
        if !selection.reflection.is_empty() {
            debug!(execution_id = %id, reflection = %selection.reflection, "Selection reflection");
        }

        self.enter(id, PipelinePhase::Translating);
        let translation = self
            .run_stage(&self.contracts.translate, &selection.ideas[..])
            .await?;
        self.record(id, |c| c.ideas_translated = translation.ideas.len());

        self.enter(id, PipelinePhase::Delivering);
        let generated_at = Utc::now().with_timezone(&self.display_offset);
        let digest = format_digest(&translation.ideas, &generated_at);
        self.deliver(&digest).await
    }

    fn enter(&self, id: ExecutionId, phase: PipelinePhase) {
        if let Err(e) = self.tracker.advance(id, phase) {
            warn!(execution_id = %id, phase = %phase, error = %e, "Failed to advance execution");
        }
    }

    fn record<F>(&self, id: ExecutionId, mutation: F)
    where
        F: FnOnce(&mut crate::execution::ExecutionCounters),
    {
        if let Err(e) = self.tracker.record(id, mutation) {
            warn!(execution_id = %id, error = %e, "Failed to record execution counters");
        }
    }

    async fn fetch(&self) -> Result<Vec<Article>, FetchError> {
        let started = Instant::now();
        let result =
            match tokio::time::timeout(self.config.call_timeout(), self.news.fetch_latest(self.news_limit))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout),
            };

        let outcome = match result {
            Ok(mut articles) if !articles.is_empty() => {
                articles.truncate(self.news_limit);
                info!(
                    source = %self.news.name(),
                    count = articles.len(),
                    "Fetched articles"
                );
                Ok(articles)
            }
            Ok(_) => Err(FetchError::Empty),
            Err(e) => Err(e),
        };

        metrics::STAGE_DURATION
            .with_label_values(&[
                PipelinePhase::Fetching.label(),
                if outcome.is_ok() { "success" } else { "failure" },
            ])
            .observe(started.elapsed().as_secs_f64());
        outcome
    }

    async fn run_stage<S: StageContract>(
        &self,
        stage: &S,
        input: &S::Input,
    ) -> Result<S::Output, StageFailure> {
        let phase = stage.phase();
        let started = Instant::now();
        let request =
            GenerationRequest::new(stage.build_prompt(input)).with_temperature(stage.temperature());

        let result = call_with_retry(&self.retry, phase, |attempt| {
            let request = request.clone();
            async move {
                debug!(stage = %phase, attempt, "Calling language model");
                let raw = self.generate(phase, request).await.map_err(AttemptError::Model)?;
                match stage.validate(input, &raw) {
                    Ok(parsed) => {
                        let outcome = if parsed.wrapped {
                            "wrapped"
                        } else {
                            parsed.strategy.as_str()
                        };
                        metrics::OUTPUT_REPAIRS
                            .with_label_values(&[phase.label(), outcome])
                            .inc();
                        if parsed.was_repaired() {
                            info!(stage = %phase, strategy = outcome, "Repaired model output");
                        }
                        Ok(parsed.value)
                    }
                    Err(e) => {
                        metrics::OUTPUT_REPAIRS
                            .with_label_values(&[phase.label(), "rejected"])
                            .inc();
                        warn!(
                            stage = %phase,
                            attempt,
                            reason = %e.reason,
                            raw = %e.raw_excerpt(),
                            "Model output rejected"
                        );
                        Err(AttemptError::Validation(e))
                    }
                }
            }
        })
        .await;

        metrics::STAGE_DURATION
            .with_label_values(&[
                phase.label(),
                if result.is_ok() { "success" } else { "failure" },
            ])
            .observe(started.elapsed().as_secs_f64());

        result.map_err(|exhausted| StageFailure::from_exhausted(phase, exhausted))
    }

    async fn generate(
        &self,
        phase: PipelinePhase,
        request: GenerationRequest,
    ) -> Result<String, ModelError> {
        let timeout = self.config.call_timeout();
        let result = match tokio::time::timeout(timeout, self.model.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(ModelError::Transient(format!(
                "model call timed out after {}s",
                timeout.as_secs()
            ))),
        };

        let label = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        metrics::MODEL_CALLS
            .with_label_values(&[phase.label(), label])
            .inc();
        result
    }

    async fn deliver(&self, text: &str) -> Result<(), StageFailure> {
        let outcome = self.send("digest", text).await;
        match outcome {
            Ok(true) => {
                info!(messenger = %self.messenger.name(), "Digest delivered");
                Ok(())
            }
            Ok(false) => Err(StageFailure::DeliveryRejected),
            Err(e) => Err(StageFailure::Delivery(e)),
        }
    }

    async fn send(&self, kind: &str, text: &str) -> Result<bool, DeliveryError> {
        let outcome =
            match tokio::time::timeout(self.config.call_timeout(), self.messenger.deliver(text))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(DeliveryError::Timeout),
            };

        let label = match &outcome {
            Ok(true) => "delivered",
            Ok(false) => "rejected",
            Err(_) => "error",
        };
        metrics::DELIVERIES.with_label_values(&[kind, label]).inc();
        outcome
    }

    /// Best-effort failure notice; its own failures are only logged.
    async fn notify_failure(&self, id: ExecutionId, stage: PipelinePhase, message: &str) {
        let at = Utc::now().with_timezone(&self.display_offset);
        let text = format_failure_notice(&id.to_string(), stage.label(), message, &at);
        match self.send("failure_notice", &text).await {
            Ok(true) => info!(execution_id = %id, "Failure notice sent"),
            Ok(false) => warn!(execution_id = %id, "Failure notice not accepted"),
            Err(e) => warn!(execution_id = %id, error = %e, "Failed to send failure notice"),
        }
    }
}
