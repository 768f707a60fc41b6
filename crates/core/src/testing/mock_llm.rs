//! Mock language model for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::llm::{GenerationRequest, LanguageModel, ModelError};
use crate::pipeline::PipelinePhase;
use crate::stage::prompts::task_header;

type Scripted = Result<String, ModelError>;

/// A recorded model call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Stage the prompt was routed to, if recognised.
    pub stage: Option<PipelinePhase>,
    pub prompt: String,
    pub temperature: f32,
}

/// Mock implementation of the LanguageModel trait.
///
/// Routes each prompt to its stage by the prompt header, then answers with
/// the next queued response for that stage, falling back to the stage's
/// default response. Unscripted stages answer with `ModelError::Invalid`.
///
/// # Example
///
/// ```rust,ignore
/// use veille_core::pipeline::PipelinePhase;
/// use veille_core::testing::{fixtures, MockLanguageModel};
///
/// let model = MockLanguageModel::new()
///     .with_default_response(PipelinePhase::Analyzing, fixtures::analysis_json(3));
/// model.push_error(PipelinePhase::Analyzing, ModelError::Transient("503".into())).await;
/// ```
#[derive(Debug, Default)]
pub struct MockLanguageModel {
    queued: RwLock<HashMap<PipelinePhase, VecDeque<Scripted>>>,
    defaults: RwLock<HashMap<PipelinePhase, Scripted>>,
    calls: RwLock<Vec<RecordedCall>>,
    delay: RwLock<Option<Duration>>,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `stage` with `response` whenever nothing is queued.
    pub fn with_default_response(mut self, stage: PipelinePhase, response: impl Into<String>) -> Self {
        self.defaults.get_mut().insert(stage, Ok(response.into()));
        self
    }

    /// Fail `stage` with `error` whenever nothing is queued.
    pub fn with_default_error(mut self, stage: PipelinePhase, error: ModelError) -> Self {
        self.defaults.get_mut().insert(stage, Err(error));
        self
    }

    /// Delay every answer, e.g. to keep a run in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        *self.delay.get_mut() = Some(delay);
        self
    }

    /// Queue a one-shot response for `stage`.
    pub async fn push_response(&self, stage: PipelinePhase, response: impl Into<String>) {
        self.queued
            .write()
            .await
            .entry(stage)
            .or_default()
            .push_back(Ok(response.into()));
    }

    /// Queue a one-shot error for `stage`.
    pub async fn push_error(&self, stage: PipelinePhase, error: ModelError) {
        self.queued
            .write()
            .await
            .entry(stage)
            .or_default()
            .push_back(Err(error));
    }

    pub async fn set_default_response(&self, stage: PipelinePhase, response: impl Into<String>) {
        self.defaults.write().await.insert(stage, Ok(response.into()));
    }

    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write().await = delay;
    }

    /// Number of calls routed to `stage`.
    pub async fn calls_for(&self, stage: PipelinePhase) -> usize {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.stage == Some(stage))
            .count()
    }

    pub async fn total_calls(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Prompts sent for `stage`, in call order.
    pub async fn prompts_for(&self, stage: PipelinePhase) -> Vec<String> {
        self.calls
            .read()
            .await
            .iter()
            .filter(|c| c.stage == Some(stage))
            .map(|c| c.prompt.clone())
            .collect()
    }

    pub async fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.read().await.clone()
    }

    fn route(prompt: &str) -> Option<PipelinePhase> {
        let first_line = prompt.lines().next()?;
        PipelinePhase::STAGES
            .into_iter()
            .find(|stage| first_line == task_header(*stage))
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, request: GenerationRequest) -> Result<String, ModelError> {
        let stage = Self::route(&request.prompt);
        self.calls.write().await.push(RecordedCall {
            stage,
            prompt: request.prompt.clone(),
            temperature: request.temperature,
        });

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let Some(stage) = stage else {
            return Err(ModelError::Invalid("prompt did not match any stage".to_string()));
        };

        if let Some(next) = self
            .queued
            .write()
            .await
            .get_mut(&stage)
            .and_then(|queue| queue.pop_front())
        {
            return next;
        }

        self.defaults
            .read()
            .await
            .get(&stage)
            .cloned()
            .unwrap_or_else(|| Err(ModelError::Invalid(format!("no response scripted for {}", stage))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::prompts;

    #[tokio::test]
    async fn test_routes_by_header_and_drains_queue() {
        let model = MockLanguageModel::new()
            .with_default_response(PipelinePhase::Selecting, "default");
        model.push_response(PipelinePhase::Selecting, "first").await;

        let prompt = prompts::select(&[], 5);
        let first = model.generate(GenerationRequest::new(prompt.clone())).await;
        let second = model.generate(GenerationRequest::new(prompt)).await;
        assert_eq!(first.unwrap(), "first");
        assert_eq!(second.unwrap(), "default");
        assert_eq!(model.calls_for(PipelinePhase::Selecting).await, 2);
        assert_eq!(model.calls_for(PipelinePhase::Analyzing).await, 0);
    }

    #[tokio::test]
    async fn test_unscripted_and_unknown_prompts_fail() {
        let model = MockLanguageModel::new();
        let unscripted = model
            .generate(GenerationRequest::new(prompts::analyze(&[])))
            .await;
        assert!(matches!(unscripted, Err(ModelError::Invalid(_))));

        let unknown = model.generate(GenerationRequest::new("hello")).await;
        assert!(matches!(unknown, Err(ModelError::Invalid(_))));
        assert_eq!(model.total_calls().await, 2);
    }
}
