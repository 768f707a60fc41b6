//! Public facade over the tracker and the orchestrator.
//!
//! The HTTP layer, the CLI and the scheduler all enter through here, so
//! every run goes through the tracker's single-slot gate.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::execution::{ConflictError, Execution, ExecutionId, ExecutionTracker, TriggerSource};
use crate::pipeline::{PipelineOrchestrator, RUN_ABORTED};
use crate::scheduler::{DailySchedule, ScheduledJob};

/// Default number of executions returned by `history`.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Snapshot of the pipeline for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    pub is_running: bool,
    pub current: Option<Execution>,
    pub last_execution: Option<Execution>,
    pub next_scheduled_run: Option<DateTime<Utc>>,
}

pub struct DigestService {
    tracker: Arc<ExecutionTracker>,
    orchestrator: Arc<PipelineOrchestrator>,
    schedule: Option<DailySchedule>,
}

impl DigestService {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>) -> Self {
        Self {
            tracker: Arc::clone(orchestrator.tracker()),
            orchestrator,
            schedule: None,
        }
    }

    /// Report the next run of this schedule in `status()`.
    pub fn with_schedule(mut self, schedule: DailySchedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    pub fn tracker(&self) -> &Arc<ExecutionTracker> {
        &self.tracker
    }

    /// Run one execution to its terminal record.
    ///
    /// The run itself is a spawned task: dropping this future stops the wait,
    /// not the run, and the slot is released when the run finishes.
    pub async fn trigger(&self, source: TriggerSource) -> Result<Execution, ConflictError> {
        let execution = self.tracker.begin(source)?;
        let id = execution.id;
        let orchestrator = Arc::clone(&self.orchestrator);
        let running = execution.clone();
        let handle = tokio::spawn(async move { orchestrator.run(running).await });

        match handle.await {
            Ok(finished) => Ok(finished),
            Err(e) => {
                error!(execution_id = %id, error = %e, "Execution task aborted");
                Ok(self
                    .tracker
                    .abandon(id, RUN_ABORTED)
                    .ok()
                    .or_else(|| self.tracker.get(id))
                    .unwrap_or(execution))
            }
        }
    }

    /// Begin an execution and return its running record; the run continues
    /// in a background task.
    pub fn trigger_detached(&self, source: TriggerSource) -> Result<Execution, ConflictError> {
        let execution = self.tracker.begin(source)?;
        let orchestrator = Arc::clone(&self.orchestrator);
        let running = execution.clone();
        tokio::spawn(async move {
            orchestrator.run(running).await;
        });
        info!(execution_id = %execution.id, "Execution detached");
        Ok(execution)
    }

    pub fn status(&self) -> PipelineStatus {
        let current = self.tracker.current();
        PipelineStatus {
            is_running: current.is_some(),
            current,
            last_execution: self.tracker.last_finished(),
            next_scheduled_run: self.schedule.map(|s| s.next_after(Utc::now())),
        }
    }

    /// Finished executions, most recent first.
    pub fn history(&self, limit: usize) -> Vec<Execution> {
        self.tracker.history(limit)
    }

    pub fn get(&self, id: ExecutionId) -> Option<Execution> {
        self.tracker.get(id)
    }
}

#[async_trait]
impl ScheduledJob for DigestService {
    async fn run_scheduled(&self) -> Result<Execution, ConflictError> {
        self.trigger(TriggerSource::Scheduled).await
    }
}
