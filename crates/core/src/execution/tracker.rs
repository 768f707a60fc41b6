//! Process-wide record of the running and past executions.
//!
//! A single slot guards "at most one execution in flight": `begin()` is a
//! check-and-set under one short critical section. The lock is a std mutex
//! and is never held across an await point. Finished executions are handed
//! to the history store while the lock is held.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::store::{HistoryStore, HistoryStoreError};
use super::types::{
    ConflictError, Execution, ExecutionCounters, ExecutionId, ExecutionStatus, TrackerError,
    TriggerSource,
};
use crate::metrics;
use crate::pipeline::PipelinePhase;

/// Default number of executions kept in memory.
pub const DEFAULT_RETAIN: usize = 50;

struct TrackerState {
    current: Option<Execution>,
    /// Most recent first.
    history: VecDeque<Execution>,
}

pub struct ExecutionTracker {
    state: Mutex<TrackerState>,
    retain: usize,
    store: Option<Arc<dyn HistoryStore>>,
}

impl Default for ExecutionTracker {
    fn default() -> Self {
        Self::new(DEFAULT_RETAIN)
    }
}

impl ExecutionTracker {
    /// In-memory tracker keeping at most `retain` finished executions.
    pub fn new(retain: usize) -> Self {
        Self {
            state: Mutex::new(TrackerState {
                current: None,
                history: VecDeque::new(),
            }),
            retain: retain.max(1),
            store: None,
        }
    }

    /// Tracker backed by a durable store. Past executions are loaded from it.
    pub fn with_store(
        retain: usize,
        store: Arc<dyn HistoryStore>,
    ) -> Result<Self, HistoryStoreError> {
        let mut tracker = Self::new(retain);
        let loaded = store.load()?;
        let loaded_count = loaded.len();
        {
            let mut state = tracker.lock();
            state.history = loaded.into_iter().rev().take(tracker.retain).collect();
        }
        info!(loaded = loaded_count, retained = tracker.retain, "Loaded execution history");
        tracker.store = Some(store);
        Ok(tracker)
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the run slot. Rejects immediately when a run is in flight.
    pub fn begin(&self, trigger: TriggerSource) -> Result<Execution, ConflictError> {
        let mut state = self.lock();
        if let Some(running) = &state.current {
            metrics::EXECUTION_CONFLICTS
                .with_label_values(&[trigger.as_str()])
                .inc();
            return Err(ConflictError {
                running_id: running.id,
            });
        }
        let execution = Execution::start(trigger);
        state.current = Some(execution.clone());
        drop(state);

        info!(execution_id = %execution.id, trigger = %trigger, "Execution started");
        Ok(execution)
    }

    /// Move the running execution to `phase`.
    pub fn advance(&self, id: ExecutionId, phase: PipelinePhase) -> Result<Execution, TrackerError> {
        let mut state = self.lock();
        let current = Self::running_mut(&mut state, id)?;
        if phase == PipelinePhase::Failed || !current.phase.can_transition_to(phase) {
            return Err(TrackerError::IllegalTransition {
                from: current.phase,
                to: phase,
            });
        }
        current.phase = phase;
        debug!(execution_id = %id, phase = %phase, "Execution advanced");
        Ok(current.clone())
    }

    /// Update the counters of the running execution.
    pub fn record<F>(&self, id: ExecutionId, mutation: F) -> Result<Execution, TrackerError>
    where
        F: FnOnce(&mut ExecutionCounters),
    {
        let mut state = self.lock();
        let current = Self::running_mut(&mut state, id)?;
        mutation(&mut current.counters);
        Ok(current.clone())
    }

    /// Mark the execution completed. Idempotent.
    pub fn complete(&self, id: ExecutionId, delivered: bool) -> Result<Execution, TrackerError> {
        self.finish(id, |execution| {
            execution.status = ExecutionStatus::Completed;
            execution.phase = PipelinePhase::Done;
            execution.delivered = delivered;
        })
    }

    /// Mark the execution failed at `stage`. Idempotent: a second call keeps
    /// the first recorded outcome.
    pub fn fail(
        &self,
        id: ExecutionId,
        stage: PipelinePhase,
        error: impl Into<String>,
    ) -> Result<Execution, TrackerError> {
        let error = error.into();
        self.finish(id, |execution| {
            execution.status = ExecutionStatus::Failed;
            execution.phase = PipelinePhase::Failed;
            execution.failed_stage = Some(stage);
            execution.error = Some(error);
        })
    }

    /// Fail the running execution at whatever phase it reached. Used when
    /// the task driving it stops before recording an outcome. Idempotent.
    pub fn abandon(
        &self,
        id: ExecutionId,
        reason: impl Into<String>,
    ) -> Result<Execution, TrackerError> {
        let reason = reason.into();
        self.finish(id, |execution| {
            execution.failed_stage = Some(execution.phase);
            execution.status = ExecutionStatus::Failed;
            execution.phase = PipelinePhase::Failed;
            execution.error = Some(reason);
        })
    }

    fn finish<F>(&self, id: ExecutionId, apply: F) -> Result<Execution, TrackerError>
    where
        F: FnOnce(&mut Execution),
    {
        let finished = {
            let mut state = self.lock();
            match state.current.take() {
                Some(mut execution) if execution.id == id => {
                    apply(&mut execution);
                    execution.completed_at = Some(Utc::now());
                    state.history.push_front(execution.clone());
                    state.history.truncate(self.retain);
                    // Appended under the lock so the log order matches the
                    // order in which runs finished.
                    if let Some(store) = &self.store {
                        if let Err(e) = store.append(&execution) {
                            warn!(execution_id = %id, error = %e, "Failed to persist execution");
                        }
                    }
                    execution
                }
                other => {
                    state.current = other;
                    return state
                        .history
                        .iter()
                        .find(|e| e.id == id)
                        .cloned()
                        .ok_or(TrackerError::UnknownExecution(id));
                }
            }
        };

        let elapsed = finished
            .duration()
            .and_then(|d| d.to_std().ok())
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        metrics::EXECUTIONS_TOTAL
            .with_label_values(&[finished.status.as_str(), finished.trigger.as_str()])
            .inc();
        metrics::EXECUTION_DURATION
            .with_label_values(&[finished.status.as_str()])
            .observe(elapsed);

        info!(
            execution_id = %finished.id,
            status = %finished.status,
            duration_secs = elapsed,
            "Execution finished"
        );
        Ok(finished)
    }

    fn running_mut(
        state: &mut TrackerState,
        id: ExecutionId,
    ) -> Result<&mut Execution, TrackerError> {
        match state.current.as_mut() {
            Some(execution) if execution.id == id => Ok(execution),
            _ if state.history.iter().any(|e| e.id == id) => Err(TrackerError::NotRunning(id)),
            _ => Err(TrackerError::UnknownExecution(id)),
        }
    }

    /// The running execution, if any.
    pub fn current(&self) -> Option<Execution> {
        self.lock().current.clone()
    }

    pub fn is_running(&self) -> bool {
        self.lock().current.is_some()
    }

    /// Finished executions, most recent first, at most `limit`.
    pub fn history(&self, limit: usize) -> Vec<Execution> {
        self.lock().history.iter().take(limit).cloned().collect()
    }

    /// Most recently finished execution.
    pub fn last_finished(&self) -> Option<Execution> {
        self.lock().history.front().cloned()
    }

    /// Running or finished execution by id.
    pub fn get(&self, id: ExecutionId) -> Option<Execution> {
        let state = self.lock();
        state
            .current
            .iter()
            .chain(state.history.iter())
            .find(|e| e.id == id)
            .cloned()
    }
}
