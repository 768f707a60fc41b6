//! Execution record and tracker errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::pipeline::PipelinePhase;

/// Opaque unique identifier of an execution.
pub type ExecutionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What started an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    Manual,
    Scheduled,
}

impl TriggerSource {
    pub fn as_str(self) -> &'static str {
        match self {
            TriggerSource::Manual => "manual",
            TriggerSource::Scheduled => "scheduled",
        }
    }
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Item counts at each step of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionCounters {
    pub articles_fetched: usize,
    pub articles_categorized: usize,
    pub ideas_extracted: usize,
    pub ideas_selected: usize,
    pub ideas_translated: usize,
}

/// One pipeline run.
///
/// Created by `ExecutionTracker::begin`, mutated only through the tracker
/// while running, immutable once finished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    pub id: ExecutionId,
    pub status: ExecutionStatus,
    pub trigger: TriggerSource,
    pub phase: PipelinePhase,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub counters: ExecutionCounters,
    #[serde(default)]
    pub delivered: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub failed_stage: Option<PipelinePhase>,
}

impl Execution {
    pub(crate) fn start(trigger: TriggerSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            status: ExecutionStatus::Running,
            trigger,
            phase: PipelinePhase::Fetching,
            started_at: Utc::now(),
            completed_at: None,
            counters: ExecutionCounters::default(),
            delivered: false,
            error: None,
            failed_stage: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == ExecutionStatus::Running
    }

    /// Wall-clock duration, once finished.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.completed_at.map(|end| end - self.started_at)
    }
}

/// `begin()` was called while another execution is in flight.
#[derive(Debug, Clone, Error)]
#[error("an execution is already running ({running_id})")]
pub struct ConflictError {
    pub running_id: ExecutionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    #[error("unknown execution {0}")]
    UnknownExecution(ExecutionId),

    #[error("execution {0} is not running")]
    NotRunning(ExecutionId),

    #[error("illegal phase transition {from} -> {to}")]
    IllegalTransition {
        from: PipelinePhase,
        to: PipelinePhase,
    },
}
