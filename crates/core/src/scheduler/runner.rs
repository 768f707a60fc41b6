//! Daily scheduler task.
//!
//! Sleeps until the next configured time, then runs the job inline. A tick
//! that finds an execution already in flight is skipped, never queued, and
//! a failed scheduled run is final until the next day.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{info, warn};

use super::daily::DailySchedule;
use crate::execution::{ConflictError, Execution, ExecutionStatus};
use crate::metrics;

/// What the scheduler fires once a day.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    /// Run to completion, or report that a run is already in flight.
    async fn run_scheduled(&self) -> Result<Execution, ConflictError>;
}

/// Result of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Completed,
    Failed,
    Skipped,
}

impl TickOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            TickOutcome::Completed => "completed",
            TickOutcome::Failed => "failed",
            TickOutcome::Skipped => "skipped",
        }
    }
}

pub struct Scheduler {
    schedule: DailySchedule,
    job: Arc<dyn ScheduledJob>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Scheduler {
    pub fn new(schedule: DailySchedule, job: Arc<dyn ScheduledJob>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            schedule,
            job,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    pub fn schedule(&self) -> &DailySchedule {
        &self.schedule
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Next firing instant strictly after `now`.
    pub fn next_run_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.schedule.next_after(now)
    }

    /// Start the scheduler (spawns the background loop).
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Scheduler already running");
            return;
        }

        let schedule = self.schedule;
        let job = Arc::clone(&self.job);
        let running = Arc::clone(&self.running);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!(
                time = %schedule.at.format("%H:%M"),
                utc_offset = %schedule.offset,
                "Scheduler loop started"
            );
            loop {
                let now = Utc::now();
                let next = schedule.next_after(now);
                info!(next_run = %next, "Next scheduled run");

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Scheduler loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(schedule.until_next(now)) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        Self::tick(job.as_ref()).await;
                    }
                }
            }
            info!("Scheduler loop stopped");
        });

        info!("Scheduler started");
    }

    /// Stop the scheduler. A run in progress is not cancelled.
    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Scheduler not running");
            return;
        }
        let _ = self.shutdown_tx.send(());
        info!("Scheduler stopped");
    }

    /// Fire the job once.
    pub async fn tick(job: &dyn ScheduledJob) -> TickOutcome {
        let outcome = match job.run_scheduled().await {
            Ok(execution) if execution.status == ExecutionStatus::Completed => {
                info!(execution_id = %execution.id, "Scheduled run completed");
                TickOutcome::Completed
            }
            Ok(execution) => {
                warn!(
                    execution_id = %execution.id,
                    error = execution.error.as_deref().unwrap_or(""),
                    "Scheduled run failed; next attempt at the next scheduled time"
                );
                TickOutcome::Failed
            }
            Err(conflict) => {
                warn!(
                    running_execution_id = %conflict.running_id,
                    "Scheduled run skipped: an execution is already running"
                );
                TickOutcome::Skipped
            }
        };
        metrics::SCHEDULER_TICKS
            .with_label_values(&[outcome.as_str()])
            .inc();
        outcome
    }
}
