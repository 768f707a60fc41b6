//! Digest pipeline: phases, retries, failure taxonomy and the orchestrator
//! that composes the stages.

mod config;
mod error;
mod phase;
mod retry;
mod runner;

pub use config::{PipelineConfig, MAX_SELECTION_SIZE};
pub use error::StageFailure;
pub use phase::PipelinePhase;
pub use retry::{call_with_retry, AttemptError, BackoffPolicy, RetryExhausted, RetryPolicy};
pub use runner::{PipelineOrchestrator, RUN_ABORTED};
