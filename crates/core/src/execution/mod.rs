//! Execution records, the single-slot tracker and history persistence.

mod store;
mod tracker;
mod types;

pub use store::{HistoryStore, HistoryStoreError, JsonlHistoryStore};
pub use tracker::{ExecutionTracker, DEFAULT_RETAIN};
pub use types::{
    ConflictError, Execution, ExecutionCounters, ExecutionId, ExecutionStatus, TrackerError,
    TriggerSource,
};
