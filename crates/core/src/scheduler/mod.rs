//! Daily trigger of the digest pipeline.

mod config;
mod daily;
mod runner;

pub use config::ScheduleConfig;
pub use daily::{parse_utc_offset, DailySchedule, ScheduleError};
pub use runner::{ScheduledJob, Scheduler, TickOutcome};
