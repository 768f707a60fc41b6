//! Scheduler configuration.

use serde::{Deserialize, Serialize};

/// When the daily run fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Enable/disable the daily timer. Manual triggers work either way.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Local time of day, `HH:MM`.
    #[serde(default = "default_time")]
    pub time: String,

    /// Fixed offset of the local time from UTC, `+HH:MM` or `-HH:MM`.
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

fn default_enabled() -> bool {
    true
}

fn default_time() -> String {
    "09:00".to_string()
}

fn default_utc_offset() -> String {
    "+00:00".to_string()
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            time: default_time(),
            utc_offset: default_utc_offset(),
        }
    }
}
