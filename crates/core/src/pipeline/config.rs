//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for the number of selected ideas.
pub const MAX_SELECTION_SIZE: usize = 5;

/// Configuration for the digest pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Attempts per model call, the first one included.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay of the exponential backoff (milliseconds).
    #[serde(default = "default_base_delay")]
    pub retry_base_delay_ms: u64,

    /// Cap of the exponential backoff (milliseconds).
    #[serde(default = "default_max_delay")]
    pub retry_max_delay_ms: u64,

    /// Backoff multiplier applied on rate limits when the provider sends
    /// no Retry-After.
    #[serde(default = "default_rate_limit_multiplier")]
    pub rate_limit_multiplier: u32,

    /// Timeout of every external call (seconds).
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,

    /// Number of ideas kept by the selection stage (1..=5).
    #[serde(default = "default_selection_size")]
    pub selection_size: usize,

    /// Language of the delivered explanations.
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Ask the model again when its output cannot be repaired.
    /// Consumes attempts from the same budget.
    #[serde(default)]
    pub regenerate_invalid_output: bool,

    /// Send a short notice through the messenger when a run fails
    /// before delivery.
    #[serde(default)]
    pub notify_on_failure: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    30_000
}

fn default_rate_limit_multiplier() -> u32 {
    4
}

fn default_call_timeout() -> u64 {
    120
}

fn default_selection_size() -> usize {
    MAX_SELECTION_SIZE
}

fn default_target_language() -> String {
    "Moroccan Darija".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_base_delay(),
            retry_max_delay_ms: default_max_delay(),
            rate_limit_multiplier: default_rate_limit_multiplier(),
            call_timeout_secs: default_call_timeout(),
            selection_size: default_selection_size(),
            target_language: default_target_language(),
            regenerate_invalid_output: false,
            notify_on_failure: false,
        }
    }
}

impl PipelineConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_base_delay_ms, 1000);
        assert_eq!(config.retry_max_delay_ms, 30_000);
        assert_eq!(config.rate_limit_multiplier, 4);
        assert_eq!(config.selection_size, 5);
        assert_eq!(config.target_language, "Moroccan Darija");
        assert!(!config.regenerate_invalid_output);
        assert!(!config.notify_on_failure);
        assert_eq!(config.call_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            max_attempts = 5
            regenerate_invalid_output = true
        "#;
        let config: PipelineConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.max_attempts, 5);
        assert!(config.regenerate_invalid_output);
        assert_eq!(config.selection_size, 5);
    }
}
