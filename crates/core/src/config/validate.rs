use super::{types::Config, ConfigError};
use crate::pipeline::MAX_SELECTION_SIZE;
use crate::scheduler::DailySchedule;

/// Longest configurable backoff cap (one hour).
pub const MAX_RETRY_DELAY_MS: u64 = 3_600_000;

/// Largest rate-limit backoff multiplier.
pub const MAX_RATE_LIMIT_MULTIPLIER: u32 = 100;

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(message.into())
}

fn require_secret(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{} must be set", name)));
    }
    Ok(())
}

/// Validate configuration
/// Currently validates:
/// - Server port is not 0, API key (if present) is not empty
/// - Credentials of the news source, model and messenger are set
/// - Schedule time and offset parse
/// - Pipeline bounds (attempts, backoff, call timeout, selection size) and news limit
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port cannot be 0"));
    }
    if let Some(key) = &config.server.api_key {
        require_secret("server.api_key", key)?;
    }

    require_secret("news.api_key", &config.news.api_key)?;
    require_secret("llm.api_key", &config.llm.api_key)?;
    require_secret("messenger.bot_token", &config.messenger.bot_token)?;
    require_secret("messenger.chat_id", &config.messenger.chat_id)?;

    if config.news.limit == 0 {
        return Err(invalid("news.limit cannot be 0"));
    }

    DailySchedule::from_config(&config.schedule)
        .map_err(|e| invalid(format!("schedule: {}", e)))?;

    if config.pipeline.max_attempts == 0 {
        return Err(invalid("pipeline.max_attempts cannot be 0"));
    }
    if config.pipeline.retry_max_delay_ms > MAX_RETRY_DELAY_MS {
        return Err(invalid(format!(
            "pipeline.retry_max_delay_ms cannot exceed {}",
            MAX_RETRY_DELAY_MS
        )));
    }
    if config.pipeline.retry_base_delay_ms > config.pipeline.retry_max_delay_ms {
        return Err(invalid(
            "pipeline.retry_base_delay_ms cannot exceed pipeline.retry_max_delay_ms",
        ));
    }
    if !(1..=MAX_RATE_LIMIT_MULTIPLIER).contains(&config.pipeline.rate_limit_multiplier) {
        return Err(invalid(format!(
            "pipeline.rate_limit_multiplier must be between 1 and {}",
            MAX_RATE_LIMIT_MULTIPLIER
        )));
    }
    if config.pipeline.call_timeout_secs == 0 {
        return Err(invalid("pipeline.call_timeout_secs cannot be 0"));
    }
    if !(1..=MAX_SELECTION_SIZE).contains(&config.pipeline.selection_size) {
        return Err(invalid(format!(
            "pipeline.selection_size must be between 1 and {}",
            MAX_SELECTION_SIZE
        )));
    }

    Ok(())
}
