//! Bounded retries with backoff for model calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::config::PipelineConfig;
use super::phase::PipelinePhase;
use crate::llm::ModelError;
use crate::metrics;
use crate::stage::ValidationError;

/// Backoff policy controlling the delay between attempts.
#[derive(Debug, Clone)]
pub enum BackoffPolicy {
    /// Exponential backoff: base * 2^attempt, capped at max.
    Exponential { base: Duration, max: Duration },
    /// No delay between attempts.
    None,
}

impl BackoffPolicy {
    /// Compute the delay after a given failed attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        match self {
            BackoffPolicy::Exponential { base, max } => {
                let millis = (base.as_millis() as u64).saturating_mul(2u64.saturating_pow(attempt));
                Duration::from_millis(millis).min(*max)
            }
            BackoffPolicy::None => Duration::ZERO,
        }
    }

    fn cap(&self) -> Duration {
        match self {
            BackoffPolicy::Exponential { max, .. } => *max,
            BackoffPolicy::None => Duration::ZERO,
        }
    }
}

/// Attempt budget and delays for one stage's model call.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
    pub rate_limit_multiplier: u32,
    /// Unrepairable output consumes an attempt instead of failing the stage.
    pub regenerate_invalid_output: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: BackoffPolicy::Exponential {
                base: Duration::from_millis(config.retry_base_delay_ms),
                max: Duration::from_millis(config.retry_max_delay_ms),
            },
            rate_limit_multiplier: config.rate_limit_multiplier.max(1),
            regenerate_invalid_output: config.regenerate_invalid_output,
        }
    }

    /// Delay before the attempt following failed attempt `attempt` (0-indexed).
    ///
    /// Rate limits wait longer; a provider Retry-After is honoured up to the
    /// rate-limit cap.
    pub fn delay_for(&self, attempt: u32, error: &AttemptError) -> Duration {
        let base = self.backoff.delay_for_attempt(attempt);
        match error {
            AttemptError::Model(ModelError::RateLimited { retry_after }) => {
                let cap = saturating_scale(self.backoff.cap(), self.rate_limit_multiplier);
                match retry_after {
                    Some(after) => (*after).min(cap),
                    None => saturating_scale(base, self.rate_limit_multiplier).min(cap),
                }
            }
            _ => base,
        }
    }
}

fn saturating_scale(delay: Duration, factor: u32) -> Duration {
    delay.checked_mul(factor).unwrap_or(Duration::MAX)
}

/// Failure of a single attempt.
#[derive(Debug, Clone)]
pub enum AttemptError {
    Model(ModelError),
    Validation(ValidationError),
}

impl AttemptError {
    /// Metrics label when the error is worth another attempt.
    fn retry_kind(&self, regenerate_invalid_output: bool) -> Option<&'static str> {
        match self {
            AttemptError::Model(e) if e.is_retryable() => Some(e.kind()),
            AttemptError::Validation(_) if regenerate_invalid_output => Some("validation"),
            _ => None,
        }
    }
}

/// Terminal outcome of a retried call.
#[derive(Debug, Clone)]
pub struct RetryExhausted {
    pub error: AttemptError,
    pub attempts: u32,
}

/// Run `f` until it succeeds, a non-retryable error occurs, or the attempt
/// budget is spent. `f` receives the 1-based attempt number.
pub async fn call_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    stage: PipelinePhase,
    mut f: F,
) -> Result<T, RetryExhausted>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AttemptError>>,
{
    let mut attempt: u32 = 1;
    loop {
        let error = match f(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        let kind = match error.retry_kind(policy.regenerate_invalid_output) {
            Some(kind) if attempt < policy.max_attempts => kind,
            _ => {
                return Err(RetryExhausted {
                    error,
                    attempts: attempt,
                })
            }
        };

        let delay = policy.delay_for(attempt - 1, &error);
        metrics::RETRIES
            .with_label_values(&[stage.label(), kind])
            .inc();
        warn!(
            stage = %stage,
            attempt,
            max_attempts = policy.max_attempts,
            kind,
            delay_ms = delay.as_millis() as u64,
            "Model call failed, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy(max_attempts: u32, regenerate: bool) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: BackoffPolicy::None,
            rate_limit_multiplier: 4,
            regenerate_invalid_output: regenerate,
        }
    }

    fn invalid_output() -> AttemptError {
        AttemptError::Validation(ValidationError::new(
            PipelinePhase::Extracting,
            "bad",
            "raw",
        ))
    }

    #[test]
    fn test_exponential_backoff_capped() {
        let backoff = BackoffPolicy::Exponential {
            base: Duration::from_millis(1000),
            max: Duration::from_millis(5000),
        };
        assert_eq!(backoff.delay_for_attempt(0), Duration::from_millis(1000));
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(2000));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_millis(4000));
        assert_eq!(backoff.delay_for_attempt(3), Duration::from_millis(5000));
        assert_eq!(backoff.delay_for_attempt(60), Duration::from_millis(5000));
    }

    #[test]
    fn test_rate_limit_waits_longer() {
        let policy = RetryPolicy::from_config(&PipelineConfig::default());
        let transient = AttemptError::Model(ModelError::Transient("503".into()));
        let limited = AttemptError::Model(ModelError::RateLimited { retry_after: None });
        assert_eq!(policy.delay_for(0, &transient), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(0, &limited), Duration::from_millis(4000));
    }

    #[test]
    fn test_retry_after_honoured_and_capped() {
        let policy = RetryPolicy::from_config(&PipelineConfig::default());
        let short = AttemptError::Model(ModelError::RateLimited {
            retry_after: Some(Duration::from_secs(7)),
        });
        assert_eq!(policy.delay_for(0, &short), Duration::from_secs(7));

        let huge = AttemptError::Model(ModelError::RateLimited {
            retry_after: Some(Duration::from_secs(3600)),
        });
        assert_eq!(policy.delay_for(0, &huge), Duration::from_secs(120));
    }

    #[test]
    fn test_rate_limit_delay_saturates_instead_of_overflowing() {
        let config = PipelineConfig {
            retry_max_delay_ms: u64::MAX,
            rate_limit_multiplier: 2000,
            ..PipelineConfig::default()
        };
        let policy = RetryPolicy::from_config(&config);
        let limited = AttemptError::Model(ModelError::RateLimited { retry_after: None });

        assert_eq!(policy.delay_for(0, &limited), Duration::from_millis(1000 * 2000));
        assert_eq!(policy.delay_for(80, &limited), Duration::MAX);

        let after = AttemptError::Model(ModelError::RateLimited {
            retry_after: Some(Duration::from_secs(30)),
        });
        assert_eq!(policy.delay_for(0, &after), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_transient_then_success() {
        let calls = AtomicU32::new(0);
        let result = call_with_retry(&policy(3, false), PipelinePhase::Analyzing, |_| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(AttemptError::Model(ModelError::Transient("503".into())))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_budget_exhausted() {
        let result: Result<(), _> =
            call_with_retry(&policy(3, false), PipelinePhase::Analyzing, |_| async {
                Err(AttemptError::Model(ModelError::RateLimited { retry_after: None }))
            })
            .await;
        let exhausted = result.unwrap_err();
        assert_eq!(exhausted.attempts, 3);
        assert!(matches!(
            exhausted.error,
            AttemptError::Model(ModelError::RateLimited { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_request_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> =
            call_with_retry(&policy(3, true), PipelinePhase::Selecting, |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(AttemptError::Model(ModelError::Invalid("400".into()))) }
            })
            .await;
        assert_eq!(result.unwrap_err().attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_validation_retried_only_when_regenerating() {
        let result: Result<(), _> =
            call_with_retry(&policy(3, false), PipelinePhase::Extracting, |_| async {
                Err(invalid_output())
            })
            .await;
        assert_eq!(result.unwrap_err().attempts, 1);

        let attempts_seen = AtomicU32::new(0);
        let result: Result<(), _> =
            call_with_retry(&policy(3, true), PipelinePhase::Extracting, |attempt| {
                attempts_seen.store(attempt, Ordering::SeqCst);
                async { Err(invalid_output()) }
            })
            .await;
        assert_eq!(result.unwrap_err().attempts, 3);
        assert_eq!(attempts_seen.load(Ordering::SeqCst), 3);
    }
}
