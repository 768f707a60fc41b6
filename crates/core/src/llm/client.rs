//! Language model client trait and error taxonomy.

use async_trait::async_trait;
use std::time::Duration;

/// Error type for model calls.
///
/// The orchestrator retries `Transient` and `RateLimited` within its attempt
/// budget; `Invalid` is terminal for the stage.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    /// Timeout, transport failure or server-side error.
    #[error("transient model failure: {0}")]
    Transient(String),

    /// The provider asked us to slow down.
    #[error("model rate limited (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// The request itself was rejected or the response was unusable.
    #[error("invalid model request: {0}")]
    Invalid(String),
}

impl ModelError {
    /// Whether a new attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ModelError::Transient(_) | ModelError::RateLimited { .. })
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ModelError::Transient(_) => "transient",
            ModelError::RateLimited { .. } => "rate_limited",
            ModelError::Invalid(_) => "invalid",
        }
    }
}

/// A single generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Full prompt text.
    pub prompt: String,
    /// Sampling temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: 0.7,
            max_tokens: 8192,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Trait for language model backends.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Provider name (e.g., "gemini").
    fn provider(&self) -> &str;

    /// Model name (e.g., "gemini-2.5-flash").
    fn model(&self) -> &str;

    /// Generate free text for a prompt.
    async fn generate(&self, request: GenerationRequest) -> Result<String, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_request_builder() {
        let request = GenerationRequest::new("Hello")
            .with_temperature(0.5)
            .with_max_tokens(100);

        assert_eq!(request.prompt, "Hello");
        assert_eq!(request.temperature, 0.5);
        assert_eq!(request.max_tokens, 100);
    }

    #[test]
    fn test_retryable_kinds() {
        assert!(ModelError::Transient("timeout".into()).is_retryable());
        assert!(ModelError::RateLimited { retry_after: None }.is_retryable());
        assert!(!ModelError::Invalid("bad request".into()).is_retryable());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(ModelError::Transient("x".into()).kind(), "transient");
        assert_eq!(
            ModelError::RateLimited {
                retry_after: Some(Duration::from_secs(2))
            }
            .kind(),
            "rate_limited"
        );
        assert_eq!(ModelError::Invalid("x".into()).kind(), "invalid");
    }
}
