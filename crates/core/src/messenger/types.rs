use async_trait::async_trait;
use thiserror::Error;

/// Errors from a messenger.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    /// Request timed out.
    #[error("delivery timed out")]
    Timeout,

    /// Could not reach the messaging service.
    #[error("delivery transport error: {0}")]
    Transport(String),

    /// The messaging service refused the message.
    #[error("delivery rejected: HTTP {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Messenger is missing credentials.
    #[error("messenger not configured")]
    NotConfigured,
}

/// Single-endpoint message delivery.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Backend name (e.g., "telegram").
    fn name(&self) -> &str;

    /// Deliver a message. `Ok(false)` means the service answered but did not
    /// accept the message.
    async fn deliver(&self, text: &str) -> Result<bool, DeliveryError>;
}
