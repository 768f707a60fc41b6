//! Mock messenger for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::messenger::{DeliveryError, Messenger};

type Outcome = Result<bool, DeliveryError>;

/// Mock implementation of the Messenger trait.
///
/// Records every message and answers with queued outcomes first, then the
/// default outcome (`Ok(true)` unless configured).
#[derive(Debug)]
pub struct MockMessenger {
    delivered: RwLock<Vec<String>>,
    queued: RwLock<VecDeque<Outcome>>,
    default_outcome: RwLock<Outcome>,
    delay: Duration,
}

impl Default for MockMessenger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMessenger {
    pub fn new() -> Self {
        Self {
            delivered: RwLock::new(Vec::new()),
            queued: RwLock::new(VecDeque::new()),
            default_outcome: RwLock::new(Ok(true)),
            delay: Duration::ZERO,
        }
    }

    /// Messenger that answers every delivery with `outcome`.
    pub fn with_outcome(outcome: Result<bool, DeliveryError>) -> Self {
        let messenger = Self::new();
        Self {
            default_outcome: RwLock::new(outcome),
            ..messenger
        }
    }

    /// Delay every delivery by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Queue a one-shot outcome.
    pub async fn push_outcome(&self, outcome: Result<bool, DeliveryError>) {
        self.queued.write().await.push_back(outcome);
    }

    pub async fn set_default_outcome(&self, outcome: Result<bool, DeliveryError>) {
        *self.default_outcome.write().await = outcome;
    }

    /// Every message passed to `deliver`, accepted or not.
    pub async fn messages(&self) -> Vec<String> {
        self.delivered.read().await.clone()
    }

    pub async fn message_count(&self) -> usize {
        self.delivered.read().await.len()
    }
}

#[async_trait]
impl Messenger for MockMessenger {
    fn name(&self) -> &str {
        "mock"
    }

    async fn deliver(&self, text: &str) -> Result<bool, DeliveryError> {
        self.delivered.write().await.push(text.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(outcome) = self.queued.write().await.pop_front() {
            return outcome;
        }
        self.default_outcome.read().await.clone()
    }
}
