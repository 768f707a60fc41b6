//! Mock news source for testing.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::news::{Article, FetchError, NewsSource};

/// Mock implementation of the NewsSource trait.
///
/// Returns a configurable batch (truncated to the requested limit), or a
/// configured error, and records the limits it was asked for.
#[derive(Debug, Default)]
pub struct MockNewsSource {
    articles: RwLock<Vec<Article>>,
    error: RwLock<Option<FetchError>>,
    limits: RwLock<Vec<usize>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl MockNewsSource {
    /// Create a mock source with no articles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock source returning `articles`.
    pub fn with_articles(articles: Vec<Article>) -> Self {
        Self {
            articles: RwLock::new(articles),
            ..Self::default()
        }
    }

    /// Delay every fetch by `delay`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Replace the returned batch.
    pub async fn set_articles(&self, articles: Vec<Article>) {
        *self.articles.write().await = articles;
    }

    /// Fail every fetch with `error` until cleared.
    pub async fn fail_with(&self, error: FetchError) {
        *self.error.write().await = Some(error);
    }

    pub async fn clear_error(&self) {
        *self.error.write().await = None;
    }

    /// Number of fetches made.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Limits passed to `fetch_latest`, in call order.
    pub async fn requested_limits(&self) -> Vec<usize> {
        self.limits.read().await.clone()
    }
}

#[async_trait]
impl NewsSource for MockNewsSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_latest(&self, limit: usize) -> Result<Vec<Article>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.limits.write().await.push(limit);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if let Some(error) = self.error.read().await.clone() {
            return Err(error);
        }

        let articles = self.articles.read().await;
        Ok(articles.iter().take(limit).cloned().collect())
    }
}
