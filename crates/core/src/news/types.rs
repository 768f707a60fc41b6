//! Types for the news source.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A news article as fetched from the source. Read-only input of the
/// analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Name of the publisher (e.g. "techcrunch.com").
    pub source: String,
    /// Article title.
    pub title: String,
    /// Canonical URL; used as the article reference downstream.
    pub url: String,
    /// Description or summary provided by the source.
    #[serde(default)]
    pub summary: String,
    /// Publication timestamp, when the source provides a parsable one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

/// Errors from a news source.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Request timed out.
    #[error("news request timed out")]
    Timeout,

    /// Could not reach the news source.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The API key was rejected.
    #[error("news source rejected credentials: {0}")]
    Unauthorized(String),

    /// Non-success response or unparsable body.
    #[error("news API error: {0}")]
    Api(String),

    /// The source answered but returned no articles.
    #[error("no articles available")]
    Empty,
}

/// Source of the daily article batch.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Name of this source (e.g. "thenewsapi").
    fn name(&self) -> &str;

    /// Fetch up to `limit` recent articles, most recent first.
    async fn fetch_latest(&self, limit: usize) -> Result<Vec<Article>, FetchError>;
}
