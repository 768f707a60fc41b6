//! TheNewsAPI.com news source.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::NewsConfig;

use super::{Article, FetchError, NewsSource};

/// Hard stop for pagination, whatever the requested limit.
const MAX_PAGES: u32 = 10;

/// Client for the `/v1/news/all` endpoint of TheNewsAPI.com.
pub struct TheNewsApiClient {
    client: Client,
    config: NewsConfig,
}

impl TheNewsApiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: NewsConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::ConnectionFailed(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn search_expression(&self) -> String {
        self.config.keywords.join(" OR ")
    }

    async fn fetch_page(
        &self,
        page: u32,
        limit: usize,
        window: (DateTime<Utc>, DateTime<Utc>),
    ) -> Result<Vec<NewsApiArticle>, FetchError> {
        let url = format!("{}/v1/news/all", self.config.api_base.trim_end_matches('/'));
        let (after, before) = window;
        let search = self.search_expression();
        let published_after = after.format("%Y-%m-%d").to_string();
        let published_before = before.format("%Y-%m-%d").to_string();
        let limit = limit.to_string();
        let page = page.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("api_token", self.config.api_key.as_str()),
                ("search", search.as_str()),
                ("language", self.config.language.as_str()),
                ("published_after", published_after.as_str()),
                ("published_before", published_before.as_str()),
                ("limit", limit.as_str()),
                ("sort", "published_at"),
                ("page", page.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else if e.is_connect() {
                    FetchError::ConnectionFailed(e.to_string())
                } else {
                    FetchError::Api(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<NewsApiErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| body.chars().take(200).collect());
            return Err(match status.as_u16() {
                401 | 402 | 403 => FetchError::Unauthorized(message),
                code => FetchError::Api(format!("HTTP {}: {}", code, message)),
            });
        }

        let body: NewsApiResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Api(format!("Failed to parse response: {}", e)))?;

        Ok(body.data)
    }
}

#[async_trait]
impl NewsSource for TheNewsApiClient {
    fn name(&self) -> &str {
        "thenewsapi"
    }

    async fn fetch_latest(&self, limit: usize) -> Result<Vec<Article>, FetchError> {
        let before = Utc::now();
        let after = before - ChronoDuration::days(self.config.lookback_days as i64);

        info!(
            keywords = %self.search_expression(),
            limit,
            "Fetching news from TheNewsAPI"
        );

        let mut collected: Vec<NewsApiArticle> = Vec::new();
        let mut page = 1;
        while collected.len() < limit {
            debug!(page, "Fetching news page");
            let articles = self.fetch_page(page, limit, (after, before)).await?;
            if articles.is_empty() {
                debug!(page, "No more articles");
                break;
            }
            collected.extend(articles);

            if page >= MAX_PAGES {
                warn!("Reached pagination limit ({} pages)", MAX_PAGES);
                break;
            }
            page += 1;
        }

        collected.truncate(limit);
        info!(count = collected.len(), limit, "Fetched articles");

        Ok(collected.into_iter().map(Article::from).collect())
    }
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    #[serde(default)]
    data: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
struct NewsApiArticle {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiErrorResponse {
    error: NewsApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct NewsApiErrorDetail {
    message: String,
}

impl From<NewsApiArticle> for Article {
    fn from(raw: NewsApiArticle) -> Self {
        let summary = raw
            .description
            .filter(|d| !d.trim().is_empty())
            .or(raw.snippet)
            .unwrap_or_default();
        Article {
            source: raw.source,
            title: raw.title,
            url: raw.url,
            summary,
            published_at: raw
                .published_at
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_expression_joins_keywords() {
        let config = NewsConfig {
            keywords: vec!["LLM".to_string(), "AI agents".to_string()],
            ..NewsConfig::default()
        };
        let client = TheNewsApiClient::new(config).unwrap();
        assert_eq!(client.search_expression(), "LLM OR AI agents");
    }

    #[test]
    fn test_article_conversion_prefers_description() {
        let raw = NewsApiArticle {
            title: "New model".to_string(),
            url: "https://example.com/model".to_string(),
            source: "example.com".to_string(),
            description: Some("A description".to_string()),
            snippet: Some("A snippet".to_string()),
            published_at: Some("2025-03-01T10:15:00.000000Z".to_string()),
        };
        let article = Article::from(raw);
        assert_eq!(article.summary, "A description");
        assert_eq!(
            article.published_at.unwrap().to_rfc3339(),
            "2025-03-01T10:15:00+00:00"
        );
    }

    #[test]
    fn test_article_conversion_falls_back_to_snippet() {
        let raw = NewsApiArticle {
            title: "New model".to_string(),
            url: "https://example.com/model".to_string(),
            source: "example.com".to_string(),
            description: Some("   ".to_string()),
            snippet: Some("A snippet".to_string()),
            published_at: Some("not a date".to_string()),
        };
        let article = Article::from(raw);
        assert_eq!(article.summary, "A snippet");
        assert!(article.published_at.is_none());
    }

    #[test]
    fn test_response_tolerates_missing_data() {
        let body: NewsApiResponse = serde_json::from_str(r#"{"meta":{"found":0}}"#).unwrap();
        assert!(body.data.is_empty());
    }
}
