//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the three external
//! collaborators, so the whole pipeline can run without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use veille_core::testing::{fixtures, MockMessenger, MockNewsSource};
//!
//! let news = MockNewsSource::with_articles(fixtures::articles(20));
//! let model = fixtures::scripted_model(20, 10, 5);
//! let messenger = MockMessenger::new();
//! ```

mod mock_llm;
mod mock_messenger;
mod mock_news;

pub use mock_llm::{MockLanguageModel, RecordedCall};
pub use mock_messenger::MockMessenger;
pub use mock_news::MockNewsSource;

/// Test fixtures: articles and well-formed model output for every stage.
pub mod fixtures {
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    use super::MockLanguageModel;
    use crate::news::Article;
    use crate::pipeline::PipelinePhase;

    /// URL of the i-th fixture article (0-based).
    pub fn article_url(i: usize) -> String {
        format!("https://news.example.com/ai/{}", i)
    }

    /// Create `n` articles with distinct titles and URLs.
    pub fn articles(n: usize) -> Vec<Article> {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 6, 0, 0).single();
        (0..n)
            .map(|i| Article {
                source: "news.example.com".to_string(),
                title: format!("LLM news #{}", i),
                url: article_url(i),
                summary: format!("Summary of story {} about language models.", i),
                published_at: base.map(|t| t - Duration::minutes(i as i64 * 10)),
            })
            .collect()
    }

    /// Analysis output categorizing `n` articles.
    pub fn analysis_json(n: usize) -> String {
        let articles: Vec<_> = (0..n)
            .map(|i| {
                let category = if i % 2 == 0 { "models" } else { "tooling" };
                json!({
                    "title": format!("LLM news #{}", i),
                    "url": article_url(i),
                    "source": "news.example.com",
                    "summary": format!("Summary of story {}.", i),
                    "category": category,
                    "technical_relevance_score": (i % 11) as u8,
                })
            })
            .collect();
        json!({ "articles": articles }).to_string()
    }

    /// Extraction output with `n` ideas.
    pub fn extraction_json(n: usize) -> String {
        let ideas: Vec<_> = (0..n)
            .map(|i| {
                json!({
                    "title": format!("Idea {}", i + 1),
                    "description": format!("Build something on top of story {}.", i),
                    "source_article_url": article_url(i),
                    "innovation_type": "product",
                    "impact_score": 5 + (i % 6) as u8,
                    "technical_difficulty": 3,
                    "use_cases": ["internal tools"],
                    "why_interesting": "cheap to try",
                })
            })
            .collect();
        json!({ "ideas": ideas }).to_string()
    }

    /// Selection output ranking `n` ideas.
    pub fn selection_json(n: usize) -> String {
        let selected: Vec<_> = (1..=n)
            .map(|rank| {
                json!({
                    "rank": rank,
                    "idea_title": format!("Idea {}", rank),
                    "article_url": article_url(rank - 1),
                    "impact_score": 9,
                    "why_in_top_5": "high impact, low effort",
                    "next_step": "prototype it this week",
                })
            })
            .collect();
        json!({ "top_5_ideas": selected, "reflection": "A strong day for agents." }).to_string()
    }

    /// Translation output explaining `n` ranked ideas.
    pub fn translation_json(n: usize) -> String {
        let explained: Vec<_> = (1..=n)
            .map(|rank| {
                json!({
                    "rank": rank,
                    "title_english": format!("Idea {}", rank),
                    "darija_explanation": format!("Had l-fikra {} zwina bzaf.", rank),
                    "source_url": article_url(rank - 1),
                })
            })
            .collect();
        json!({ "top_5_explained": explained }).to_string()
    }

    /// Model answering every stage with well-formed output for the given
    /// cardinalities.
    pub fn scripted_model(articles: usize, ideas: usize, selected: usize) -> MockLanguageModel {
        MockLanguageModel::new()
            .with_default_response(PipelinePhase::Analyzing, analysis_json(articles))
            .with_default_response(PipelinePhase::Extracting, extraction_json(ideas))
            .with_default_response(PipelinePhase::Selecting, selection_json(selected))
            .with_default_response(PipelinePhase::Translating, translation_json(selected))
    }
}
