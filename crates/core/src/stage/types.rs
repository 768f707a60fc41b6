//! Records flowing between the model-backed stages.
//!
//! Field names follow the JSON the prompts ask for; Rust names are the
//! domain names and the wire names are set with serde renames.

use serde::{Deserialize, Serialize};

/// Article annotated by the analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizedArticle {
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub summary: String,
    pub category: String,
    /// Technical relevance, 0 to 10.
    #[serde(rename = "technical_relevance_score", alias = "relevance_score")]
    pub relevance: u8,
}

/// Actionable idea derived from one article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub title: String,
    pub description: String,
    #[serde(rename = "source_article_url", alias = "source_url", default)]
    pub source_url: String,
    #[serde(default)]
    pub innovation_type: String,
    pub impact_score: u8,
    #[serde(default)]
    pub technical_difficulty: u8,
    #[serde(default)]
    pub use_cases: Vec<String>,
    #[serde(rename = "why_interesting", alias = "rationale", default)]
    pub rationale: String,
}

/// Idea retained by the selection stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedIdea {
    pub rank: u8,
    #[serde(rename = "idea_title", alias = "title")]
    pub title: String,
    #[serde(rename = "article_url", alias = "source_url", default)]
    pub source_url: String,
    #[serde(default)]
    pub impact_score: u8,
    #[serde(rename = "why_in_top_5", alias = "justification", default)]
    pub justification: String,
    #[serde(default)]
    pub next_step: String,
}

/// Selected idea explained in the target language. Handed to delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslatedIdea {
    pub rank: u8,
    #[serde(rename = "title_english", alias = "title")]
    pub title: String,
    #[serde(rename = "darija_explanation", alias = "explanation")]
    pub explanation: String,
    #[serde(default)]
    pub source_url: String,
}

/// Envelope of the analysis stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutput {
    pub articles: Vec<CategorizedArticle>,
}

/// Envelope of the extraction stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub ideas: Vec<Idea>,
}

/// Envelope of the selection stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionOutput {
    #[serde(rename = "top_5_ideas")]
    pub ideas: Vec<SelectedIdea>,
    #[serde(default)]
    pub reflection: String,
}

/// Envelope of the translation stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationOutput {
    #[serde(rename = "top_5_explained")]
    pub ideas: Vec<TranslatedIdea>,
}
