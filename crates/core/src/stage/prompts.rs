//! Prompt builders for the model-backed stages.
//!
//! Every prompt opens with a `# Task: <phase>` header line; test doubles
//! route on it.

use serde::Serialize;

use super::types::{CategorizedArticle, Idea, SelectedIdea};
use crate::news::Article;
use crate::pipeline::PipelinePhase;

/// First line of every prompt for `phase`.
pub fn task_header(phase: PipelinePhase) -> String {
    format!("# Task: {}", phase.label())
}

fn to_json<T: Serialize + ?Sized>(items: &T) -> String {
    serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string())
}

fn json_only(schema: &str) -> String {
    format!(
        "Respond with a single JSON object and nothing else. No markdown, no commentary.\n\
         Expected shape:\n{}",
        schema
    )
}

pub fn analyze(articles: &[Article]) -> String {
    format!(
        "{header}\n\n\
         You are a technical analyst following LLM and AI news.\n\
         Categorize each of the {count} articles below (for example: models, agents, \
         tooling, research, business, policy) and rate its technical relevance for \
         engineers building with LLMs from 0 to 10.\n\
         Return exactly one entry per article, in the same order.\n\n\
         Articles:\n{articles}\n\n{instruction}",
        header = task_header(PipelinePhase::Analyzing),
        count = articles.len(),
        articles = to_json(articles),
        instruction = json_only(
            r#"{"articles": [{"title": "...", "url": "...", "source": "...", "summary": "...", "category": "...", "technical_relevance_score": 0}]}"#
        ),
    )
}

pub fn extract(articles: &[CategorizedArticle], selection_size: usize) -> String {
    format!(
        "{header}\n\n\
         You are a product engineer looking for ideas worth building.\n\
         From the categorized articles below, extract concrete, actionable ideas. \
         Produce at least {min} and at most {max} ideas, each tied to the article \
         it came from. Prefer articles with a high technical relevance score.\n\
         Scores (impact_score, technical_difficulty) range from 0 to 10.\n\n\
         Articles:\n{articles}\n\n{instruction}",
        header = task_header(PipelinePhase::Extracting),
        min = selection_size,
        max = articles.len(),
        articles = to_json(articles),
        instruction = json_only(
            r#"{"ideas": [{"title": "...", "description": "...", "source_article_url": "...", "innovation_type": "...", "impact_score": 0, "technical_difficulty": 0, "use_cases": ["..."], "why_interesting": "..."}]}"#
        ),
    )
}

pub fn select(ideas: &[Idea], selection_size: usize) -> String {
    format!(
        "{header}\n\n\
         You are curating a short daily digest.\n\
         Pick the {size} most interesting ideas below, ranked from 1 (best) to {size}. \
         Ranks must be unique. For each, explain why it made the cut and suggest a \
         concrete next step. Finish with a short reflection on today's selection.\n\n\
         Ideas:\n{ideas}\n\n{instruction}",
        header = task_header(PipelinePhase::Selecting),
        size = selection_size.min(ideas.len()),
        ideas = to_json(ideas),
        instruction = json_only(
            r#"{"top_5_ideas": [{"rank": 1, "idea_title": "...", "article_url": "...", "impact_score": 0, "why_in_top_5": "...", "next_step": "..."}], "reflection": "..."}"#
        ),
    )
}

pub fn translate(selected: &[SelectedIdea], target_language: &str) -> String {
    format!(
        "{header}\n\n\
         You explain technology to a general audience in {language}.\n\
         For each of the {count} ranked ideas below, keep the English title and \
         rank, and write a short, friendly explanation in {language}. Keep \
         technical terms in English when there is no common equivalent.\n\n\
         Ideas:\n{ideas}\n\n{instruction}",
        header = task_header(PipelinePhase::Translating),
        language = target_language,
        count = selected.len(),
        ideas = to_json(selected),
        instruction = json_only(
            r#"{"top_5_explained": [{"rank": 1, "title_english": "...", "darija_explanation": "...", "source_url": "..."}]}"#
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_start_with_stage_header() {
        assert!(analyze(&[]).starts_with("# Task: analyzing\n"));
        assert!(extract(&[], 5).starts_with("# Task: extracting\n"));
        assert!(select(&[], 5).starts_with("# Task: selecting\n"));
        assert!(translate(&[], "Moroccan Darija").starts_with("# Task: translating\n"));
    }

    #[test]
    fn test_prompts_embed_inputs() {
        let articles = vec![Article {
            source: "example.com".to_string(),
            title: "A new open model".to_string(),
            url: "https://example.com/model".to_string(),
            summary: String::new(),
            published_at: None,
        }];
        let prompt = analyze(&articles);
        assert!(prompt.contains("A new open model"));
        assert!(prompt.contains("technical_relevance_score"));
    }

    #[test]
    fn test_translate_names_language() {
        let prompt = translate(&[], "Moroccan Darija");
        assert!(prompt.contains("in Moroccan Darija"));
        assert!(prompt.contains("top_5_explained"));
    }
}
