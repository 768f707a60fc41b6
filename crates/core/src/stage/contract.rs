//! Stage contracts: prompt, expected output shape and acceptance rules.

use serde::de::DeserializeOwned;
use std::collections::HashSet;

use super::error::ValidationError;
use super::prompts;
use super::repair::{parse_with_repair, Repaired};
use super::types::{
    AnalysisOutput, CategorizedArticle, ExtractionOutput, Idea, SelectedIdea, SelectionOutput,
    TranslationOutput,
};
use crate::news::Article;
use crate::pipeline::PipelinePhase;

/// Highest accepted score.
pub const MAX_SCORE: u8 = 10;

/// Contract of one model-backed stage.
///
/// `validate` parses the raw model output (with repair), then applies the
/// stage's semantic rules against the stage input. No output reaches the
/// next stage without passing it.
pub trait StageContract: Send + Sync {
    type Input: ?Sized + Sync;
    type Output: DeserializeOwned + Send;

    fn phase(&self) -> PipelinePhase;

    /// Envelope key holding the stage's collection.
    fn collection_key(&self) -> &'static str;

    fn temperature(&self) -> f32;

    fn build_prompt(&self, input: &Self::Input) -> String;

    /// Semantic rules. May normalize the output (ordering, filled links).
    fn check(&self, input: &Self::Input, output: &mut Self::Output) -> Result<(), String>;

    fn validate(
        &self,
        input: &Self::Input,
        raw: &str,
    ) -> Result<Repaired<Self::Output>, ValidationError> {
        let mut parsed = parse_with_repair::<Self::Output>(raw, self.collection_key())
            .map_err(|reason| ValidationError::new(self.phase(), reason, raw))?;
        self.check(input, &mut parsed.value)
            .map_err(|reason| ValidationError::new(self.phase(), reason, raw))?;
        Ok(parsed)
    }
}

fn require_text(what: &str, index: usize, field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} #{} has an empty {}", what, index + 1, field));
    }
    Ok(())
}

fn require_score(what: &str, index: usize, field: &str, value: u8) -> Result<(), String> {
    if value > MAX_SCORE {
        return Err(format!(
            "{} #{} has {} {} outside 0..={}",
            what,
            index + 1,
            field,
            value,
            MAX_SCORE
        ));
    }
    Ok(())
}

/// Sort by rank and require ranks to be exactly `1..=n`.
fn check_ranks<T>(items: &mut [T], rank_of: impl Fn(&T) -> u8) -> Result<(), String> {
    let mut seen = HashSet::new();
    for item in items.iter() {
        let rank = rank_of(item);
        if !seen.insert(rank) {
            return Err(format!("duplicate rank {}", rank));
        }
    }
    items.sort_by_key(|item| rank_of(item));
    for (expected, item) in (1..).zip(items.iter()) {
        let rank = usize::from(rank_of(item));
        if rank != expected {
            return Err(format!(
                "ranks must be 1..={} without gaps, found {}",
                items.len(),
                rank
            ));
        }
    }
    Ok(())
}

/// Stage 1: categorize and score every fetched article.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeStage;

impl StageContract for AnalyzeStage {
    type Input = [Article];
    type Output = AnalysisOutput;

    fn phase(&self) -> PipelinePhase {
        PipelinePhase::Analyzing
    }

    fn collection_key(&self) -> &'static str {
        "articles"
    }

    fn temperature(&self) -> f32 {
        0.5
    }

    fn build_prompt(&self, input: &[Article]) -> String {
        prompts::analyze(input)
    }

    fn check(&self, input: &[Article], output: &mut AnalysisOutput) -> Result<(), String> {
        if output.articles.len() != input.len() {
            return Err(format!(
                "expected {} categorized articles, got {}",
                input.len(),
                output.articles.len()
            ));
        }
        for (i, article) in output.articles.iter().enumerate() {
            require_text("article", i, "title", &article.title)?;
            require_text("article", i, "category", &article.category)?;
            require_score("article", i, "relevance", article.relevance)?;
        }
        Ok(())
    }
}

/// Stage 2: derive actionable ideas from the categorized articles.
#[derive(Debug, Clone)]
pub struct ExtractStage {
    pub selection_size: usize,
}

impl StageContract for ExtractStage {
    type Input = [CategorizedArticle];
    type Output = ExtractionOutput;

    fn phase(&self) -> PipelinePhase {
        PipelinePhase::Extracting
    }

    fn collection_key(&self) -> &'static str {
        "ideas"
    }

    fn temperature(&self) -> f32 {
        0.7
    }

    fn build_prompt(&self, input: &[CategorizedArticle]) -> String {
        prompts::extract(input, self.selection_size)
    }

    fn check(
        &self,
        input: &[CategorizedArticle],
        output: &mut ExtractionOutput,
    ) -> Result<(), String> {
        let count = output.ideas.len();
        if count < self.selection_size || count > input.len() {
            return Err(format!(
                "expected between {} and {} ideas, got {}",
                self.selection_size,
                input.len(),
                count
            ));
        }
        for (i, idea) in output.ideas.iter().enumerate() {
            require_text("idea", i, "title", &idea.title)?;
            require_text("idea", i, "description", &idea.description)?;
            require_score("idea", i, "impact_score", idea.impact_score)?;
            require_score("idea", i, "technical_difficulty", idea.technical_difficulty)?;
        }
        Ok(())
    }
}

/// Stage 3: rank the best ideas.
#[derive(Debug, Clone)]
pub struct SelectStage {
    pub selection_size: usize,
}

impl StageContract for SelectStage {
    type Input = [Idea];
    type Output = SelectionOutput;

    fn phase(&self) -> PipelinePhase {
        PipelinePhase::Selecting
    }

    fn collection_key(&self) -> &'static str {
        "top_5_ideas"
    }

    fn temperature(&self) -> f32 {
        0.6
    }

    fn build_prompt(&self, input: &[Idea]) -> String {
        prompts::select(input, self.selection_size)
    }

    fn check(&self, input: &[Idea], output: &mut SelectionOutput) -> Result<(), String> {
        let max = self.selection_size.min(input.len());
        let count = output.ideas.len();
        if count == 0 || count > max {
            return Err(format!("expected between 1 and {} selected ideas, got {}", max, count));
        }
        for (i, idea) in output.ideas.iter().enumerate() {
            require_text("selected idea", i, "title", &idea.title)?;
            require_score("selected idea", i, "impact_score", idea.impact_score)?;
        }
        check_ranks(&mut output.ideas, |idea| idea.rank)
    }
}

/// Stage 4: explain the selected ideas in the target language.
#[derive(Debug, Clone)]
pub struct TranslateStage {
    pub target_language: String,
}

impl StageContract for TranslateStage {
    type Input = [SelectedIdea];
    type Output = TranslationOutput;

    fn phase(&self) -> PipelinePhase {
        PipelinePhase::Translating
    }

    fn collection_key(&self) -> &'static str {
        "top_5_explained"
    }

    fn temperature(&self) -> f32 {
        0.8
    }

    fn build_prompt(&self, input: &[SelectedIdea]) -> String {
        prompts::translate(input, &self.target_language)
    }

    fn check(&self, input: &[SelectedIdea], output: &mut TranslationOutput) -> Result<(), String> {
        if output.ideas.len() != input.len() {
            return Err(format!(
                "expected {} translated ideas, got {}",
                input.len(),
                output.ideas.len()
            ));
        }
        for (i, idea) in output.ideas.iter().enumerate() {
            require_text("translated idea", i, "title", &idea.title)?;
            require_text("translated idea", i, "explanation", &idea.explanation)?;
        }
        check_ranks(&mut output.ideas, |idea| idea.rank)?;

        // Input is sorted by the selection check, so ranks line up pairwise.
        for (translated, selected) in output.ideas.iter_mut().zip(input) {
            if translated.rank != selected.rank {
                return Err(format!(
                    "translated rank {} does not match selected rank {}",
                    translated.rank, selected.rank
                ));
            }
            if translated.source_url.trim().is_empty() {
                translated.source_url = selected.source_url.clone();
            }
        }
        Ok(())
    }
}

/// The four contracts, configured for one run.
#[derive(Debug, Clone)]
pub struct StageContracts {
    pub analyze: AnalyzeStage,
    pub extract: ExtractStage,
    pub select: SelectStage,
    pub translate: TranslateStage,
}

impl StageContracts {
    pub fn new(selection_size: usize, target_language: impl Into<String>) -> Self {
        Self {
            analyze: AnalyzeStage,
            extract: ExtractStage { selection_size },
            select: SelectStage { selection_size },
            translate: TranslateStage {
                target_language: target_language.into(),
            },
        }
    }
}
