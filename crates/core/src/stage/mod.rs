//! Model-backed stages: record types, prompts, output repair and
//! validation contracts.

mod contract;
mod error;
pub mod prompts;
pub mod repair;
mod types;

pub use contract::{
    AnalyzeStage, ExtractStage, SelectStage, StageContract, StageContracts, TranslateStage,
    MAX_SCORE,
};
pub use error::ValidationError;
pub use repair::{parse_with_repair, RepairStrategy, Repaired};
pub use types::{
    AnalysisOutput, CategorizedArticle, ExtractionOutput, Idea, SelectedIdea, SelectionOutput,
    TranslatedIdea, TranslationOutput,
};
