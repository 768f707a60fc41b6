use thiserror::Error;

use crate::pipeline::PipelinePhase;

const EXCERPT_CHARS: usize = 500;

/// A stage output that could not be parsed, repaired or accepted.
#[derive(Debug, Clone, Error)]
#[error("{stage} output failed validation: {reason}")]
pub struct ValidationError {
    pub stage: PipelinePhase,
    pub reason: String,
    /// Raw model output, kept for diagnostics.
    pub raw: String,
}

impl ValidationError {
    pub fn new(stage: PipelinePhase, reason: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    /// Leading part of the raw output, for log lines.
    pub fn raw_excerpt(&self) -> &str {
        match self.raw.char_indices().nth(EXCERPT_CHARS) {
            Some((idx, _)) => &self.raw[..idx],
            None => &self.raw,
        }
    }
}
