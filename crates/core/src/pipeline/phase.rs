//! Linear state machine of a pipeline run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a pipeline run.
///
/// `Fetching → Analyzing → Extracting → Selecting → Translating → Delivering
/// → Done`, with `Failed` reachable from any non-terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelinePhase {
    Fetching,
    Analyzing,
    Extracting,
    Selecting,
    Translating,
    Delivering,
    Done,
    Failed,
}

impl PipelinePhase {
    /// The four model-backed stages, in order.
    pub const STAGES: [PipelinePhase; 4] = [
        PipelinePhase::Analyzing,
        PipelinePhase::Extracting,
        PipelinePhase::Selecting,
        PipelinePhase::Translating,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, PipelinePhase::Done | PipelinePhase::Failed)
    }

    /// Successor on the happy path. `None` for terminal phases.
    pub fn next(self) -> Option<PipelinePhase> {
        match self {
            PipelinePhase::Fetching => Some(PipelinePhase::Analyzing),
            PipelinePhase::Analyzing => Some(PipelinePhase::Extracting),
            PipelinePhase::Extracting => Some(PipelinePhase::Selecting),
            PipelinePhase::Selecting => Some(PipelinePhase::Translating),
            PipelinePhase::Translating => Some(PipelinePhase::Delivering),
            PipelinePhase::Delivering => Some(PipelinePhase::Done),
            PipelinePhase::Done | PipelinePhase::Failed => None,
        }
    }

    /// Whether `to` is a legal transition from this phase.
    pub fn can_transition_to(self, to: PipelinePhase) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == PipelinePhase::Failed || self.next() == Some(to)
    }

    /// Lowercase label used in metrics and prompts.
    pub fn label(self) -> &'static str {
        match self {
            PipelinePhase::Fetching => "fetching",
            PipelinePhase::Analyzing => "analyzing",
            PipelinePhase::Extracting => "extracting",
            PipelinePhase::Selecting => "selecting",
            PipelinePhase::Translating => "translating",
            PipelinePhase::Delivering => "delivering",
            PipelinePhase::Done => "done",
            PipelinePhase::Failed => "failed",
        }
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelinePhase::Fetching => "Fetching",
            PipelinePhase::Analyzing => "Analyzing",
            PipelinePhase::Extracting => "Extracting",
            PipelinePhase::Selecting => "Selecting",
            PipelinePhase::Translating => "Translating",
            PipelinePhase::Delivering => "Delivering",
            PipelinePhase::Done => "Done",
            PipelinePhase::Failed => "Failed",
        };
        f.write_str(name)
    }
}
