use thiserror::Error;

use super::phase::PipelinePhase;
use super::retry::{AttemptError, RetryExhausted};
use crate::llm::ModelError;
use crate::messenger::DeliveryError;
use crate::news::FetchError;
use crate::stage::ValidationError;

/// Terminal failure of a pipeline run, tied to the phase it happened in.
#[derive(Debug, Clone, Error)]
pub enum StageFailure {
    #[error("fetching articles failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("{stage} model call failed after {attempts} attempt(s): {error}")]
    Model {
        stage: PipelinePhase,
        attempts: u32,
        #[source]
        error: ModelError,
    },

    #[error("{error} (after {attempts} attempt(s))")]
    Validation {
        attempts: u32,
        #[source]
        error: ValidationError,
    },

    #[error("delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("delivery failed: messenger did not accept the digest")]
    DeliveryRejected,
}

impl StageFailure {
    pub(crate) fn from_exhausted(stage: PipelinePhase, exhausted: RetryExhausted) -> Self {
        match exhausted.error {
            AttemptError::Model(error) => StageFailure::Model {
                stage,
                attempts: exhausted.attempts,
                error,
            },
            AttemptError::Validation(error) => StageFailure::Validation {
                attempts: exhausted.attempts,
                error,
            },
        }
    }

    /// Phase the failure happened in.
    pub fn stage(&self) -> PipelinePhase {
        match self {
            StageFailure::Fetch(_) => PipelinePhase::Fetching,
            StageFailure::Model { stage, .. } => *stage,
            StageFailure::Validation { error, .. } => error.stage,
            StageFailure::Delivery(_) | StageFailure::DeliveryRejected => {
                PipelinePhase::Delivering
            }
        }
    }

    pub fn is_delivery(&self) -> bool {
        self.stage() == PipelinePhase::Delivering
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_mapping() {
        assert_eq!(
            StageFailure::Fetch(FetchError::Empty).stage(),
            PipelinePhase::Fetching
        );
        assert_eq!(
            StageFailure::DeliveryRejected.stage(),
            PipelinePhase::Delivering
        );
        assert!(StageFailure::Delivery(DeliveryError::Timeout).is_delivery());

        let exhausted = RetryExhausted {
            error: AttemptError::Validation(ValidationError::new(
                PipelinePhase::Extracting,
                "too few ideas",
                "{}",
            )),
            attempts: 1,
        };
        let failure = StageFailure::from_exhausted(PipelinePhase::Extracting, exhausted);
        assert_eq!(failure.stage(), PipelinePhase::Extracting);
        assert!(!failure.is_delivery());
    }

    #[test]
    fn test_messages_are_descriptive() {
        let failure = StageFailure::Model {
            stage: PipelinePhase::Analyzing,
            attempts: 3,
            error: ModelError::Transient("HTTP 503".to_string()),
        };
        assert_eq!(
            failure.to_string(),
            "Analyzing model call failed after 3 attempt(s): transient model failure: HTTP 503"
        );
        assert!(StageFailure::DeliveryRejected
            .to_string()
            .starts_with("delivery failed"));
    }
}
