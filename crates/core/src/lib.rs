pub mod config;
pub mod execution;
pub mod llm;
pub mod messenger;
pub mod metrics;
pub mod news;
pub mod pipeline;
pub mod scheduler;
pub mod service;
pub mod stage;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, LlmProvider,
    MessengerBackend, SanitizedConfig,
};
pub use execution::{
    ConflictError, Execution, ExecutionCounters, ExecutionId, ExecutionStatus, ExecutionTracker,
    HistoryStore, JsonlHistoryStore, TrackerError, TriggerSource,
};
pub use llm::{GeminiClient, GenerationRequest, LanguageModel, ModelError};
pub use messenger::{DeliveryError, Messenger, TelegramMessenger};
pub use news::{Article, FetchError, NewsSource, TheNewsApiClient};
pub use pipeline::{PipelineConfig, PipelineOrchestrator, PipelinePhase, StageFailure};
pub use scheduler::{DailySchedule, ScheduleConfig, Scheduler};
pub use service::{DigestService, PipelineStatus, DEFAULT_HISTORY_LIMIT};
pub use stage::{StageContract, ValidationError};
