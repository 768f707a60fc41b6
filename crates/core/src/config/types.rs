use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::pipeline::PipelineConfig;
use crate::scheduler::ScheduleConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub messenger: MessengerConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// When set, manual triggers require this key as a bearer token or
    /// `X-API-Key` header.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_key: None,
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// News source configuration (TheNewsAPI)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NewsConfig {
    pub api_key: String,
    pub api_base: String,
    /// Articles fetched per run.
    pub limit: usize,
    pub language: String,
    /// Search keywords, OR-ed together.
    pub keywords: Vec<String>,
    /// Only articles published within this many days.
    pub lookback_days: u32,
    pub timeout_secs: u64,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: "https://api.thenewsapi.com".to_string(),
            limit: 20,
            language: "en".to_string(),
            keywords: [
                "AI",
                "LLM",
                "GPT",
                "Claude",
                "Gemini",
                "AI agents",
                "large language model",
            ]
            .iter()
            .map(|k| k.to_string())
            .collect(),
            lookback_days: 7,
            timeout_secs: 30,
        }
    }
}

/// Available language model providers
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[default]
    Gemini,
}

/// Language model configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            api_key: String::new(),
            model: "gemini-2.5-flash".to_string(),
            api_base: "https://generativelanguage.googleapis.com".to_string(),
            timeout_secs: 60,
        }
    }
}

/// Available messenger backends
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessengerBackend {
    #[default]
    Telegram,
}

/// Messenger configuration (Telegram bot)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MessengerConfig {
    pub backend: MessengerBackend,
    pub bot_token: String,
    pub chat_id: String,
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for MessengerConfig {
    fn default() -> Self {
        Self {
            backend: MessengerBackend::Telegram,
            bot_token: String::new(),
            chat_id: String::new(),
            api_base: "https://api.telegram.org".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Execution history configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Append-only JSON-lines log. In-memory only when unset.
    pub path: Option<PathBuf>,
    /// Executions kept in memory.
    pub retain: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            retain: 50,
        }
    }
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: SanitizedServerConfig,
    pub logging: LoggingConfig,
    pub news: SanitizedNewsConfig,
    pub llm: SanitizedLlmConfig,
    pub messenger: SanitizedMessengerConfig,
    pub schedule: ScheduleConfig,
    pub pipeline: PipelineConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub api_key_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedNewsConfig {
    pub api_base: String,
    pub limit: usize,
    pub language: String,
    pub keywords: Vec<String>,
    pub lookback_days: u32,
    pub timeout_secs: u64,
    pub api_key_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedLlmConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub api_base: String,
    pub timeout_secs: u64,
    pub api_key_configured: bool,
}

/// Sanitized messenger config (bot token and chat hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedMessengerConfig {
    pub backend: MessengerBackend,
    pub api_base: String,
    pub timeout_secs: u64,
    pub bot_token_configured: bool,
    pub chat_id_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: SanitizedServerConfig {
                host: config.server.host,
                port: config.server.port,
                api_key_configured: config
                    .server
                    .api_key
                    .as_deref()
                    .is_some_and(|k| !k.is_empty()),
            },
            logging: config.logging.clone(),
            news: SanitizedNewsConfig {
                api_base: config.news.api_base.clone(),
                limit: config.news.limit,
                language: config.news.language.clone(),
                keywords: config.news.keywords.clone(),
                lookback_days: config.news.lookback_days,
                timeout_secs: config.news.timeout_secs,
                api_key_configured: !config.news.api_key.is_empty(),
            },
            llm: SanitizedLlmConfig {
                provider: config.llm.provider,
                model: config.llm.model.clone(),
                api_base: config.llm.api_base.clone(),
                timeout_secs: config.llm.timeout_secs,
                api_key_configured: !config.llm.api_key.is_empty(),
            },
            messenger: SanitizedMessengerConfig {
                backend: config.messenger.backend,
                api_base: config.messenger.api_base.clone(),
                timeout_secs: config.messenger.timeout_secs,
                bot_token_configured: !config.messenger.bot_token.is_empty(),
                chat_id_configured: !config.messenger.chat_id.is_empty(),
            },
            schedule: config.schedule.clone(),
            pipeline: config.pipeline.clone(),
            history: config.history.clone(),
        }
    }
}
