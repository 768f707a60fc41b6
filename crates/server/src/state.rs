use std::sync::Arc;

use sha2::{Digest, Sha256};
use veille_core::{Config, DigestService, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    service: Arc<DigestService>,
    config_hash: String,
}

impl AppState {
    pub fn new(config: Config, service: Arc<DigestService>) -> Self {
        let config_hash = config_hash(&config);
        Self {
            config,
            service,
            config_hash,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn service(&self) -> &DigestService {
        self.service.as_ref()
    }

    /// Key required on mutating endpoints, if any.
    pub fn api_key(&self) -> Option<&str> {
        self.config.server.api_key.as_deref()
    }

    /// Short SHA-256 of the sanitized configuration.
    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }
}

fn config_hash(config: &Config) -> String {
    let json = serde_json::to_string(&SanitizedConfig::from(config)).unwrap_or_default();
    let digest = format!("{:x}", Sha256::digest(json.as_bytes()));
    digest[..16].to_string()
}
