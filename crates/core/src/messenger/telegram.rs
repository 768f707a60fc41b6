//! Telegram Bot API messenger.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

use crate::config::MessengerConfig;

use super::{DeliveryError, Messenger};

/// Sends messages to one chat through the Telegram Bot API.
pub struct TelegramMessenger {
    client: reqwest::Client,
    bot_token: String,
    chat_id: String,
    api_base: String,
}

impl TelegramMessenger {
    pub fn new(config: &MessengerConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
            api_base: config.api_base.clone(),
        })
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.bot_token
        )
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

#[async_trait]
impl Messenger for TelegramMessenger {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn deliver(&self, text: &str) -> Result<bool, DeliveryError> {
        if self.bot_token.is_empty() || self.chat_id.is_empty() {
            return Err(DeliveryError::NotConfigured);
        }

        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(self.send_message_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::Timeout
                } else {
                    DeliveryError::Transport(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let parsed = serde_json::from_str::<TelegramResponse>(&body).ok();

        if status != 200 {
            let message = parsed
                .and_then(|r| r.description)
                .unwrap_or_else(|| body.chars().take(200).collect());
            error!(status, %message, "Telegram rejected message");
            return Err(DeliveryError::Rejected { status, message });
        }

        match parsed {
            Some(TelegramResponse { ok: true, .. }) => {
                info!("Telegram message sent");
                Ok(true)
            }
            Some(TelegramResponse { description, .. }) => {
                error!(
                    description = description.as_deref().unwrap_or(""),
                    "Telegram answered ok=false"
                );
                Ok(false)
            }
            None => Ok(false),
        }
    }
}
