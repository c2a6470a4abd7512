//! HTTP-backed Telegram adapter, speaking the Bot API's `sendMessage` method.

use async_trait::async_trait;
use notifier_common::{AdapterError, Notification};
use reqwest::Client;
use serde::Deserialize;

use crate::Adapter;

/// Delivers `Telegram`-typed notifications via the Bot API. The
/// notification's `recipient` field is the destination chat id.
pub struct TelegramAdapter {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramAdapter {
    #[must_use]
    pub fn new(bot_token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: format!("https://api.telegram.org/bot{bot_token}"),
        }
    }
}

#[async_trait]
impl Adapter for TelegramAdapter {
    async fn send(&self, notification: &Notification) -> Result<(), AdapterError> {
        let response: SendMessageResponse = self
            .client
            .post(format!("{}/sendMessage", self.base_url))
            .json(&serde_json::json!({
                "chat_id": notification.recipient,
                "text": notification.content,
            }))
            .send()
            .await
            .map_err(|e| AdapterError::Send(e.into()))?
            .json()
            .await
            .map_err(|e| AdapterError::Send(e.into()))?;

        if !response.ok {
            return Err(AdapterError::Send(anyhow::anyhow!(
                "telegram API rejected message: {}",
                response.description.unwrap_or_else(|| "no description".to_string())
            )));
        }

        Ok(())
    }
}
