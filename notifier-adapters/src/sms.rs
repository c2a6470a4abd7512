//! HTTP-backed SMS adapter, speaking a Twilio-style send API.

use async_trait::async_trait;
use notifier_common::{AdapterError, Notification};
use reqwest::Client;
use serde::Deserialize;

use crate::Adapter;

/// Delivers `Sms`-typed notifications through an HTTP SMS gateway.
pub struct SmsAdapter {
    client: Client,
    endpoint: String,
    api_key: String,
    sender_id: String,
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    #[serde(default)]
    error: Option<String>,
}

impl SmsAdapter {
    #[must_use]
    pub fn new(endpoint: String, api_key: String, sender_id: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            api_key,
            sender_id,
        }
    }
}

#[async_trait]
impl Adapter for SmsAdapter {
    async fn send(&self, notification: &Notification) -> Result<(), AdapterError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "from": self.sender_id,
                "to": notification.recipient,
                "body": notification.content,
            }))
            .send()
            .await
            .map_err(|e| AdapterError::Send(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            let body: GatewayResponse = response.json().await.unwrap_or(GatewayResponse { error: None });
            return Err(AdapterError::Send(anyhow::anyhow!(
                "sms gateway returned {status}: {}",
                body.error.unwrap_or_else(|| "no error detail".to_string())
            )));
        }

        Ok(())
    }
}
