use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::clients::traits::MessagingTransport;
use crate::clients::types::DeliveryReceipt;
use crate::error::ClientError;

/// HTTP gateway in front of the WhatsApp session
pub struct WhatsAppGateway {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl WhatsAppGateway {
    pub fn new(base_url: impl Into<String>, token: Option<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: super::http_client(timeout)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[async_trait]
impl MessagingTransport for WhatsAppGateway {
    async fn send_text(&self, to: &str, text: &str) -> Result<DeliveryReceipt> {
        let mut request = self
            .client
            .post(format!("{}/send", self.base_url))
            .json(&json!({ "to": to, "message": text }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(ClientError::from)
            .with_context(|| format!("Failed to reach WhatsApp gateway for {}", to))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::Error::new(ClientError::Api {
                status: status.as_u16(),
                body,
            })
            .context(format!("WhatsApp gateway refused message to {}", to)));
        }

        let body = response.text().await.map_err(ClientError::from)?;
        let receipt = serde_json::from_str::<DeliveryReceipt>(&body).unwrap_or_default();
        debug!(to, id = ?receipt.id, "Message delivered to gateway");
        Ok(receipt)
    }
}
