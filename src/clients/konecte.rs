use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use std::time::Duration;
use tracing::{debug, info};

use crate::clients::traits::{EntitlementService, ListingsService};
use crate::clients::types::{AccessDecision, IdentifierKind, Identity, ListingAck};
use crate::error::ClientError;
use crate::models::ListingPayload;

/// Konecte platform API: access checks and listing creation
pub struct KonecteClient {
    client: Client,
    base_url: Url,
    listings_path: String,
}

impl KonecteClient {
    pub fn new(base_url: &str, listings_path: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url).with_context(|| format!("Invalid Konecte URL: {}", base_url))?;
        Ok(Self {
            client: super::http_client(timeout)?,
            base_url,
            listings_path: listings_path.into(),
        })
    }

    fn url_with_segments(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Konecte URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn access_url(&self, identity: &Identity) -> Result<Url> {
        match identity.kind {
            IdentifierKind::Phone => self.url_with_segments(&["api", "users", "by-phone", identity.value.as_str()]),
            IdentifierKind::WebUserId => {
                self.url_with_segments(&["api", "users", "by-id", identity.value.as_str(), "check-access"])
            }
        }
    }
}

async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl EntitlementService for KonecteClient {
    async fn check_access(&self, identity: &Identity) -> Result<AccessDecision> {
        let url = self.access_url(identity)?;
        debug!(%url, "Checking WhatsApp access");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ClientError::from)
            .context("Failed to reach Konecte access check")?;
        let response = ensure_success(response)
            .await
            .with_context(|| format!("Access check failed for {}", identity.value))?;

        let decision = response
            .json::<AccessDecision>()
            .await
            .map_err(ClientError::from)
            .context("Failed to decode access decision")?;
        Ok(decision)
    }
}

#[async_trait]
impl ListingsService for KonecteClient {
    async fn create_listing(&self, payload: &ListingPayload) -> Result<ListingAck> {
        let url = self
            .base_url
            .join(&self.listings_path)
            .with_context(|| format!("Invalid listings path: {}", self.listings_path))?;

        let response = self
            .client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(ClientError::from)
            .context("Failed to reach Konecte listings API")?;
        let response = ensure_success(response).await.context("Listing creation rejected")?;

        // Some deployments answer with an empty body
        let body = response.text().await.map_err(ClientError::from)?;
        let ack = serde_json::from_str::<ListingAck>(&body).unwrap_or_default();
        info!(title = %payload.title, id = ?ack.id, "📤 Listing created on Konecte");
        Ok(ack)
    }
}
