use anyhow::Result;
use async_trait::async_trait;

use crate::clients::types::{AccessDecision, DeliveryReceipt, Identity, ListingAck};
use crate::models::ListingPayload;

/// Sends text to a chat identifier
#[async_trait]
pub trait MessagingTransport: Send + Sync {
    async fn send_text(&self, to: &str, text: &str) -> Result<DeliveryReceipt>;
}

/// LLM that turns a prompt into a JSON document (as text)
#[async_trait]
pub trait ClassificationService: Send + Sync {
    async fn complete_json(&self, prompt: &str) -> Result<String>;

    /// Get the name of the backing model/service
    fn service_name(&self) -> &'static str;
}

/// Decides whether an identity may talk to the bot
#[async_trait]
pub trait EntitlementService: Send + Sync {
    async fn check_access(&self, identity: &Identity) -> Result<AccessDecision>;
}

/// Receives listings composed through the publication wizard
#[async_trait]
pub trait ListingsService: Send + Sync {
    async fn create_listing(&self, payload: &ListingPayload) -> Result<ListingAck>;
}
