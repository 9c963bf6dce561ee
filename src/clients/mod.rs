pub mod gemini;
pub mod konecte;
pub mod traits;
pub mod types;
pub mod whatsapp;

pub use gemini::GeminiClient;
pub use konecte::KonecteClient;
pub use traits::{ClassificationService, EntitlementService, ListingsService, MessagingTransport};
pub use types::{AccessDecision, DeliveryReceipt, IdentifierKind, Identity, ListingAck};
pub use whatsapp::WhatsAppGateway;

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

/// Shared HTTP client for the collaborator adapters
pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("classifieds-bot/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")
}
