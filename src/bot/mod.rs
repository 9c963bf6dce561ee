//! The bot: direct-message replies, commands and group intake on top of
//! the conversation state, classifier, stores and alert matcher.

mod commands;
mod group;
mod reply;

pub use group::IntakeReport;

use anyhow::Result;
use chrono::Duration;
use std::any::Any;
use std::sync::Arc;
use tracing::{debug, info};

use crate::alerts::AlertMatcher;
use crate::classifier::Classifier;
use crate::clients::{EntitlementService, ListingsService, MessagingTransport};
use crate::clock::Clock;
use crate::config::Config;
use crate::conversation::ContextStore;
use crate::location::LocationNormalizer;
use crate::models::InboundMessage;
use crate::signature::{SignatureCache, DEFAULT_TTL_HOURS};
use crate::store::{AlertRepository, ListingRepository, SpreadsheetStore};

/// Collaborators the bot talks to
pub struct BotDeps {
    pub transport: Arc<dyn MessagingTransport>,
    pub classifier: Arc<Classifier>,
    pub entitlement: Arc<dyn EntitlementService>,
    pub listings_service: Arc<dyn ListingsService>,
    pub store: Arc<dyn SpreadsheetStore>,
    pub normalizer: Arc<LocationNormalizer>,
    pub clock: Arc<dyn Clock>,
}

/// Where rows go and how long in-memory state lives
#[derive(Debug, Clone)]
pub struct BotSettings {
    pub spreadsheet_id: String,
    pub listings_sheet: String,
    pub alerts_sheet: String,
    pub idle_timeout: Duration,
    pub dedup_ttl: Duration,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            listings_sheet: "konecte".to_string(),
            alerts_sheet: "AlertasBusquedas".to_string(),
            idle_timeout: Duration::minutes(crate::conversation::state::DEFAULT_IDLE_MINUTES),
            dedup_ttl: Duration::hours(DEFAULT_TTL_HOURS),
        }
    }
}

impl BotSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            spreadsheet_id: config.spreadsheet_id.clone(),
            listings_sheet: config.listings_sheet.clone(),
            alerts_sheet: config.alerts_sheet.clone(),
            idle_timeout: Duration::minutes(config.idle_minutes),
            ..Self::default()
        }
    }
}

/// Best-effort text of a caught panic payload
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub struct Bot {
    transport: Arc<dyn MessagingTransport>,
    classifier: Arc<Classifier>,
    entitlement: Arc<dyn EntitlementService>,
    listings_service: Arc<dyn ListingsService>,
    normalizer: Arc<LocationNormalizer>,
    listings: Arc<ListingRepository>,
    alerts: Arc<AlertRepository>,
    matcher: AlertMatcher,
    signatures: SignatureCache,
    contexts: ContextStore,
}

impl Bot {
    pub fn new(deps: BotDeps, settings: BotSettings) -> Self {
        let listings = Arc::new(ListingRepository::new(
            deps.store.clone(),
            settings.spreadsheet_id.clone(),
            settings.listings_sheet.clone(),
            deps.clock.clone(),
        ));
        let alerts = Arc::new(AlertRepository::new(
            deps.store,
            settings.spreadsheet_id,
            settings.alerts_sheet,
            deps.clock.clone(),
        ));

        Self {
            matcher: AlertMatcher::new(alerts.clone(), deps.transport.clone()),
            signatures: SignatureCache::with_ttl(deps.clock.clone(), settings.dedup_ttl),
            contexts: ContextStore::with_idle_timeout(deps.clock, settings.idle_timeout),
            transport: deps.transport,
            classifier: deps.classifier,
            entitlement: deps.entitlement,
            listings_service: deps.listings_service,
            normalizer: deps.normalizer,
            listings,
            alerts,
        }
    }

    /// Route one inbound message: groups feed the intake pipeline, direct
    /// messages get a reply through the transport
    pub async fn handle_inbound(&self, message: &InboundMessage) -> Result<()> {
        if message.is_group_message {
            let report = self.handle_group_message(message).await;
            info!(
                group = message.group_id.as_deref().unwrap_or(""),
                persisted = report.persisted,
                duplicates = report.duplicates,
                failed = report.failed,
                info_recorded = report.info_recorded,
                "📥 Group message processed"
            );
            return Ok(());
        }

        match self
            .reply_from(&message.text, &message.sender_id, message.sender_name.as_deref())
            .await
        {
            Some(text) => {
                self.transport.send_text(&message.sender_id, &text).await?;
                debug!(sender = %message.sender_id, "Reply sent");
            }
            None => debug!(sender = %message.sender_id, "Handled without a reply"),
        }
        Ok(())
    }
}
