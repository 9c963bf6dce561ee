use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::models::{Currency, ListingPayload, SearchCriteria};

pub const DEFAULT_IDLE_MINUTES: i64 = 30;

/// The question the bot is waiting on for a sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Question {
    PublicationType,
    Title,
    Description,
    Transaction,
    Category,
    Price,
    Location,
    Area,
    Rooms,
    Features,
    Confirmation,
    RequestDetails,
    CreateAlert,
}

impl Question {
    pub fn as_str(&self) -> &'static str {
        match self {
            Question::PublicationType => "awaiting_publication_type",
            Question::Title => "prop_awaiting_title",
            Question::Description => "prop_awaiting_description",
            Question::Transaction => "prop_awaiting_transaction",
            Question::Category => "prop_awaiting_category",
            Question::Price => "prop_awaiting_price",
            Question::Location => "prop_awaiting_location",
            Question::Area => "prop_awaiting_area",
            Question::Rooms => "prop_awaiting_rooms",
            Question::Features => "prop_awaiting_features",
            Question::Confirmation => "prop_awaiting_confirmation",
            Question::RequestDetails => "awaiting_request_details",
            Question::CreateAlert => "createAlert",
        }
    }

    /// Steps owned by the publication wizard
    pub fn is_wizard_step(&self) -> bool {
        !matches!(self, Question::CreateAlert)
    }
}

/// Answers collected by the publication wizard so far
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublicationDraft {
    pub title: Option<String>,
    pub description: Option<String>,
    pub operation: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<Currency>,
    pub commune: Option<String>,
    pub area_m2: Option<f64>,
    pub bedrooms: Option<u32>,
    pub bathrooms: Option<u32>,
    pub parking: Option<u32>,
    pub features: Option<String>,
}

impl PublicationDraft {
    /// The finished payload, or `None` while any answer is missing
    pub fn into_payload(self) -> Option<ListingPayload> {
        Some(ListingPayload {
            title: self.title?,
            operation: self.operation?,
            category: self.category?,
            price: self.price?,
            currency: self.currency?,
            commune: self.commune?,
            area_m2: self.area_m2?,
            bedrooms: self.bedrooms?,
            bathrooms: self.bathrooms?,
            parking: self.parking?,
            features: self.features?,
            description: self.description?,
        })
    }
}

/// Per-sender conversation state
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationContext {
    pub last_question: Option<Question>,
    pub draft: PublicationDraft,
    pub search_criteria: Option<SearchCriteria>,
    pub last_activity: DateTime<Utc>,
}

impl ConversationContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            last_question: None,
            draft: PublicationDraft::default(),
            search_criteria: None,
            last_activity: now,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.last_question.is_none()
    }

    /// Back to idle, dropping any draft and pending alert
    pub fn reset(&mut self) {
        self.last_question = None;
        self.draft = PublicationDraft::default();
        self.search_criteria = None;
    }
}

pub type ContextGuard = OwnedMutexGuard<ConversationContext>;

/// Conversation contexts keyed by sender.
///
/// Each sender has its own async lock, so messages from one sender are
/// handled one at a time while different senders proceed in parallel.
/// A context untouched for longer than the idle timeout starts over.
pub struct ContextStore {
    entries: Mutex<HashMap<String, Arc<AsyncMutex<ConversationContext>>>>,
    idle_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl ContextStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_idle_timeout(clock, Duration::minutes(DEFAULT_IDLE_MINUTES))
    }

    pub fn with_idle_timeout(clock: Arc<dyn Clock>, idle_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            idle_timeout,
            clock,
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<ConversationContext>>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Lock the sender's context, creating it on first contact.
    ///
    /// An expired context is reset before it is handed out, and the
    /// activity time is refreshed.
    pub async fn lock(&self, sender_id: &str) -> ContextGuard {
        self.sweep();

        let slot = {
            let now = self.clock.now();
            let mut entries = self.entries();
            let slot = entries
                .entry(sender_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(ConversationContext::new(now))))
                .clone();
            slot
        };

        let mut ctx = slot.lock_owned().await;
        let now = self.clock.now();
        if now - ctx.last_activity > self.idle_timeout && !ctx.is_idle() {
            info!(
                sender = sender_id,
                question = ctx.last_question.map(|q| q.as_str()).unwrap_or(""),
                "⌛ Conversation expired, starting over"
            );
            ctx.reset();
        }
        ctx.last_activity = now;
        ctx
    }

    /// Drop contexts idle past the timeout that nobody is holding
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let timeout = self.idle_timeout;
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            let keep = match slot.try_lock() {
                Ok(ctx) => now - ctx.last_activity <= timeout,
                Err(_) => true,
            };
            keep
        });
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "Swept idle conversations");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
