//! In-process doubles for the collaborator traits, shared by the unit tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use crate::bot::{Bot, BotDeps, BotSettings};
use crate::classifier::Classifier;
use crate::clients::{
    AccessDecision, ClassificationService, DeliveryReceipt, EntitlementService, Identity, ListingAck,
    ListingsService, MessagingTransport,
};
use crate::clock::Clock;
use crate::location::LocationNormalizer;
use crate::models::ListingPayload;
use crate::store::InMemorySpreadsheet;

/// A clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        let start = Utc
            .with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        Self { now: Mutex::new(start) }
    }
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Records delivered messages; recipients registered with `fail_for` get an error
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, String)>>,
    failing: Mutex<HashSet<String>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_for(&self, to: &str) {
        self.failing.lock().unwrap().insert(to.to_string());
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts delivered to one recipient
    pub fn sent_to(&self, to: &str) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(recipient, _)| recipient == to)
            .map(|(_, text)| text)
            .collect()
    }
}

#[async_trait]
impl MessagingTransport for RecordingTransport {
    async fn send_text(&self, to: &str, text: &str) -> Result<DeliveryReceipt> {
        if self.failing.lock().unwrap().contains(to) {
            return Err(anyhow!("delivery to {} failed", to));
        }
        let mut sent = self.sent.lock().unwrap();
        sent.push((to.to_string(), text.to_string()));
        Ok(DeliveryReceipt {
            id: Some(format!("msg-{}", sent.len())),
        })
    }
}

enum Script {
    Reply(String),
    Fail(String),
    Panic(String),
}

/// Classification service answering from a script.
///
/// Queued answers are consumed in order; once the queue is empty the
/// fallback answer repeats.
pub struct ScriptedClassification {
    queue: Mutex<VecDeque<Script>>,
    fallback: Script,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClassification {
    fn with_fallback(fallback: Script) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(json: &str) -> Self {
        Self::with_fallback(Script::Reply(json.to_string()))
    }

    pub fn failing(reason: &str) -> Self {
        Self::with_fallback(Script::Fail(reason.to_string()))
    }

    /// Queue a one-off answer ahead of the fallback
    pub fn then_reply(self, json: &str) -> Self {
        self.queue.lock().unwrap().push_back(Script::Reply(json.to_string()));
        self
    }

    /// Queue a call that panics, for exercising the handlers' panic boundary
    pub fn then_panic(self, message: &str) -> Self {
        self.queue.lock().unwrap().push_back(Script::Panic(message.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ClassificationService for ScriptedClassification {
    async fn complete_json(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.queue.lock().unwrap().pop_front();
        match next.as_ref().unwrap_or(&self.fallback) {
            Script::Reply(json) => Ok(json.clone()),
            Script::Fail(reason) => Err(anyhow!("{}", reason)),
            Script::Panic(message) => panic!("{}", message),
        }
    }

    fn service_name(&self) -> &'static str {
        "scripted"
    }
}

/// Entitlement service with a fixed answer
pub enum StaticEntitlement {
    Granted,
    Denied,
    Failing,
}

#[async_trait]
impl EntitlementService for StaticEntitlement {
    async fn check_access(&self, _identity: &Identity) -> Result<AccessDecision> {
        match self {
            Self::Granted => Ok(AccessDecision::granted()),
            Self::Denied => Ok(AccessDecision::denied("plan without messaging access")),
            Self::Failing => Err(anyhow!("entitlement service unreachable")),
        }
    }
}

/// Listings service that keeps every payload it receives
#[derive(Default)]
pub struct RecordingListings {
    payloads: Mutex<Vec<ListingPayload>>,
    failing: bool,
}

impl RecordingListings {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn payloads(&self) -> Vec<ListingPayload> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingsService for RecordingListings {
    async fn create_listing(&self, payload: &ListingPayload) -> Result<ListingAck> {
        if self.failing {
            return Err(anyhow!("listings service returned 500"));
        }
        let mut payloads = self.payloads.lock().unwrap();
        payloads.push(payload.clone());
        Ok(ListingAck {
            id: Some(format!("prop-{}", payloads.len())),
        })
    }
}

/// A bot wired to in-memory doubles
pub struct Harness {
    pub bot: Bot,
    pub store: Arc<InMemorySpreadsheet>,
    pub transport: Arc<RecordingTransport>,
    pub classification: Arc<ScriptedClassification>,
    pub listings: Arc<RecordingListings>,
    pub clock: Arc<ManualClock>,
}

pub const SPREADSHEET: &str = "test-spreadsheet";

impl Harness {
    pub fn new(classification: ScriptedClassification) -> Self {
        Self::build(classification, StaticEntitlement::Granted, RecordingListings::default())
    }

    pub fn build(
        classification: ScriptedClassification,
        entitlement: StaticEntitlement,
        listings: RecordingListings,
    ) -> Self {
        let store = Arc::new(InMemorySpreadsheet::new());
        let transport = Arc::new(RecordingTransport::new());
        let classification = Arc::new(classification);
        let listings = Arc::new(listings);
        let clock = Arc::new(ManualClock::default());

        let deps = BotDeps {
            transport: transport.clone(),
            classifier: Arc::new(Classifier::new(classification.clone())),
            entitlement: Arc::new(entitlement),
            listings_service: listings.clone(),
            store: store.clone(),
            normalizer: Arc::new(LocationNormalizer::builtin()),
            clock: clock.clone(),
        };
        let settings = BotSettings {
            spreadsheet_id: SPREADSHEET.to_string(),
            ..BotSettings::default()
        };

        Self {
            bot: Bot::new(deps, settings),
            store,
            transport,
            classification,
            listings,
            clock,
        }
    }

    pub fn listing_rows(&self) -> Vec<Vec<String>> {
        self.store.rows(SPREADSHEET, &BotSettings::default().listings_sheet)
    }

    pub fn alert_rows(&self) -> Vec<Vec<String>> {
        self.store.rows(SPREADSHEET, &BotSettings::default().alerts_sheet)
    }
}
