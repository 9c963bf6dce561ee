use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, info, warn};

use super::{panic_message, Bot};
use crate::clients::Identity;
use crate::conversation::intents::{clean_input, is_command, route_idle, strip_formatting, IdleRoute};
use crate::conversation::messages;
use crate::conversation::wizard::{self, WizardOutcome};
use crate::conversation::{ConversationContext, Question};
use crate::error::StoreError;
use crate::models::{Intent, Listing, Publisher, SearchCriteria};

/// The permission apology for permission errors, `fallback` otherwise
pub(super) fn store_failure_reply(err: &StoreError, fallback: &str) -> String {
    if err.is_permission() {
        messages::PERMISSION_APOLOGY.to_string()
    } else {
        fallback.to_string()
    }
}

impl Bot {
    /// Answer a direct message.
    ///
    /// `None` means a handler already sent its own reply and nothing else
    /// should be sent.
    pub async fn reply(&self, text: &str, sender_id: &str) -> Option<String> {
        self.reply_from(text, sender_id, None).await
    }

    /// [`Bot::reply`] with the sender's display name, used for rows the turn writes.
    ///
    /// A panic anywhere in the turn is logged and answered with the generic
    /// error text; the sender's context lock is released on the way out.
    pub async fn reply_from(&self, text: &str, sender_id: &str, sender_name: Option<&str>) -> Option<String> {
        match AssertUnwindSafe(self.converse(text, sender_id, sender_name))
            .catch_unwind()
            .await
        {
            Ok(reply) => reply,
            Err(payload) => {
                let panic = panic_message(payload.as_ref());
                error!(sender = sender_id, stage = "reply", panic = %panic, "Reply handler panicked");
                Some(messages::GENERIC_ERROR.to_string())
            }
        }
    }

    async fn converse(&self, text: &str, sender_id: &str, sender_name: Option<&str>) -> Option<String> {
        if let Some(denial) = self.check_access(sender_id).await {
            return Some(denial);
        }

        let stripped = strip_formatting(text);
        let cleaned = clean_input(text);
        let publisher = Publisher::from_sender(sender_id, sender_name);
        let mut ctx = self.contexts.lock(sender_id).await;

        if is_command(&cleaned) {
            return self.run_command(&cleaned, sender_id, &mut ctx).await;
        }

        if ctx.last_question.is_some_and(|q| q.is_wizard_step()) {
            return Some(self.continue_wizard(&stripped, &publisher, &mut ctx).await);
        }

        let alert_pending = ctx.last_question == Some(Question::CreateAlert);
        let route = route_idle(&cleaned, alert_pending);
        debug!(sender = sender_id, ?route, "Routing idle message");

        if alert_pending && !matches!(route, IdleRoute::AlertAnswer(_)) {
            ctx.reset();
        }

        let reply = match route {
            IdleRoute::Greeting => messages::GREETING.to_string(),
            IdleRoute::SearchMenu => messages::SEARCH_PROMPT.to_string(),
            IdleRoute::PublishMenu => wizard::start(&mut ctx),
            IdleRoute::AlertAnswer(accepted) => self.answer_alert(accepted, sender_id, &mut ctx).await,
            IdleRoute::Search => self.search(&stripped, &publisher, &mut ctx).await,
            IdleRoute::Fallback => messages::FALLBACK.to_string(),
        };
        Some(reply)
    }

    /// A denial or error message when the sender may not use the bot
    async fn check_access(&self, sender_id: &str) -> Option<String> {
        let identity = Identity::from_sender(sender_id);
        match self.entitlement.check_access(&identity).await {
            Ok(decision) if decision.has_access => None,
            Ok(decision) => {
                warn!(
                    sender = sender_id,
                    reason = decision.reason.as_deref().unwrap_or(""),
                    "🚫 Access denied"
                );
                Some(messages::ACCESS_DENIED.to_string())
            }
            Err(e) => {
                error!(sender = sender_id, stage = "access_check", "Access check failed: {:#}", e);
                Some(messages::ACCESS_ERROR.to_string())
            }
        }
    }

    async fn continue_wizard(
        &self,
        answer: &str,
        publisher: &Publisher,
        ctx: &mut ConversationContext,
    ) -> String {
        match wizard::advance(ctx, answer, &self.normalizer) {
            WizardOutcome::Prompt(prompt) => prompt,
            WizardOutcome::Cancelled => messages::PUBLICATION_CANCELLED.to_string(),
            WizardOutcome::Submit(payload) => match self.listings_service.create_listing(&payload).await {
                Ok(ack) => {
                    info!(
                        sender = %publisher.uid,
                        listing_id = ack.id.as_deref().unwrap_or(""),
                        "🏡 Published listing from wizard"
                    );
                    messages::PUBLISHED.to_string()
                }
                Err(e) => {
                    error!(sender = %publisher.uid, stage = "create_listing", "Publication failed: {:#}", e);
                    messages::PUBLISH_ERROR.to_string()
                }
            },
            WizardOutcome::RequestDetails(text) => self.record_request(&text, publisher).await,
        }
    }

    /// Canonical commune and region for a listing
    pub(super) fn normalize_listing(&self, listing: &mut Listing) {
        let location = self
            .normalizer
            .normalize_location(listing.commune(), listing.region.as_deref());
        listing.set_commune(location.commune);
        listing.region = location.region;
    }

    /// Classify free text as search criteria, record it, and answer with
    /// matching offers or an alert offer
    async fn search(&self, text: &str, publisher: &Publisher, ctx: &mut ConversationContext) -> String {
        let Some(listings) = self.classifier.classify(text).await else {
            warn!(sender = %publisher.uid, stage = "search_classification", "Could not classify search");
            return messages::NOT_UNDERSTOOD.to_string();
        };
        let Some(mut listing) = listings.into_iter().next() else {
            return messages::NO_CRITERIA.to_string();
        };

        self.normalize_listing(&mut listing);
        let criteria = SearchCriteria::from_listing(&listing);
        ctx.search_criteria = Some(criteria.clone());

        if let Err(e) = self.listings.save(&listing, publisher).await {
            error!(sender = %publisher.uid, stage = "search_record", "Could not record search: {}", e);
            return store_failure_reply(&e, messages::SAVE_ERROR);
        }

        if listing.intent == Intent::Offer {
            let report = self.matcher.find_matches_and_notify(&listing, Some(publisher)).await;
            info!(sender = %publisher.uid, notified = report.notified, "🏠 Offer registered from chat");
            ctx.search_criteria = None;
            return messages::OFFER_REGISTERED.to_string();
        }

        match self.listings.find_offers(&criteria).await {
            Ok(results) if !results.is_empty() => {
                info!(sender = %publisher.uid, results = results.len(), "🔎 Search answered");
                messages::search_results(&results)
            }
            Ok(_) => {
                info!(sender = %publisher.uid, "🔎 Search without results, offering alert");
                ctx.last_question = Some(Question::CreateAlert);
                messages::no_results(&criteria)
            }
            Err(e) => {
                error!(sender = %publisher.uid, stage = "search_query", "Search failed: {}", e);
                store_failure_reply(&e, messages::SEARCH_ERROR)
            }
        }
    }

    async fn answer_alert(&self, accepted: bool, sender_id: &str, ctx: &mut ConversationContext) -> String {
        let criteria = ctx.search_criteria.take();
        ctx.reset();

        if !accepted {
            return messages::ALERT_DECLINED.to_string();
        }
        let Some(criteria) = criteria else {
            return messages::NO_CRITERIA.to_string();
        };

        match self.alerts.create(sender_id, &criteria).await {
            Ok(_) => messages::ALERT_CREATED.to_string(),
            Err(e) => {
                error!(sender = sender_id, stage = "alert_create", "Could not create alert: {}", e);
                store_failure_reply(&e, messages::ALERT_CREATE_ERROR)
            }
        }
    }

    /// Store the listings found in a request as `Busco` rows
    async fn record_request(&self, text: &str, publisher: &Publisher) -> String {
        let listings = match self.classifier.classify(text).await {
            Some(listings) if !listings.is_empty() => listings,
            _ => return messages::REQUEST_NOT_UNDERSTOOD.to_string(),
        };

        for mut listing in listings {
            listing.intent = Intent::Request;
            self.normalize_listing(&mut listing);
            if let Err(e) = self.listings.save(&listing, publisher).await {
                error!(sender = %publisher.uid, stage = "request_record", "Could not record request: {}", e);
                return store_failure_reply(&e, messages::SAVE_ERROR);
            }
        }
        info!(sender = %publisher.uid, "📝 Request recorded");
        messages::REQUEST_SAVED.to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::conversation::messages;
    use crate::error::StoreError;
    use crate::models::{Currency, InboundMessage};
    use crate::testing::{Harness, RecordingListings, ScriptedClassification, StaticEntitlement};

    const SENDER: &str = "56912345678@c.us";

    const SEARCH_JSON: &str = r#"{"anuncios": [{
        "busco_ofrezco": "busco",
        "tipo_operacion": "Arriendo",
        "propiedad": "Departamento",
        "region": "Metropolitana",
        "opcion_comuna": "Ñuñoa",
        "dormitorios": "2"
    }]}"#;

    const OFFER_JSON: &str = r#"{"anuncios": [{
        "busco_ofrezco": "ofrezco",
        "tipo_operacion": "Arriendo",
        "propiedad": "Departamento",
        "opcion_comuna": "Ñuñoa",
        "dormitorios": "2",
        "valor": "550000",
        "moneda": "CLP"
    }]}"#;

    fn harness() -> Harness {
        Harness::new(ScriptedClassification::replying(SEARCH_JSON))
    }

    async fn say(h: &Harness, text: &str) -> Option<String> {
        h.bot.reply(text, SENDER).await
    }

    #[tokio::test]
    async fn wizard_publishes_exactly_once_and_returns_to_idle() {
        let h = harness();
        let answers = [
            "Depto test",
            "desc",
            "Venta",
            "Departamento",
            "5000 UF",
            "Providencia",
            "80",
            "2,1,1",
            "Piscina",
        ];

        say(&h, "2").await;
        say(&h, "1").await;
        for answer in answers {
            say(&h, answer).await;
        }
        let done = say(&h, "Sí").await;
        assert_eq!(done.as_deref(), Some(messages::PUBLISHED));

        let payloads = h.listings.payloads();
        assert_eq!(payloads.len(), 1);
        let json = serde_json::to_value(&payloads[0]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "titulo": "Depto test",
                "operacion": "Venta",
                "categoria": "Departamento",
                "valor": 5000.0,
                "moneda": "UF",
                "comuna": "Providencia",
                "superficie": 80.0,
                "dormitorios": 2,
                "banos": 1,
                "estacionamientos": 1,
                "caracteristicas": "Piscina",
                "descripcion": "desc"
            })
        );
        assert_eq!(payloads[0].currency, Currency::Uf);

        assert_eq!(say(&h, "hola").await.as_deref(), Some(messages::GREETING));
    }

    #[tokio::test]
    async fn declined_confirmation_publishes_nothing() {
        let h = harness();
        for answer in [
            "!publicar", "1", "Depto test", "desc", "Venta", "Departamento", "5000 UF", "Providencia", "80",
            "2,1,1", "Piscina",
        ] {
            say(&h, answer).await;
        }
        let reply = say(&h, "No").await;
        assert_eq!(reply.as_deref(), Some(messages::PUBLICATION_CANCELLED));
        assert!(h.listings.payloads().is_empty());
        assert_eq!(say(&h, "hola").await.as_deref(), Some(messages::GREETING));
    }

    #[tokio::test]
    async fn failed_publication_still_clears_the_wizard() {
        let h = Harness::build(
            ScriptedClassification::replying(SEARCH_JSON),
            StaticEntitlement::Granted,
            RecordingListings::failing(),
        );
        for answer in [
            "2", "1", "Casa", "Amplia", "Arriendo", "Casa", "900.000", "Maipú", "120", "3,2,2", "Patio",
        ] {
            say(&h, answer).await;
        }
        assert_eq!(say(&h, "si").await.as_deref(), Some(messages::PUBLISH_ERROR));
        assert_eq!(say(&h, "hola").await.as_deref(), Some(messages::GREETING));
    }

    #[tokio::test]
    async fn denied_or_failing_access_short_circuits() {
        let denied = Harness::build(
            ScriptedClassification::replying(SEARCH_JSON),
            StaticEntitlement::Denied,
            RecordingListings::default(),
        );
        assert_eq!(say(&denied, "!publicar").await.as_deref(), Some(messages::ACCESS_DENIED));
        assert!(denied.transport.sent().is_empty());

        let failing = Harness::build(
            ScriptedClassification::replying(SEARCH_JSON),
            StaticEntitlement::Failing,
            RecordingListings::default(),
        );
        assert_eq!(say(&failing, "hola").await.as_deref(), Some(messages::ACCESS_ERROR));
        assert_eq!(failing.classification.calls(), 0);
    }

    #[tokio::test]
    async fn search_without_results_offers_an_alert() {
        let h = harness();
        let reply = say(&h, "Busco depto en Ñuñoa, 2 dormitorios").await.unwrap();
        assert!(reply.contains("No encontré propiedades"));

        let rows = h.listing_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "Busco");
        assert_eq!(rows[1][3], "Metropolitana de Santiago");

        assert_eq!(say(&h, "Sí").await.as_deref(), Some(messages::ALERT_CREATED));
        let alerts = h.alert_rows();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[1][1], SENDER);
        assert_eq!(alerts[1][3], "Departamento");
        assert_eq!(alerts[1][5], "Ñuñoa");
        assert_eq!(alerts[1][9], "activa");

        assert_eq!(say(&h, "Sí").await.as_deref(), Some(messages::FALLBACK));
    }

    #[tokio::test]
    async fn declining_the_alert_creates_nothing() {
        let h = harness();
        say(&h, "Busco depto en Ñuñoa").await;
        assert_eq!(say(&h, "no").await.as_deref(), Some(messages::ALERT_DECLINED));
        assert!(h.alert_rows().is_empty());
    }

    #[tokio::test]
    async fn search_lists_matching_offers() {
        let h = Harness::new(ScriptedClassification::replying(SEARCH_JSON).then_reply(OFFER_JSON));

        let registered = h.bot.reply("Arriendo depto en Ñuñoa", "56900000009@c.us").await;
        assert_eq!(registered.as_deref(), Some(messages::OFFER_REGISTERED));

        let reply = say(&h, "Busco depto en Ñuñoa").await.unwrap();
        assert!(reply.contains("Encontré 1 propiedades"));
        assert!(reply.contains("Ñuñoa"));
        assert!(reply.contains("+56900000009"));
    }

    #[tokio::test]
    async fn a_panicking_turn_gets_the_generic_error_and_frees_the_sender() {
        let h = Harness::new(ScriptedClassification::replying(SEARCH_JSON).then_panic("classifier exploded"));
        let message = InboundMessage {
            sender_id: SENDER.to_string(),
            text: "Busco depto en Ñuñoa".to_string(),
            is_group_message: false,
            group_id: None,
            sender_name: None,
        };

        h.bot.handle_inbound(&message).await.unwrap();
        assert_eq!(h.transport.sent_to(SENDER), vec![messages::GENERIC_ERROR.to_string()]);

        assert_eq!(say(&h, "hola").await.as_deref(), Some(messages::GREETING));
        let reply = say(&h, "Busco depto en Ñuñoa").await.unwrap();
        assert!(reply.contains("No encontré propiedades"));
    }

    #[tokio::test]
    async fn permission_errors_get_the_apology() {
        let h = harness();
        h.store.fail_with(StoreError::Permission("403: caller lacks access".into()));
        let reply = say(&h, "Busco depto en Ñuñoa").await;
        assert_eq!(reply.as_deref(), Some(messages::PERMISSION_APOLOGY));

        h.store.fail_with(StoreError::Backend("500: unavailable".into()));
        let reply = say(&h, "Busco depto en Ñuñoa").await;
        assert_eq!(reply.as_deref(), Some(messages::SAVE_ERROR));
    }

    #[tokio::test]
    async fn unclassifiable_search_asks_for_detail() {
        let h = Harness::new(ScriptedClassification::failing("timeout"));
        let reply = say(&h, "Busco depto en Ñuñoa").await;
        assert_eq!(reply.as_deref(), Some(messages::NOT_UNDERSTOOD));
        assert!(h.listing_rows().is_empty());

        let empty = Harness::new(ScriptedClassification::replying(r#"{"anuncios": []}"#));
        let reply = say(&empty, "Busco depto").await;
        assert_eq!(reply.as_deref(), Some(messages::NO_CRITERIA));
    }

    #[tokio::test]
    async fn request_branch_records_busco_rows() {
        let h = Harness::new(ScriptedClassification::replying(OFFER_JSON));
        say(&h, "!publicar").await;
        assert_eq!(say(&h, "2").await.as_deref(), Some(messages::ASK_REQUEST_DETAILS));
        let reply = say(&h, "Necesito depto en Ñuñoa hasta 550 mil").await;
        assert_eq!(reply.as_deref(), Some(messages::REQUEST_SAVED));

        let rows = h.listing_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "Busco");
        assert_eq!(say(&h, "hola").await.as_deref(), Some(messages::GREETING));
    }

    #[tokio::test]
    async fn menu_and_fallback() {
        let h = harness();
        assert_eq!(say(&h, "*Hola*").await.as_deref(), Some(messages::GREETING));
        assert_eq!(say(&h, "1").await.as_deref(), Some(messages::SEARCH_PROMPT));
        assert_eq!(say(&h, "qué hora es").await.as_deref(), Some(messages::FALLBACK));
        assert_eq!(h.classification.calls(), 0);
    }

    #[tokio::test]
    async fn expired_wizard_reads_as_idle() {
        let h = harness();
        say(&h, "!publicar").await;
        say(&h, "1").await;
        h.clock.advance(chrono::Duration::minutes(45));
        assert_eq!(say(&h, "hola").await.as_deref(), Some(messages::GREETING));
    }
}
