pub mod notification;
pub mod price;

pub use notification::compose_notification;
pub use price::normalize_price;

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::clients::MessagingTransport;
use crate::models::{Currency, Listing, Publisher, SearchAlert};
use crate::store::AlertRepository;
use crate::text::{normalize_text, parse_count};

pub const CATEGORY_WEIGHT: u32 = 2;
pub const REGION_WEIGHT: u32 = 1;
pub const COMMUNE_WEIGHT: u32 = 3;
pub const BEDROOMS_WEIGHT: u32 = 2;
pub const BATHROOMS_WEIGHT: u32 = 1;
pub const PRICE_WEIGHT: u32 = 2;

/// Minimum score for an alert to be notified. A commune match alone reaches it.
pub const MATCH_THRESHOLD: u32 = 3;

/// A criterion an offer satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedCriterion {
    Category,
    Region,
    Commune,
    Bedrooms,
    Bathrooms,
    Price,
}

impl MatchedCriterion {
    pub fn weight(&self) -> u32 {
        match self {
            MatchedCriterion::Category => CATEGORY_WEIGHT,
            MatchedCriterion::Region => REGION_WEIGHT,
            MatchedCriterion::Commune => COMMUNE_WEIGHT,
            MatchedCriterion::Bedrooms => BEDROOMS_WEIGHT,
            MatchedCriterion::Bathrooms => BATHROOMS_WEIGHT,
            MatchedCriterion::Price => PRICE_WEIGHT,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MatchedCriterion::Category => "tipo de propiedad",
            MatchedCriterion::Region => "región",
            MatchedCriterion::Commune => "comuna",
            MatchedCriterion::Bedrooms => "dormitorios",
            MatchedCriterion::Bathrooms => "baños",
            MatchedCriterion::Price => "precio",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertScore {
    pub score: u32,
    pub matched: Vec<MatchedCriterion>,
}

impl AlertScore {
    pub fn is_match(&self) -> bool {
        self.score >= MATCH_THRESHOLD
    }
}

/// Either value contains the other once normalized; blanks never overlap
fn overlaps(a: Option<&str>, b: Option<&str>) -> bool {
    let (Some(a), Some(b)) = (a.map(normalize_text), b.map(normalize_text)) else {
        return false;
    };
    !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a))
}

fn price_within_budget(offer: &Listing, alert: &SearchAlert) -> bool {
    let alert_currency = alert.other.currency.as_deref().and_then(Currency::parse);
    if let (Some(offered), Some(wanted)) = (offer.currency, alert_currency) {
        if offered != wanted {
            return false;
        }
    }

    match (
        normalize_price(offer.price.as_deref()),
        normalize_price(alert.budget()),
    ) {
        (Some(price), Some(budget)) => price <= budget,
        _ => false,
    }
}

/// Score an alert against an offer. Criteria are independent; any subset may match.
pub fn score_alert(alert: &SearchAlert, offer: &Listing) -> AlertScore {
    let mut matched = Vec::new();

    if overlaps(alert.property_category.as_deref(), offer.property_category.as_deref()) {
        matched.push(MatchedCriterion::Category);
    }
    if overlaps(alert.region.as_deref(), offer.region.as_deref()) {
        matched.push(MatchedCriterion::Region);
    }
    if offer
        .commune_options
        .iter()
        .any(|commune| overlaps(alert.commune.as_deref(), Some(commune)))
    {
        matched.push(MatchedCriterion::Commune);
    }
    if let (Some(offered), Some(wanted)) = (
        parse_count(offer.bedrooms.as_deref()),
        parse_count(alert.bedrooms_min.as_deref()),
    ) {
        if offered >= wanted {
            matched.push(MatchedCriterion::Bedrooms);
        }
    }
    if let (Some(offered), Some(wanted)) = (
        parse_count(offer.bathrooms.as_deref()),
        parse_count(alert.bathrooms_min.as_deref()),
    ) {
        if offered >= wanted {
            matched.push(MatchedCriterion::Bathrooms);
        }
    }
    if price_within_budget(offer, alert) {
        matched.push(MatchedCriterion::Price);
    }

    AlertScore {
        score: matched.iter().map(|m| m.weight()).sum(),
        matched,
    }
}

/// Outcome of one matching pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchReport {
    pub evaluated: usize,
    pub matched: usize,
    pub notified: usize,
    pub failed: usize,
}

/// Scores stored alerts against new offers and notifies their owners
pub struct AlertMatcher {
    alerts: Arc<AlertRepository>,
    transport: Arc<dyn MessagingTransport>,
}

impl AlertMatcher {
    pub fn new(alerts: Arc<AlertRepository>, transport: Arc<dyn MessagingTransport>) -> Self {
        Self { alerts, transport }
    }

    /// Notify every active alert the offer matches.
    ///
    /// Sends are sequential and isolated: one failed delivery is logged and
    /// the loop moves on. Alerts owned by the publisher are skipped.
    pub async fn find_matches_and_notify(&self, offer: &Listing, publisher: Option<&Publisher>) -> MatchReport {
        let mut report = MatchReport::default();

        let alerts = match self.alerts.active().await {
            Ok(alerts) => alerts,
            Err(e) => {
                warn!(stage = "alert_matching", "Could not load alerts: {}", e);
                return report;
            }
        };

        for record in alerts {
            if publisher.is_some_and(|p| p.uid == record.alert.sender_id) {
                continue;
            }
            report.evaluated += 1;

            let score = score_alert(&record.alert, offer);
            debug!(alert_id = %record.alert.alert_id, score = score.score, "Scored alert");
            if !score.is_match() {
                continue;
            }
            report.matched += 1;

            let message = compose_notification(offer, publisher, &score.matched);
            match self.transport.send_text(&record.alert.sender_id, &message).await {
                Ok(_) => {
                    report.notified += 1;
                    info!(
                        alert_id = %record.alert.alert_id,
                        sender = %record.alert.sender_id,
                        score = score.score,
                        "📨 Alert notification sent"
                    );
                    if let Err(e) = self.alerts.mark_notified(&record).await {
                        warn!(alert_id = %record.alert.alert_id, "Could not record notification time: {}", e);
                    }
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        alert_id = %record.alert.alert_id,
                        sender = %record.alert.sender_id,
                        "Alert notification failed: {:#}", e
                    );
                }
            }
        }

        report
    }
}
