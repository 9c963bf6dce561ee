use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, info, warn};

use super::{panic_message, Bot};
use crate::classifier::mentions_property;
use crate::models::{InboundMessage, Intent, Listing, Publisher};
use crate::signature::signature;

/// What the intake pipeline did with one group message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeReport {
    pub persisted: usize,
    pub duplicates: usize,
    pub failed: usize,
    /// The message had no ads but mentioned properties, and was kept as an info row
    pub info_recorded: bool,
    pub alerts_notified: usize,
}

impl Bot {
    /// Classify a group message and store every new listing in it.
    ///
    /// Nothing is ever sent to the group. Offers are matched against the
    /// active alerts after they are stored. A panic while processing counts
    /// as one failure.
    pub async fn handle_group_message(&self, message: &InboundMessage) -> IntakeReport {
        match AssertUnwindSafe(self.intake(message)).catch_unwind().await {
            Ok(report) => report,
            Err(payload) => {
                let panic = panic_message(payload.as_ref());
                error!(
                    group = message.group_id.as_deref().unwrap_or(""),
                    sender = %message.sender_id,
                    stage = "intake",
                    panic = %panic,
                    "Group intake panicked"
                );
                IntakeReport {
                    failed: 1,
                    ..IntakeReport::default()
                }
            }
        }
    }

    async fn intake(&self, message: &InboundMessage) -> IntakeReport {
        let mut report = IntakeReport::default();
        let text = message.text.trim();
        if text.is_empty() {
            return report;
        }

        let group = message.group_id.as_deref().unwrap_or("");
        let publisher = Publisher::from_sender(&message.sender_id, message.sender_name.as_deref());

        let Some(listings) = self.classifier.classify(text).await else {
            warn!(group, sender = %message.sender_id, stage = "classification", "Dropping unclassified group message");
            return report;
        };

        if listings.is_empty() {
            if mentions_property(text) {
                let info_listing = Listing::new(Intent::Info, text);
                match self.listings.save(&info_listing, &publisher).await {
                    Ok(()) => {
                        report.info_recorded = true;
                        info!(group, sender = %message.sender_id, "ℹ️ Stored property-related message as info");
                    }
                    Err(e) => {
                        report.failed += 1;
                        error!(group, sender = %message.sender_id, stage = "persist_info", "Could not store info row: {}", e);
                    }
                }
            } else {
                debug!(group, "Message has no listings");
            }
            return report;
        }

        for mut listing in listings {
            self.normalize_listing(&mut listing);

            let fingerprint = signature(&listing);
            if self.signatures.seen_recently(&fingerprint) {
                report.duplicates += 1;
                info!(group, signature = %fingerprint, "♻️ Skipping duplicate listing");
                continue;
            }

            if let Err(e) = self.listings.save(&listing, &publisher).await {
                report.failed += 1;
                error!(
                    group,
                    sender = %message.sender_id,
                    stage = "persist_listing",
                    signature = %fingerprint,
                    "Could not store listing: {}", e
                );
                continue;
            }
            self.signatures.remember(&fingerprint);
            report.persisted += 1;

            if listing.intent == Intent::Offer {
                let matches = self.matcher.find_matches_and_notify(&listing, Some(&publisher)).await;
                report.alerts_notified += matches.notified;
            }
        }

        report
    }
}
