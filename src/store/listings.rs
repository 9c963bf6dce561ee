use std::sync::Arc;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::StoreError;
use crate::models::{Intent, Listing, Publisher, SearchCriteria};
use crate::store::schema::{self, StoredListing, LISTINGS_COLUMNS, LISTING_HEADERS};
use crate::store::traits::SpreadsheetStore;
use crate::text::normalize_text;

/// Listings sheet: one row per offer, request or info message
pub struct ListingRepository {
    store: Arc<dyn SpreadsheetStore>,
    container_id: String,
    sheet: String,
    clock: Arc<dyn Clock>,
}

impl ListingRepository {
    pub fn new(
        store: Arc<dyn SpreadsheetStore>,
        container_id: impl Into<String>,
        sheet: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            container_id: container_id.into(),
            sheet: sheet.into(),
            clock,
        }
    }

    /// Append a listing row, creating the sheet (with headers) on first use
    pub async fn save(&self, listing: &Listing, publisher: &Publisher) -> Result<(), StoreError> {
        if self.store.ensure_sheet_exists(&self.container_id, &self.sheet).await? {
            let headers: Vec<String> = LISTING_HEADERS.iter().map(|h| h.to_string()).collect();
            self.store.append_row(&self.container_id, &self.sheet, &headers).await?;
            info!(sheet = %self.sheet, "📄 Wrote listings header row");
        }

        let row = schema::listing_row(listing, publisher, self.clock.now());
        self.store.append_row(&self.container_id, &self.sheet, &row).await?;
        debug!(intent = listing.intent.sheet_label(), sender = %publisher.uid, "Saved listing row");
        Ok(())
    }

    /// All parseable rows of the sheet. A missing sheet reads as empty.
    pub async fn all(&self) -> Result<Vec<StoredListing>, StoreError> {
        let range = schema::range(&self.sheet, LISTINGS_COLUMNS);
        let rows = match self.store.read_range(&self.container_id, &range).await {
            Ok(rows) => rows,
            Err(StoreError::SheetNotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        Ok(rows.iter().filter_map(|row| schema::listing_from_row(row)).collect())
    }

    /// Offers matching the criteria: same category and operation when given,
    /// and a commune containing one of the wanted communes
    pub async fn find_offers(&self, criteria: &SearchCriteria) -> Result<Vec<StoredListing>, StoreError> {
        let offers: Vec<StoredListing> = self
            .all()
            .await?
            .into_iter()
            .filter(|stored| stored.listing.intent == Intent::Offer)
            .filter(|stored| offer_matches(&stored.listing, criteria))
            .collect();
        debug!(results = offers.len(), "Searched offers");
        Ok(offers)
    }
}

fn same_value(wanted: Option<&str>, actual: Option<&str>) -> bool {
    match wanted.map(normalize_text).filter(|w| !w.is_empty()) {
        None => true,
        Some(wanted) => actual.map(normalize_text).as_deref() == Some(wanted.as_str()),
    }
}

fn offer_matches(offer: &Listing, criteria: &SearchCriteria) -> bool {
    if !same_value(criteria.property_category.as_deref(), offer.property_category.as_deref()) {
        return false;
    }
    if !same_value(criteria.operation_type.as_deref(), offer.operation_type.as_deref()) {
        return false;
    }

    let wanted: Vec<String> = criteria
        .communes
        .iter()
        .map(|c| normalize_text(c))
        .filter(|c| !c.is_empty())
        .collect();
    if wanted.is_empty() {
        return true;
    }
    offer.commune().map(normalize_text).is_some_and(|commune| {
        wanted.iter().any(|w| commune.contains(w.as_str()))
    })
}
