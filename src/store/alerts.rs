use chrono::{DateTime, SecondsFormat, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::StoreError;
use crate::models::{AlertStatus, OtherCriteria, SearchAlert, SearchCriteria};
use crate::store::schema::{self, ALERTS_COLUMNS, ALERT_HEADERS};
use crate::store::traits::SpreadsheetStore;

/// An alert together with the sheet row it lives in
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRecord {
    /// 1-based sheet row
    pub row: usize,
    pub alert: SearchAlert,
}

/// Alerts sheet: standing searches and their notification state
pub struct AlertRepository {
    store: Arc<dyn SpreadsheetStore>,
    container_id: String,
    sheet: String,
    clock: Arc<dyn Clock>,
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl AlertRepository {
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

    /// Build an alert from search criteria and append it
    pub async fn create(&self, sender_id: &str, criteria: &SearchCriteria) -> Result<SearchAlert, StoreError> {
        let now = self.clock.now();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let alert = SearchAlert {
            alert_id: format!("ALERTA-{}-{}", now.timestamp_millis(), &suffix[..6]),
            sender_id: sender_id.to_string(),
            created_at: timestamp(now),
            property_category: criteria.property_category.clone(),
            region: criteria.region.clone(),
            commune: criteria.communes.first().cloned(),
            bedrooms_min: criteria.bedrooms_min.clone(),
            bathrooms_min: criteria.bathrooms_min.clone(),
            other: OtherCriteria {
                budget_max: criteria.budget_max.clone(),
                currency: criteria.currency.map(|c| c.as_str().to_string()),
                parking: criteria.parking.clone(),
                storage: criteria.storage.clone(),
                area_min: criteria.area_min.clone(),
            },
            status: AlertStatus::Active,
            last_notified_at: None,
        };

        if self.store.ensure_sheet_exists(&self.container_id, &self.sheet).await? {
            let headers: Vec<String> = ALERT_HEADERS.iter().map(|h| h.to_string()).collect();
            self.store.append_row(&self.container_id, &self.sheet, &headers).await?;
        }
        self.store
            .append_row(&self.container_id, &self.sheet, &schema::alert_row(&alert))
            .await?;

        info!(alert_id = %alert.alert_id, sender = sender_id, "🔔 Created search alert");
        Ok(alert)
    }

    /// Every alert row, in sheet order. A missing sheet reads as empty.
    pub async fn all(&self) -> Result<Vec<AlertRecord>, StoreError> {
        let range = schema::range(&self.sheet, ALERTS_COLUMNS);
        let rows = match self.store.read_range(&self.container_id, &range).await {
            Ok(rows) => rows,
            Err(StoreError::SheetNotFound(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(rows
            .iter()
            .enumerate()
            .filter_map(|(idx, row)| {
                schema::alert_from_row(row).map(|alert| AlertRecord { row: idx + 1, alert })
            })
            .collect())
    }

    pub async fn active(&self) -> Result<Vec<AlertRecord>, StoreError> {
        let active: Vec<AlertRecord> = self
            .all()
            .await?
            .into_iter()
            .filter(|record| record.alert.status == AlertStatus::Active)
            .collect();
        debug!(count = active.len(), "Loaded active alerts");
        Ok(active)
    }

    pub async fn active_for_sender(&self, sender_id: &str) -> Result<Vec<AlertRecord>, StoreError> {
        Ok(self
            .active()
            .await?
            .into_iter()
            .filter(|record| record.alert.sender_id == sender_id)
            .collect())
    }

    pub async fn set_status(&self, record: &AlertRecord, status: AlertStatus) -> Result<(), StoreError> {
        let mut alert = record.alert.clone();
        alert.status = status;
        self.write(record.row, &alert).await?;
        info!(alert_id = %alert.alert_id, status = status.sheet_label(), "Updated alert status");
        Ok(())
    }

    pub async fn mark_notified(&self, record: &AlertRecord) -> Result<(), StoreError> {
        let mut alert = record.alert.clone();
        alert.last_notified_at = Some(timestamp(self.clock.now()));
        self.write(record.row, &alert).await
    }

    async fn write(&self, row: usize, alert: &SearchAlert) -> Result<(), StoreError> {
        self.store
            .update_row(&self.container_id, &self.sheet, row, &schema::alert_row(alert))
            .await
    }
}
