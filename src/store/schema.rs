//! Column layouts of the listings and alerts sheets.
//!
//! Writers and readers share these indices; changing the order breaks
//! every sheet already in use.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::models::{AlertStatus, Currency, Intent, Listing, OtherCriteria, Publisher, SearchAlert};

pub const LISTING_HEADERS: [&str; 25] = [
    "busco_ofrezco",
    "tipo_operacion",
    "propiedad",
    "region",
    "ciudad",
    "opcion_comuna",
    "opcion_comuna_2",
    "opcion_comuna_3",
    "opcion_comuna_4",
    "dormitorios",
    "banos",
    "estacionamiento",
    "bodegas",
    "valor",
    "moneda",
    "gastos_comunes",
    "metros_cuadrados",
    "telefono",
    "correo_electronico",
    "telefono_remitente",
    "nombre_remitente",
    "fecha_publicacion",
    "hora_publicacion",
    "uid_remitente",
    "status",
];

pub const LISTINGS_COLUMNS: &str = "A:Y";

pub mod listing_col {
    pub const INTENT: usize = 0;
    pub const OPERATION: usize = 1;
    pub const CATEGORY: usize = 2;
    pub const REGION: usize = 3;
    pub const CITY: usize = 4;
    pub const COMMUNE: usize = 5;
    pub const BEDROOMS: usize = 9;
    pub const BATHROOMS: usize = 10;
    pub const PARKING: usize = 11;
    pub const STORAGE: usize = 12;
    pub const PRICE: usize = 13;
    pub const CURRENCY: usize = 14;
    pub const COMMON_EXPENSES: usize = 15;
    pub const AREA: usize = 16;
    pub const PHONE: usize = 17;
    pub const EMAIL: usize = 18;
    pub const SENDER_PHONE: usize = 19;
    pub const SENDER_NAME: usize = 20;
    pub const DATE: usize = 21;
    pub const TIME: usize = 22;
    pub const SENDER_UID: usize = 23;
    pub const STATUS: usize = 24;
}

pub const LISTING_STATUS_ACTIVE: &str = "Activo";

pub const ALERT_HEADERS: [&str; 11] = [
    "IDAlerta",
    "SenderID",
    "TimestampCreacion",
    "TipoPropiedadBuscada",
    "RegionBuscada",
    "ComunaBuscada",
    "DormitoriosBuscados",
    "BanosBuscados",
    "OtrosCriterios",
    "EstadoAlerta",
    "UltimaNotificacionEnviada",
];

pub const ALERTS_COLUMNS: &str = "A:K";

pub mod alert_col {
    pub const ID: usize = 0;
    pub const SENDER: usize = 1;
    pub const CREATED_AT: usize = 2;
    pub const CATEGORY: usize = 3;
    pub const REGION: usize = 4;
    pub const COMMUNE: usize = 5;
    pub const BEDROOMS: usize = 6;
    pub const BATHROOMS: usize = 7;
    pub const OTHER: usize = 8;
    pub const STATUS: usize = 9;
    pub const LAST_NOTIFIED: usize = 10;
}

/// A1 range covering whole columns of a sheet
pub fn range(sheet: &str, columns: &str) -> String {
    format!("'{}'!{}", sheet.replace('\'', "''"), columns)
}

fn cell(row: &[String], idx: usize) -> Option<String> {
    row.get(idx)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Local zone for the date and time columns of listing rows
pub const SHEET_TIMEZONE: Tz = chrono_tz::America::Santiago;

/// Serialize a listing in sheet column order
pub fn listing_row(listing: &Listing, publisher: &Publisher, at: DateTime<Utc>) -> Vec<String> {
    let local = at.with_timezone(&SHEET_TIMEZONE);
    let commune = |i: usize| listing.commune_options.get(i).cloned().unwrap_or_default();

    vec![
        listing.intent.sheet_label().to_string(),
        text(&listing.operation_type),
        text(&listing.property_category),
        text(&listing.region),
        text(&listing.city),
        commune(0),
        commune(1),
        commune(2),
        commune(3),
        text(&listing.bedrooms),
        text(&listing.bathrooms),
        text(&listing.parking),
        text(&listing.storage),
        text(&listing.price),
        listing.currency.map(|c| c.as_str().to_string()).unwrap_or_default(),
        text(&listing.common_expenses),
        text(&listing.area_m2),
        text(&listing.contact_phone),
        text(&listing.contact_email),
        text(&publisher.phone),
        text(&publisher.name),
        local.format("%d-%m-%Y").to_string(),
        local.format("%H:%M:%S").to_string(),
        publisher.uid.clone(),
        LISTING_STATUS_ACTIVE.to_string(),
    ]
}

/// A listing row read back from the sheet
#[derive(Debug, Clone, PartialEq)]
pub struct StoredListing {
    pub listing: Listing,
    pub publisher: Publisher,
    pub published_on: Option<String>,
    pub status: Option<String>,
}

/// Parse a listings row. Header rows and rows without a known intent yield `None`.
pub fn listing_from_row(row: &[String]) -> Option<StoredListing> {
    use listing_col::*;

    let label = cell(row, INTENT)?;
    if label == LISTING_HEADERS[INTENT] {
        return None;
    }
    let intent = Intent::from_label(&label)?;
    let mut listing = Listing::new(intent, String::new());
    listing.operation_type = cell(row, OPERATION);
    listing.property_category = cell(row, CATEGORY);
    listing.region = cell(row, REGION);
    listing.city = cell(row, CITY);
    listing.commune_options = (COMMUNE..COMMUNE + 4).filter_map(|i| cell(row, i)).collect();
    listing.bedrooms = cell(row, BEDROOMS);
    listing.bathrooms = cell(row, BATHROOMS);
    listing.parking = cell(row, PARKING);
    listing.storage = cell(row, STORAGE);
    listing.price = cell(row, PRICE);
    listing.currency = cell(row, CURRENCY).as_deref().and_then(Currency::parse);
    listing.common_expenses = cell(row, COMMON_EXPENSES);
    listing.area_m2 = cell(row, AREA);
    listing.contact_phone = cell(row, PHONE);
    listing.contact_email = cell(row, EMAIL);

    let publisher = Publisher {
        phone: cell(row, SENDER_PHONE),
        name: cell(row, SENDER_NAME),
        uid: cell(row, SENDER_UID).unwrap_or_default(),
    };

    let published_on = match (cell(row, DATE), cell(row, TIME)) {
        (Some(date), Some(time)) => Some(format!("{} {}", date, time)),
        (date, _) => date,
    };

    Some(StoredListing {
        listing,
        publisher,
        published_on,
        status: cell(row, STATUS),
    })
}

/// Serialize an alert in sheet column order
pub fn alert_row(alert: &SearchAlert) -> Vec<String> {
    let other = serde_json::to_string(&alert.other).unwrap_or_else(|_| "{}".to_string());
    vec![
        alert.alert_id.clone(),
        alert.sender_id.clone(),
        alert.created_at.clone(),
        text(&alert.property_category),
        text(&alert.region),
        text(&alert.commune),
        text(&alert.bedrooms_min),
        text(&alert.bathrooms_min),
        other,
        alert.status.sheet_label().to_string(),
        text(&alert.last_notified_at),
    ]
}

/// Parse an alerts row. Rows missing an id or sender (including the header) yield `None`.
pub fn alert_from_row(row: &[String]) -> Option<SearchAlert> {
    use alert_col::*;

    let alert_id = cell(row, ID)?;
    if alert_id == ALERT_HEADERS[ID] {
        return None;
    }

    let other = cell(row, OTHER)
        .and_then(|json| serde_json::from_str::<OtherCriteria>(&json).ok())
        .unwrap_or_default();

    Some(SearchAlert {
        alert_id,
        sender_id: cell(row, SENDER)?,
        created_at: cell(row, CREATED_AT).unwrap_or_default(),
        property_category: cell(row, CATEGORY),
        region: cell(row, REGION),
        commune: cell(row, COMMUNE),
        bedrooms_min: cell(row, BEDROOMS),
        bathrooms_min: cell(row, BATHROOMS),
        other,
        status: cell(row, STATUS)
            .map(|s| AlertStatus::from_label(&s))
            .unwrap_or(AlertStatus::Removed),
        last_notified_at: cell(row, LAST_NOTIFIED),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn listing_row_follows_the_column_layout() {
        let mut listing = Listing::new(Intent::Offer, "texto");
        listing.operation_type = Some("Arriendo".into());
        listing.commune_options = vec!["Ñuñoa".into(), "Providencia".into()];
        listing.price = Some("550000".into());
        listing.currency = Some(Currency::Clp);
        let publisher = Publisher::from_sender("56911112222@c.us", Some("Ana"));
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap();

        let row = listing_row(&listing, &publisher, at);
        assert_eq!(row.len(), LISTING_HEADERS.len());
        assert_eq!(row[listing_col::INTENT], "Ofrezco");
        assert_eq!(row[listing_col::COMMUNE + 1], "Providencia");
        assert_eq!(row[listing_col::CURRENCY], "CLP");
        assert_eq!(row[listing_col::SENDER_PHONE], "56911112222");
        assert_eq!(row[listing_col::DATE], "05-03-2024");
        assert_eq!(row[listing_col::TIME], "11:07:09");
        assert_eq!(row[listing_col::STATUS], "Activo");

        let stored = listing_from_row(&row).unwrap();
        assert_eq!(stored.listing.commune_options, listing.commune_options);
        assert_eq!(stored.publisher.name.as_deref(), Some("Ana"));
    }

    #[test]
    fn row_date_and_time_are_santiago_local() {
        let listing = Listing::new(Intent::Offer, "texto");
        let publisher = Publisher::from_sender("56911112222@c.us", None);

        let summer_night = Utc.with_ymd_and_hms(2024, 3, 6, 1, 30, 0).unwrap();
        let row = listing_row(&listing, &publisher, summer_night);
        assert_eq!(row[listing_col::DATE], "05-03-2024");
        assert_eq!(row[listing_col::TIME], "22:30:00");

        let winter_noon = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
        let row = listing_row(&listing, &publisher, winter_noon);
        assert_eq!(row[listing_col::DATE], "01-07-2024");
        assert_eq!(row[listing_col::TIME], "08:00:00");
    }

    #[test]
    fn header_rows_are_skipped() {
        assert_eq!(listing_from_row(&strings(&LISTING_HEADERS)), None);
        assert_eq!(alert_from_row(&strings(&ALERT_HEADERS)), None);
    }

    #[test]
    fn alert_rows_use_writer_indices() {
        let row = strings(&[
            "ALERTA-1",
            "56911112222@c.us",
            "2024-03-05T14:07:09Z",
            "Departamento",
            "",
            "Ñuñoa",
            "2",
            "",
            r#"{"precioMax":"600000","moneda":"CLP"}"#,
            "activa",
        ]);
        let alert = alert_from_row(&row).unwrap();
        assert_eq!(alert.commune.as_deref(), Some("Ñuñoa"));
        assert_eq!(alert.bedrooms_min.as_deref(), Some("2"));
        assert_eq!(alert.region, None);
        assert_eq!(alert.budget(), Some("600000"));
        assert_eq!(alert.status, AlertStatus::Active);
        assert_eq!(alert.last_notified_at, None);
        assert_eq!(alert_row(&alert).len(), ALERT_HEADERS.len());
    }

    #[test]
    fn quotes_in_sheet_names_are_escaped() {
        assert_eq!(range("konecte", LISTINGS_COLUMNS), "'konecte'!A:Y");
        assert_eq!(range("Bob's", ALERTS_COLUMNS), "'Bob''s'!A:K");
    }
}
