pub mod lenient;

use serde::{Deserialize, Serialize};

use crate::text::normalize_text;

/// What a listing is about
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Intent {
    Offer,
    Request,
    Info,
}

impl Intent {
    /// Label used in the listings sheet
    pub fn sheet_label(&self) -> &'static str {
        match self {
            Intent::Offer => "Ofrezco",
            Intent::Request => "Busco",
            Intent::Info => "Información",
        }
    }

    /// Parse the labels the classifier and the sheet use ("Ofrezco", "busco", ...)
    pub fn from_label(raw: &str) -> Option<Self> {
        let label = normalize_text(raw);
        if label.starts_with("ofre") || label == "offer" {
            Some(Intent::Offer)
        } else if label.starts_with("busc") || label == "request" {
            Some(Intent::Request)
        } else if label.starts_with("info") {
            Some(Intent::Info)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Currency {
    #[serde(rename = "CLP")]
    Clp,
    #[serde(rename = "UF")]
    Uf,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Clp => "CLP",
            Currency::Uf => "UF",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match normalize_text(raw).as_str() {
            "uf" | "u.f." | "u.f" => Some(Currency::Uf),
            "clp" | "$" | "peso" | "pesos" => Some(Currency::Clp),
            _ => None,
        }
    }
}

/// A single property offer or request extracted from a message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub intent: Intent,
    pub operation_type: Option<String>,
    pub property_category: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    /// Up to four candidate communes, main one first
    pub commune_options: Vec<String>,
    pub bedrooms: Option<String>,
    pub bathrooms: Option<String>,
    pub parking: Option<String>,
    pub storage: Option<String>,
    /// Digits only
    pub price: Option<String>,
    pub currency: Option<Currency>,
    pub common_expenses: Option<String>,
    pub area_m2: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub source_text: String,
}

impl Listing {
    /// An empty listing with the given intent
    pub fn new(intent: Intent, source_text: impl Into<String>) -> Self {
        Self {
            intent,
            operation_type: None,
            property_category: None,
            region: None,
            city: None,
            commune_options: Vec::new(),
            bedrooms: None,
            bathrooms: None,
            parking: None,
            storage: None,
            price: None,
            currency: None,
            common_expenses: None,
            area_m2: None,
            contact_phone: None,
            contact_email: None,
            source_text: source_text.into(),
        }
    }

    pub fn commune(&self) -> Option<&str> {
        self.commune_options.first().map(String::as_str)
    }

    /// Replace the main commune, keeping the alternatives
    pub fn set_commune(&mut self, commune: Option<String>) {
        match (commune, self.commune_options.is_empty()) {
            (Some(c), true) => self.commune_options.push(c),
            (Some(c), false) => self.commune_options[0] = c,
            (None, false) => {
                self.commune_options.remove(0);
            }
            (None, true) => {}
        }
    }
}

/// Who posted a message
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Publisher {
    pub phone: Option<String>,
    pub name: Option<String>,
    pub uid: String,
}

impl Publisher {
    /// Derive the publisher from a transport sender id (`56912345678@c.us` or a web user id)
    pub fn from_sender(sender_id: &str, name: Option<&str>) -> Self {
        let phone = sender_id
            .split_once('@')
            .map(|(number, _)| number.trim_start_matches('+').to_string())
            .filter(|number| !number.is_empty());

        Self {
            phone,
            name: name.map(str::to_string).filter(|n| !n.trim().is_empty()),
            uid: sender_id.to_string(),
        }
    }
}

/// Criteria extracted from a search message
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    pub operation_type: Option<String>,
    pub property_category: Option<String>,
    pub region: Option<String>,
    pub communes: Vec<String>,
    pub bedrooms_min: Option<String>,
    pub bathrooms_min: Option<String>,
    pub parking: Option<String>,
    pub storage: Option<String>,
    pub budget_max: Option<String>,
    pub currency: Option<Currency>,
    pub area_min: Option<String>,
}

impl SearchCriteria {
    pub fn from_listing(listing: &Listing) -> Self {
        Self {
            operation_type: listing.operation_type.clone(),
            property_category: listing.property_category.clone(),
            region: listing.region.clone(),
            communes: listing.commune_options.clone(),
            bedrooms_min: listing.bedrooms.clone(),
            bathrooms_min: listing.bathrooms.clone(),
            parking: listing.parking.clone(),
            storage: listing.storage.clone(),
            budget_max: listing.price.clone(),
            currency: listing.currency,
            area_min: listing.area_m2.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &SearchCriteria::default()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AlertStatus {
    Active,
    Removed,
}

impl AlertStatus {
    pub fn sheet_label(&self) -> &'static str {
        match self {
            AlertStatus::Active => "activa",
            AlertStatus::Removed => "eliminada",
        }
    }

    /// Anything other than "activa" is treated as inactive
    pub fn from_label(raw: &str) -> Self {
        match normalize_text(raw).as_str() {
            "activa" | "active" => AlertStatus::Active,
            _ => AlertStatus::Removed,
        }
    }
}

/// Criteria kept in the alert's JSON column
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OtherCriteria {
    #[serde(rename = "precioMax", default, deserialize_with = "lenient::string")]
    pub budget_max: Option<String>,
    #[serde(rename = "moneda", default, deserialize_with = "lenient::string")]
    pub currency: Option<String>,
    #[serde(rename = "estacionamiento", default, deserialize_with = "lenient::string")]
    pub parking: Option<String>,
    #[serde(rename = "bodega", default, deserialize_with = "lenient::string")]
    pub storage: Option<String>,
    #[serde(rename = "metrosCuadradosMin", default, deserialize_with = "lenient::string")]
    pub area_min: Option<String>,
}

/// A standing search that gets notified about matching offers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchAlert {
    pub alert_id: String,
    pub sender_id: String,
    pub created_at: String,
    pub property_category: Option<String>,
    pub region: Option<String>,
    pub commune: Option<String>,
    pub bedrooms_min: Option<String>,
    pub bathrooms_min: Option<String>,
    pub other: OtherCriteria,
    pub status: AlertStatus,
    pub last_notified_at: Option<String>,
}

impl SearchAlert {
    pub fn budget(&self) -> Option<&str> {
        self.other.budget_max.as_deref()
    }
}

/// Payload sent to the listings-creation service when the wizard completes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingPayload {
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "operacion")]
    pub operation: String,
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "valor")]
    pub price: f64,
    #[serde(rename = "moneda")]
    pub currency: Currency,
    #[serde(rename = "comuna")]
    pub commune: String,
    #[serde(rename = "superficie")]
    pub area_m2: f64,
    #[serde(rename = "dormitorios")]
    pub bedrooms: u32,
    #[serde(rename = "banos")]
    pub bathrooms: u32,
    #[serde(rename = "estacionamientos")]
    pub parking: u32,
    #[serde(rename = "caracteristicas")]
    pub features: String,
    #[serde(rename = "descripcion")]
    pub description: String,
}

/// A message as delivered by the transport
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InboundMessage {
    pub sender_id: String,
    pub text: String,
    #[serde(default)]
    pub is_group_message: bool,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub sender_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_labels_round_trip_through_the_sheet() {
        assert_eq!(Intent::from_label("OFREZCO"), Some(Intent::Offer));
        assert_eq!(Intent::from_label("busco"), Some(Intent::Request));
        assert_eq!(Intent::from_label(Intent::Info.sheet_label()), Some(Intent::Info));
        assert_eq!(Intent::from_label("quizás"), None);
    }

    #[test]
    fn publisher_phone_comes_from_the_whatsapp_id() {
        let publisher = Publisher::from_sender("56912345678@c.us", Some("Ana"));
        assert_eq!(publisher.phone.as_deref(), Some("56912345678"));
        assert_eq!(publisher.name.as_deref(), Some("Ana"));

        let web = Publisher::from_sender("user-42", None);
        assert_eq!(web.phone, None);
        assert_eq!(web.uid, "user-42");
    }

    #[test]
    fn set_commune_replaces_only_the_main_option() {
        let mut listing = Listing::new(Intent::Offer, "x");
        listing.commune_options = vec!["stgo".into(), "Ñuñoa".into()];
        listing.set_commune(Some("Santiago".into()));
        assert_eq!(listing.commune_options, vec!["Santiago", "Ñuñoa"]);
    }

    #[test]
    fn other_criteria_accepts_numeric_budget() {
        let other: OtherCriteria =
            serde_json::from_str(r#"{"precioMax": 600000, "moneda": "CLP"}"#).unwrap();
        assert_eq!(other.budget_max.as_deref(), Some("600000"));
        assert_eq!(other.area_min, None);
    }
}
