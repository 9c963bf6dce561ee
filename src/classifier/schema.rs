//! Response shape expected from the classification service, and the
//! coercions that turn each raw announcement into a [`Listing`].

use serde::Deserialize;

use crate::alerts::price::normalize_price;
use crate::models::{lenient, Currency, Intent, Listing};
use crate::text::normalize_text;

pub const MAX_COMMUNE_OPTIONS: usize = 4;

const REQUEST_MARKERS: &[&str] = &["busco", "buscamos", "necesito", "necesitamos", "requiero", "se busca", "se necesita"];

const NUMBER_WORDS: &[(&str, &str)] = &[
    ("un", "1"),
    ("uno", "1"),
    ("una", "1"),
    ("dos", "2"),
    ("tres", "3"),
    ("cuatro", "4"),
    ("cinco", "5"),
    ("seis", "6"),
    ("siete", "7"),
    ("ocho", "8"),
    ("nueve", "9"),
    ("diez", "10"),
];

/// Top-level object returned by the model. `anuncios` is mandatory; other
/// keys such as `is_multiple` are ignored.
#[derive(Debug, Deserialize)]
pub struct ClassificationResponse {
    pub anuncios: Vec<RawAnnouncement>,
}

/// One announcement as the model writes it
#[derive(Debug, Default, Deserialize)]
pub struct RawAnnouncement {
    #[serde(default, deserialize_with = "lenient::string")]
    pub busco_ofrezco: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub tipo_operacion: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub propiedad: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub ciudad: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub opcion_comuna: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub opcion_comuna_2: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub opcion_comuna_3: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub opcion_comuna_4: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub dormitorios: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub banos: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub estacionamiento: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub bodegas: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub valor: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub moneda: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub gastos_comunes: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub metros_cuadrados: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub telefono: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub correo_electronico: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub texto_original_fragmento_anuncio: Option<String>,
}

impl RawAnnouncement {
    /// Coerce into a listing. `message` is the full text, used when the
    /// model didn't return the announcement's own fragment.
    pub fn into_listing(self, message: &str) -> Listing {
        let source_text = self
            .texto_original_fragmento_anuncio
            .clone()
            .unwrap_or_else(|| message.trim().to_string());

        let price = self.valor.as_deref().and_then(coerce_amount);
        let currency = self
            .moneda
            .as_deref()
            .and_then(Currency::parse)
            .or_else(|| price.as_ref().and_then(|_| infer_currency(&source_text)));

        let commune_options: Vec<String> = [
            self.opcion_comuna,
            self.opcion_comuna_2,
            self.opcion_comuna_3,
            self.opcion_comuna_4,
        ]
        .into_iter()
        .flatten()
        .take(MAX_COMMUNE_OPTIONS)
        .collect();

        let mut listing = Listing::new(Intent::Info, source_text);
        listing.operation_type = self.tipo_operacion;
        listing.property_category = self.propiedad;
        listing.region = self.region;
        listing.city = self.ciudad;
        listing.commune_options = commune_options;
        listing.bedrooms = self.dormitorios.as_deref().and_then(coerce_count);
        listing.bathrooms = self.banos.as_deref().and_then(coerce_count);
        listing.parking = self.estacionamiento.as_deref().and_then(coerce_count);
        listing.storage = self.bodegas.as_deref().and_then(coerce_count);
        listing.price = price;
        listing.currency = currency;
        listing.common_expenses = self.gastos_comunes.as_deref().and_then(coerce_amount);
        listing.area_m2 = self.metros_cuadrados.as_deref().and_then(first_integer);
        listing.contact_phone = self.telefono.as_deref().and_then(coerce_phone);
        listing.contact_email = self.correo_electronico;

        listing.intent = self
            .busco_ofrezco
            .as_deref()
            .and_then(Intent::from_label)
            .unwrap_or_else(|| infer_intent(&listing));
        listing
    }
}

/// Request language wins; otherwise anything with characteristics or a price is an offer.
pub fn infer_intent(listing: &Listing) -> Intent {
    let text = normalize_text(&listing.source_text);
    if REQUEST_MARKERS.iter().any(|marker| text.contains(marker)) {
        return Intent::Request;
    }

    let describes_property = listing.price.is_some()
        || listing.bedrooms.is_some()
        || listing.bathrooms.is_some()
        || listing.area_m2.is_some()
        || listing.property_category.is_some();
    if describes_property {
        Intent::Offer
    } else {
        Intent::Info
    }
}

fn infer_currency(text: &str) -> Option<Currency> {
    let text = normalize_text(text);
    let words = || text.split(|c: char| !c.is_alphanumeric());
    if words().any(|w| w == "uf") {
        Some(Currency::Uf)
    } else if text.contains('$') || words().any(|w| w == "clp" || w.starts_with("peso")) {
        Some(Currency::Clp)
    } else {
        None
    }
}

fn first_integer(raw: &str) -> Option<String> {
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Room/parking counts: digits, number words, or a bare mention meaning one.
fn coerce_count(raw: &str) -> Option<String> {
    if let Some(digits) = first_integer(raw) {
        return Some(digits);
    }

    let text = normalize_text(raw);
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        if let Some((_, digit)) = NUMBER_WORDS.iter().find(|(name, _)| *name == word) {
            return Some((*digit).to_string());
        }
    }

    match text.as_str() {
        "si" | "yes" | "incluye" | "incluido" | "con" => Some("1".to_string()),
        _ => None,
    }
}

/// Money amounts as digit-only strings, honouring "mil" and "millones".
fn coerce_amount(raw: &str) -> Option<String> {
    let text = normalize_text(raw);
    let multiplier = if text.contains("millon") {
        1_000_000.0
    } else if text.split(|c: char| !c.is_alphanumeric()).any(|w| w == "mil" || w == "k") {
        1_000.0
    } else {
        1.0
    };

    let value = if multiplier > 1.0 {
        // "1,5 millones" uses the separator as a decimal point
        let kept: String = text
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
            .collect();
        kept.replace(',', ".").parse::<f64>().ok()?
    } else {
        normalize_price(Some(&text))?
    };

    let amount = (value * multiplier).round();
    if amount < 1.0 {
        return None;
    }
    Some(format!("{}", amount as u64))
}

/// Keep digits (and a leading `+`); Chilean 8-digit mobiles get their leading 9.
fn coerce_phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < 6 {
        return None;
    }
    if trimmed.starts_with('+') {
        Some(format!("+{}", digits))
    } else if digits.len() == 8 {
        Some(format!("9{}", digits))
    } else {
        Some(digits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_accept_words_and_bare_mentions() {
        assert_eq!(coerce_count("dos").as_deref(), Some("2"));
        assert_eq!(coerce_count("3 dormitorios").as_deref(), Some("3"));
        assert_eq!(coerce_count("Sí").as_deref(), Some("1"));
        assert_eq!(coerce_count("varios"), None);
    }

    #[test]
    fn amounts_become_digit_strings() {
        assert_eq!(coerce_amount("$550.000 conversable").as_deref(), Some("550000"));
        assert_eq!(coerce_amount("20 millones").as_deref(), Some("20000000"));
        assert_eq!(coerce_amount("1,5 millones").as_deref(), Some("1500000"));
        assert_eq!(coerce_amount("120 mil pesos").as_deref(), Some("120000"));
        assert_eq!(coerce_amount("a convenir"), None);
    }

    #[test]
    fn phones_are_normalized() {
        assert_eq!(coerce_phone("8765 4321").as_deref(), Some("987654321"));
        assert_eq!(coerce_phone("+56 9 1234 5678").as_deref(), Some("+56912345678"));
        assert_eq!(coerce_phone("123"), None);
    }

    #[test]
    fn missing_intent_defaults_to_offer_when_describing_a_property() {
        let raw = RawAnnouncement {
            propiedad: Some("Departamento".into()),
            valor: Some("550000".into()),
            texto_original_fragmento_anuncio: Some("Depto 2D1B $550.000".into()),
            ..Default::default()
        };
        let listing = raw.into_listing("Depto 2D1B $550.000");
        assert_eq!(listing.intent, Intent::Offer);
        assert_eq!(listing.currency, Some(Currency::Clp));
    }

    #[test]
    fn request_language_wins_over_characteristics() {
        let raw = RawAnnouncement {
            dormitorios: Some("2".into()),
            ..Default::default()
        };
        let listing = raw.into_listing("Necesito depto 2 dormitorios en Macul");
        assert_eq!(listing.intent, Intent::Request);
    }

    #[test]
    fn commune_options_are_capped() {
        let raw = RawAnnouncement {
            opcion_comuna: Some("Ñuñoa".into()),
            opcion_comuna_3: Some("Providencia".into()),
            ..Default::default()
        };
        let listing = raw.into_listing("x");
        assert_eq!(listing.commune_options, vec!["Ñuñoa", "Providencia"]);
    }
}
