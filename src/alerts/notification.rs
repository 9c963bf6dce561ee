use std::fmt::Write;

use crate::alerts::MatchedCriterion;
use crate::models::{Listing, Publisher};
use crate::text::{display_phone, truncate_chars};

const DESCRIPTION_PREVIEW_CHARS: usize = 200;

/// WhatsApp text telling an alert owner about a matching offer
pub fn compose_notification(offer: &Listing, publisher: Option<&Publisher>, matched: &[MatchedCriterion]) -> String {
    let category = offer.property_category.as_deref().unwrap_or("propiedad");
    let commune = offer.commune().unwrap_or("ubicación no especificada");

    let mut msg = String::new();
    let _ = writeln!(msg, "🔔 *¡Nueva propiedad para tu alerta!*\n");
    let _ = writeln!(msg, "Se publicó un(a) {} en {} que coincide con tu búsqueda. 🏡\n", category, commune);

    let _ = writeln!(msg, "*Detalles:*");
    if let Some(operation) = &offer.operation_type {
        let _ = writeln!(msg, "• Operación: {}", operation);
    }
    let location = match &offer.region {
        Some(region) => format!("{}, {}", commune, region),
        None => commune.to_string(),
    };
    let _ = writeln!(msg, "• Ubicación: {} 📍", location);
    if let Some(bedrooms) = &offer.bedrooms {
        let _ = writeln!(msg, "• Dormitorios: {} 🛏️", bedrooms);
    }
    if let Some(bathrooms) = &offer.bathrooms {
        let _ = writeln!(msg, "• Baños: {} 🚿", bathrooms);
    }
    if let Some(price) = &offer.price {
        let currency = offer.currency.map(|c| c.as_str()).unwrap_or("");
        let _ = writeln!(msg, "• Valor: {} {} 💰", price, currency);
    }
    if let Some(area) = &offer.area_m2 {
        let _ = writeln!(msg, "• Superficie: {} m² 📐", area);
    }
    if !offer.source_text.trim().is_empty() {
        let _ = writeln!(
            msg,
            "• Aviso: {}",
            truncate_chars(offer.source_text.trim(), DESCRIPTION_PREVIEW_CHARS)
        );
    }

    if !matched.is_empty() {
        let labels: Vec<&str> = matched.iter().map(|m| m.label()).collect();
        let _ = writeln!(msg, "\n*Coincide en:* {} ✅", labels.join(", "));
    }

    let mut contact = Vec::new();
    if let Some(name) = publisher.and_then(|p| p.name.as_deref()) {
        contact.push(format!("• Nombre: {} 👤", name));
    }
    if let Some(phone) = &offer.contact_phone {
        contact.push(format!("• Teléfono: {} 📱", display_phone(phone)));
    }
    if let Some(sender_phone) = publisher.and_then(|p| p.phone.as_deref()) {
        let shown = display_phone(sender_phone);
        if offer.contact_phone.as_deref().map(display_phone).as_deref() != Some(shown.as_str()) {
            contact.push(format!("• WhatsApp: {} 💬", shown));
        }
    }
    if let Some(email) = &offer.contact_email {
        contact.push(format!("• Email: {} 📧", email));
    }
    if !contact.is_empty() {
        let _ = writeln!(msg, "\n*Contacto:*");
        for line in contact {
            let _ = writeln!(msg, "{}", line);
        }
    }

    let _ = write!(msg, "\nPara ver tus alertas activas escribe *!misalertas* 📑");
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Currency, Intent};

    #[test]
    fn notification_names_matches_and_contacts() {
        let mut offer = Listing::new(Intent::Offer, "Arriendo depto en Ñuñoa");
        offer.property_category = Some("Departamento".into());
        offer.commune_options = vec!["Ñuñoa".into()];
        offer.price = Some("550000".into());
        offer.currency = Some(Currency::Clp);
        offer.contact_phone = Some("987654321".into());
        let publisher = Publisher::from_sender("56911112222@c.us", Some("Corredora Sur"));

        let text = compose_notification(
            &offer,
            Some(&publisher),
            &[MatchedCriterion::Commune, MatchedCriterion::Price],
        );
        assert!(text.contains("Departamento en Ñuñoa"));
        assert!(text.contains("Coincide en:* comuna, precio"));
        assert!(text.contains("+987654321"));
        assert!(text.contains("+56911112222"));
        assert!(text.contains("Corredora Sur"));
        assert!(text.contains("550000 CLP"));
    }

    #[test]
    fn same_phone_is_listed_once() {
        let mut offer = Listing::new(Intent::Offer, "");
        offer.contact_phone = Some("56911112222".into());
        let publisher = Publisher::from_sender("56911112222@c.us", None);
        let text = compose_notification(&offer, Some(&publisher), &[]);
        assert_eq!(text.matches("+56911112222").count(), 1);
        assert!(text.contains("ubicación no especificada"));
    }
}
