//! User-facing texts. The bot speaks Spanish.

use std::fmt::Write;

use crate::conversation::state::PublicationDraft;
use crate::models::SearchCriteria;
use crate::store::{AlertRecord, StoredListing};
use crate::text::display_phone;

pub const MAX_RESULTS_SHOWN: usize = 5;

pub const ACCESS_DENIED: &str = "Acceso denegado. Tu plan actual no incluye acceso a la interacción por WhatsApp.";
pub const ACCESS_ERROR: &str = "No se pudo verificar tu acceso en este momento. Por favor, intenta más tarde.";

pub const GREETING: &str = "¡Hola! 👋 Soy tu asistente virtual de Konecte. ¿Qué te gustaría hacer?

1. 🔎 Buscar (Propiedades o Solicitudes)
2. 📋 Publicar (Propiedades o Solicitudes)";

pub const HELP: &str = "¡Hola! 👋 *Bot Inmobiliario de Konecte*

*Comandos:*
• *!ayuda* - Muestra este mensaje
• *!publicar* - Publica una propiedad o una solicitud paso a paso
• *!misalertas* - Lista tus alertas activas
• *!eliminaralerta [número]* - Elimina una alerta
• *!cancelar* - Cancela la operación en curso

*Búsquedas:*
• \"Busco [tipo] en [comuna]\" - Busca propiedades publicadas

Konecte - Conectando personas con propiedades";

pub const SEARCH_PROMPT: &str = "¡Genial! Para ayudarte a encontrar tu lugar ideal, descríbeme lo que buscas. Mientras más detalles, mejor. Puedes guiarte con este formato:

*Busco/Ofrezco:* Busco
*Tipo de operación:* Arriendo / Compra
*Tipo de propiedad:* Casa / Departamento / Oficina
*Región:* [Ej: Metropolitana]
*Comunas preferidas:* [Ej: Ñuñoa, Providencia]
*Dormitorios mínimos:* [N°]
*Baños mínimos:* [N°]
*Estacionamiento:* Sí / No / Indiferente
*Presupuesto máximo:* [Ej: 600.000]
*Moneda:* CLP / UF";

pub const PUBLICATION_TYPE_QUESTION: &str = "¡Perfecto! Vamos a publicar.

¿Qué deseas publicar?
1. 🏡 Una Propiedad
2. 📝 Una Solicitud";

pub const PUBLICATION_TYPE_REPROMPT: &str = "No entendí tu elección. Responde *1* para publicar una Propiedad o *2* para una Solicitud.";

pub const ASK_TITLE: &str = "📝 ¿Cuál es el *título* de tu publicación?";
pub const ASK_DESCRIPTION: &str = "✍️ Escribe una *descripción* de la propiedad.";
pub const ASK_TRANSACTION: &str = "💼 ¿Es *Venta* o *Arriendo*?";
pub const ASK_CATEGORY: &str = "🏠 ¿Qué *tipo de propiedad* es? (Casa, Departamento, Oficina, Local, Terreno...)";
pub const ASK_PRICE: &str = "💰 ¿Cuál es el *precio*? Indica la moneda si es en UF (Ej: 5000 UF o 550.000).";
pub const ASK_LOCATION: &str = "📍 ¿En qué *comuna* está la propiedad?";
pub const ASK_AREA: &str = "📐 ¿Cuántos *metros cuadrados* tiene?";
pub const ASK_ROOMS: &str = "🛏️ Indica *dormitorios, baños y estacionamientos* separados por coma (Ej: 2,1,1).";
pub const ASK_FEATURES: &str = "✨ ¿Qué *características* destacadas tiene? (Ej: Piscina, Terraza, Bodega)";
pub const ASK_REQUEST_DETAILS: &str = "📝 Cuéntame qué estás buscando: tipo de propiedad, operación, comuna, dormitorios y presupuesto.";

pub const INVALID_PRICE: &str = "⚠️ No pude leer el precio. Escribe solo el monto y la moneda si es UF (Ej: 5000 UF o 550.000).";
pub const INVALID_AREA: &str = "⚠️ No pude leer la superficie. Escribe solo el número de metros cuadrados (Ej: 80).";
pub const INVALID_ROOMS: &str = "⚠️ Necesito tres números: dormitorios, baños y estacionamientos (Ej: 2,1,1).";
pub const EMPTY_ANSWER: &str = "⚠️ No recibí tu respuesta. Inténtalo nuevamente.";
pub const CONFIRM_REPROMPT: &str = "Por favor responde *Sí* para publicar o *No* para cancelar.";

pub const PUBLISHED: &str = "✅ ¡Tu propiedad fue publicada con éxito! Gracias por confiar en Konecte.";
pub const PUBLISH_ERROR: &str = "❌ Ocurrió un error al publicar tu propiedad. Por favor, intenta nuevamente más tarde.";
pub const PUBLICATION_CANCELLED: &str = "👍 Publicación cancelada. Si necesitas algo más, escribe *hola*.";

pub const REQUEST_SAVED: &str = "✅ ¡Tu solicitud quedó registrada! Te avisaremos si aparece algo que coincida.";
pub const REQUEST_NOT_UNDERSTOOD: &str = "🤔 No pude identificar los detalles de tu solicitud. Escribe *!publicar* para intentarlo nuevamente con más detalle.";

pub const NOT_UNDERSTOOD: &str = "🤔 No logré entender tu mensaje. ¿Podrías ser más específico?";
pub const NO_CRITERIA: &str = "🤔 No pude identificar criterios de búsqueda claros en tu mensaje. ¿Podrías ser más específico?";
pub const SEARCH_ERROR: &str = "❌ Ocurrió un error al procesar tu búsqueda. Intenta nuevamente.";
pub const OFFER_REGISTERED: &str = "✅ ¡Gracias! Tu propiedad quedó registrada y avisaremos a quienes estén buscando algo similar. 🏡";

pub const PERMISSION_APOLOGY: &str = "🙏 Lo sentimos, no tengo permisos para guardar información en la planilla en este momento. Ya avisamos al equipo; intenta más tarde.";
pub const SAVE_ERROR: &str = "❌ Ocurrió un error al guardar tu solicitud. Intenta nuevamente.";

pub const ALERT_CREATED: &str = "✅ ¡Perfecto! Creé una alerta para tu búsqueda. Te notificaré cuando aparezcan propiedades que coincidan. 🔔";
pub const ALERT_CREATE_ERROR: &str = "❌ No pude crear la alerta en este momento. Intenta nuevamente más tarde.";
pub const ALERT_DECLINED: &str = "👍 Entendido. No crearé una alerta para esta búsqueda. Si necesitas algo más, aquí estoy.";

pub const NO_ALERTS: &str = "📭 No tienes alertas activas.";
pub const REMOVE_ALERT_USAGE: &str = "⚠️ Indica el número de la alerta. Ejemplo: *!eliminaralerta 1* (usa *!misalertas* para ver la lista).";
pub const NOTHING_TO_CANCEL: &str = "No hay ninguna operación en curso.";
pub const OPERATION_CANCELLED: &str = "👍 Operación cancelada.";
pub const COMMAND_ERROR: &str = "❌ Ocurrió un error al procesar tu comando.";

pub const FALLBACK: &str = "🤖 No entendí tu mensaje. Escribe *!ayuda* para ver opciones o intenta con una búsqueda como \"Busco departamento en Santiago\".";
pub const GENERIC_ERROR: &str = "❌ Ocurrió un error inesperado. Por favor, intenta nuevamente.";

/// Summary shown before publishing
pub fn confirmation(draft: &PublicationDraft) -> String {
    let show = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
    let number = |value: Option<u32>| value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
    let price = match (draft.price, draft.currency) {
        (Some(price), Some(currency)) => format!("{} {}", price, currency.as_str()),
        (Some(price), None) => price.to_string(),
        _ => "-".to_string(),
    };

    let mut msg = String::from("📋 *Resumen de tu publicación:*\n\n");
    let _ = writeln!(msg, "• Título: {}", show(&draft.title));
    let _ = writeln!(msg, "• Descripción: {}", show(&draft.description));
    let _ = writeln!(msg, "• Operación: {}", show(&draft.operation));
    let _ = writeln!(msg, "• Tipo: {}", show(&draft.category));
    let _ = writeln!(msg, "• Precio: {}", price);
    let _ = writeln!(msg, "• Comuna: {}", show(&draft.commune));
    let _ = writeln!(
        msg,
        "• Superficie: {} m²",
        draft.area_m2.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string())
    );
    let _ = writeln!(
        msg,
        "• Dormitorios / Baños / Estacionamientos: {} / {} / {}",
        number(draft.bedrooms),
        number(draft.bathrooms),
        number(draft.parking)
    );
    let _ = writeln!(msg, "• Características: {}", show(&draft.features));
    msg.push_str("\n¿Confirmas la publicación? (Responde *Sí* o *No*)");
    msg
}

/// Search results, capped at [`MAX_RESULTS_SHOWN`]
pub fn search_results(results: &[StoredListing]) -> String {
    let mut msg = format!(
        "🏠 *Encontré {} propiedades que coinciden con tu búsqueda:*\n\n",
        results.len()
    );

    for (idx, stored) in results.iter().take(MAX_RESULTS_SHOWN).enumerate() {
        let listing = &stored.listing;
        let _ = writeln!(msg, "*Propiedad {}:*", idx + 1);
        if let Some(category) = &listing.property_category {
            let _ = writeln!(msg, "• Tipo: {} 🏢", category);
        }
        if let Some(operation) = &listing.operation_type {
            let _ = writeln!(msg, "• Operación: {} 📋", operation);
        }
        if let Some(commune) = listing.commune() {
            let _ = writeln!(msg, "• Ubicación: {} 📍", commune);
        }
        if let Some(price) = &listing.price {
            let currency = listing.currency.map(|c| c.as_str()).unwrap_or("");
            let _ = writeln!(msg, "• Precio: {} {} 💰", price, currency);
        }
        if let Some(bedrooms) = &listing.bedrooms {
            let _ = writeln!(msg, "• Dormitorios: {} 🛏️", bedrooms);
        }
        if let Some(bathrooms) = &listing.bathrooms {
            let _ = writeln!(msg, "• Baños: {} 🚿", bathrooms);
        }
        if let Some(area) = &listing.area_m2 {
            let _ = writeln!(msg, "• Superficie: {} m² 📐", area);
        }
        let contact = listing
            .contact_phone
            .as_deref()
            .or(stored.publisher.phone.as_deref());
        if let Some(phone) = contact {
            let _ = writeln!(msg, "• Contacto: {} 📞", display_phone(phone));
        }
        msg.push('\n');
    }

    if results.len() > MAX_RESULTS_SHOWN {
        let _ = writeln!(msg, "*...y {} propiedades más.*", results.len() - MAX_RESULTS_SHOWN);
    }
    msg
}

/// No offers found: the search is recorded and an alert is offered
pub fn no_results(criteria: &SearchCriteria) -> String {
    let category = criteria.property_category.as_deref().unwrap_or("propiedad");
    let place = if criteria.communes.is_empty() {
        "ninguna comuna especificada".to_string()
    } else {
        criteria.communes.join(", ")
    };
    format!(
        "😔 *No encontré propiedades* del tipo \"{}\" en {}.\n\n\
         ✅ Tu búsqueda quedó registrada. 📝\n\n\
         ¿Quieres que cree una alerta para avisarte si aparece algo nuevo? 🔔 (Responde *Sí* o *No*)",
        category, place
    )
}

/// Numbered list of a sender's active alerts
pub fn alert_list(records: &[AlertRecord]) -> String {
    let mut msg = String::from("🔔 *Tus alertas activas:*\n\n");
    for (idx, record) in records.iter().enumerate() {
        let alert = &record.alert;
        let mut parts = Vec::new();
        if let Some(category) = &alert.property_category {
            parts.push(category.clone());
        }
        if let Some(commune) = &alert.commune {
            parts.push(format!("en {}", commune));
        } else if let Some(region) = &alert.region {
            parts.push(format!("en {}", region));
        }
        if let Some(bedrooms) = &alert.bedrooms_min {
            parts.push(format!("{}+ dorm.", bedrooms));
        }
        if let Some(budget) = alert.budget() {
            let currency = alert.other.currency.as_deref().unwrap_or("");
            parts.push(format!("hasta {} {}", budget, currency).trim_end().to_string());
        }
        let description = if parts.is_empty() {
            "cualquier propiedad".to_string()
        } else {
            parts.join(", ")
        };
        let _ = writeln!(msg, "{}. {}", idx + 1, description);
    }
    msg.push_str("\nPara eliminar una alerta escribe *!eliminaralerta [número]*.");
    msg
}

pub fn alert_removed(position: usize) -> String {
    format!("🗑️ La alerta {} fue eliminada.", position)
}

pub fn alert_not_found(position: usize) -> String {
    format!("⚠️ No tienes una alerta número {}. Usa *!misalertas* para ver la lista.", position)
}
