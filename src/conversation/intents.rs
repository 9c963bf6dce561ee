//! Recognizing what an idle user is asking for.

use crate::text::normalize_text;

const GREETINGS: &[&str] = &[
    "hola",
    "buenas",
    "buenos dias",
    "buenas tardes",
    "buenas noches",
    "saludos",
    "hey",
    "hi",
    "hello",
    "ola",
];

const SEARCH_CHOICES: &[&str] = &["1", "buscar", "busco", "busqueda", "quiero buscar"];
const PUBLISH_CHOICES: &[&str] = &["2", "publicar", "ofrecer", "quiero publicar"];

const AFFIRMATIVE: &[&str] = &[
    "si", "s", "yes", "claro", "por supuesto", "dale", "ok", "okay", "confirmo", "confirmar", "bueno",
];
const NEGATIVE: &[&str] = &["no", "n", "nop", "nope", "negativo", "para nada", "no gracias"];
const CANCEL: &[&str] = &["cancelar", "cancela", "salir"];

/// Word stems, so plurals and conjugations count ("casas", "deptos", "arrendamos")
const LISTING_STEMS: &[&str] = &[
    "busc",
    "ofrezc",
    "ofrec",
    "vend",
    "arriend",
    "arrend",
    "departamento",
    "depto",
    "casa",
    "oficina",
    "propiedad",
    "parcela",
    "terreno",
    "local",
    "bodega",
];

/// Remove WhatsApp emphasis markers and surrounding whitespace, keeping case
pub fn strip_formatting(text: &str) -> String {
    text.trim()
        .trim_matches(|c: char| c == '*' || c == '_' || c == '~')
        .trim()
        .to_string()
}

/// Lower-cased, formatting-free text used for command and keyword checks
pub fn clean_input(text: &str) -> String {
    strip_formatting(text).to_lowercase()
}

fn normalized_words(text: &str) -> String {
    normalize_text(text)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// The text equals a token or starts with it followed by more words
fn leads_with(text: &str, tokens: &[&str]) -> bool {
    let words = normalized_words(text);
    tokens
        .iter()
        .any(|token| words == *token || words.starts_with(&format!("{} ", token)))
}

fn is_one_of(text: &str, tokens: &[&str]) -> bool {
    let words = normalized_words(text);
    tokens.iter().any(|token| words == *token)
}

pub fn is_greeting(text: &str) -> bool {
    leads_with(text, GREETINGS)
}

pub fn is_affirmative(text: &str) -> bool {
    leads_with(text, AFFIRMATIVE) && !is_negative(text)
}

pub fn is_negative(text: &str) -> bool {
    leads_with(text, NEGATIVE)
}

pub fn is_cancel(text: &str) -> bool {
    is_one_of(text, CANCEL)
}

pub fn is_command(text: &str) -> bool {
    text.trim_start().starts_with('!')
}

/// Free text that reads like a property search or offer
pub fn looks_like_listing(text: &str) -> bool {
    let words = normalized_words(text);
    words
        .split(' ')
        .any(|word| LISTING_STEMS.iter().any(|stem| word.starts_with(stem)))
}

/// What an idle (or alert-pending) message should trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleRoute {
    Greeting,
    SearchMenu,
    PublishMenu,
    AlertAnswer(bool),
    Search,
    Fallback,
}

/// Route a non-command message, first match wins:
/// greeting, menu choice, pending alert answer, listing-like text, fallback.
pub fn route_idle(text: &str, alert_pending: bool) -> IdleRoute {
    if is_greeting(text) {
        IdleRoute::Greeting
    } else if is_one_of(text, SEARCH_CHOICES) {
        IdleRoute::SearchMenu
    } else if is_one_of(text, PUBLISH_CHOICES) {
        IdleRoute::PublishMenu
    } else if alert_pending && is_affirmative(text) {
        IdleRoute::AlertAnswer(true)
    } else if alert_pending && is_negative(text) {
        IdleRoute::AlertAnswer(false)
    } else if looks_like_listing(text) {
        IdleRoute::Search
    } else {
        IdleRoute::Fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formatting_is_stripped() {
        assert_eq!(strip_formatting("  *Depto test*  "), "Depto test");
        assert_eq!(clean_input("_HOLA_"), "hola");
    }

    #[test]
    fn greetings_and_menu_choices() {
        assert_eq!(route_idle("hola", false), IdleRoute::Greeting);
        assert_eq!(route_idle("Buenos días!", false), IdleRoute::Greeting);
        assert_eq!(route_idle("1", false), IdleRoute::SearchMenu);
        assert_eq!(route_idle("Publicar", false), IdleRoute::PublishMenu);
        assert_eq!(route_idle("holanda", false), IdleRoute::Fallback);
    }

    #[test]
    fn yes_no_only_counts_when_an_alert_is_pending() {
        assert_eq!(route_idle("Sí", true), IdleRoute::AlertAnswer(true));
        assert_eq!(route_idle("si, por favor", true), IdleRoute::AlertAnswer(true));
        assert_eq!(route_idle("no gracias", true), IdleRoute::AlertAnswer(false));
        assert_eq!(route_idle("Sí", false), IdleRoute::Fallback);
    }

    #[test]
    fn listing_like_text_is_a_search() {
        assert_eq!(
            route_idle("Busco depto en Ñuñoa, 2 dormitorios", false),
            IdleRoute::Search
        );
        assert_eq!(route_idle("¿qué tal el clima?", false), IdleRoute::Fallback);
    }

    #[test]
    fn plurals_and_bare_search_word() {
        assert_eq!(route_idle("Necesito casas en Ñuñoa", false), IdleRoute::Search);
        assert_eq!(
            route_idle("deptos en Providencia hasta 600 mil", false),
            IdleRoute::Search
        );
        assert_eq!(route_idle("Arrendamos oficinas en Las Condes", false), IdleRoute::Search);
        assert_eq!(route_idle("busco", false), IdleRoute::SearchMenu);
    }

    #[test]
    fn cancel_tokens() {
        assert!(is_cancel("Cancelar"));
        assert!(!is_cancel("cancelar la visita de mañana"));
        assert!(is_command("!ayuda"));
    }
}
