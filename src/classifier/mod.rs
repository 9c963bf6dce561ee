pub mod prompt;
pub mod schema;

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info, warn};

use crate::clients::ClassificationService;
use crate::models::Listing;
use crate::text::truncate_chars;
use schema::ClassificationResponse;

/// Property-domain words that make an unclassified message worth keeping
const DOMAIN_PATTERN: &str =
    r"(?i)propiedad|casa|depto|departamento|arriendo|venta|compra|uf|m2|dormitorio|baño|bano|estacionamiento|bodega|terraza";

fn domain_keywords() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| match Regex::new(DOMAIN_PATTERN) {
            Ok(re) => Some(re),
            Err(e) => {
                error!("Domain keyword pattern does not compile, info rows are disabled: {}", e);
                None
            }
        })
        .as_ref()
}

/// Whether the text talks about real estate at all
pub fn mentions_property(text: &str) -> bool {
    domain_keywords().map(|re| re.is_match(text)).unwrap_or(false)
}

/// Turns free text into listings through an LLM
pub struct Classifier {
    service: Option<Arc<dyn ClassificationService>>,
}

impl Classifier {
    pub fn new(service: Arc<dyn ClassificationService>) -> Self {
        Self { service: Some(service) }
    }

    /// A classifier without a backing service; every call fails to classify
    pub fn disabled() -> Self {
        Self { service: None }
    }

    /// Classify a message.
    ///
    /// `None` means the message could not be classified (service failure or
    /// unusable output). `Some(vec![])` means it was classified and holds no ads.
    pub async fn classify(&self, text: &str) -> Option<Vec<Listing>> {
        let text = text.trim();
        if text.is_empty() {
            return Some(Vec::new());
        }

        let Some(service) = &self.service else {
            warn!("No classification service configured, skipping message");
            return None;
        };

        let raw = match service.complete_json(&prompt::build_prompt(text)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(service = service.service_name(), "Classification call failed: {:#}", e);
                return None;
            }
        };

        match parse_response(&raw, text) {
            Ok(listings) => {
                info!(count = listings.len(), "🧠 Classified message");
                Some(listings)
            }
            Err(e) => {
                warn!(response = %truncate_chars(&raw, 200), "Unusable classification output: {:#}", e);
                None
            }
        }
    }
}

/// Parse the model output, recovering the first balanced `{...}` block if needed
pub fn parse_response(raw: &str, message: &str) -> Result<Vec<Listing>> {
    let response: ClassificationResponse = match serde_json::from_str(strip_code_fences(raw)) {
        Ok(response) => response,
        Err(first_error) => {
            let block = extract_json_object(raw)
                .ok_or_else(|| anyhow!("no JSON object in response ({})", first_error))?;
            debug!("Recovered JSON block from malformed response");
            serde_json::from_str(block).context("Recovered JSON block does not match the schema")?
        }
    };

    Ok(response
        .anuncios
        .into_iter()
        .map(|announcement| announcement.into_listing(message))
        .collect())
}

fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open.strip_suffix("```").unwrap_or(without_open).trim()
}

/// First balanced `{...}` in the text, skipping braces inside JSON strings
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in raw[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
