//! Serde helpers for loosely-typed JSON coming from the LLM or from sheet cells.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::text::normalize_text;

/// Values the model uses when it means "nothing"
const PLACEHOLDERS: &[&str] = &[
    "",
    "null",
    "none",
    "undefined",
    "n/d",
    "nd",
    "n/a",
    "-",
    "no especificado",
    "no especificada",
    "no aplica",
    "ninguno",
    "desconocido",
];

/// Turn a placeholder into `None`, otherwise return the trimmed text.
pub fn clean(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if PLACEHOLDERS.contains(&normalize_text(trimmed).as_str()) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Accept a string, number or boolean as an optional string.
///
/// `true` becomes "Sí" (a feature mentioned without a quantity).
pub fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => clean(&s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(true)) => Some("Sí".to_string()),
        _ => None,
    })
}
