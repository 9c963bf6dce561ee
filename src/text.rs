//! Small text helpers shared by the matching code.

use unicode_normalization::UnicodeNormalization;

/// Lower-case, strip diacritics and trim.
///
/// "Ñuñoa" and "nunoa" both normalize to "nunoa".
pub fn normalize_text(text: &str) -> String {
    text.nfd()
        .filter(|c| !('\u{0300}'..='\u{036f}').contains(c))
        .collect::<String>()
        .to_lowercase()
        .trim()
        .to_string()
}

/// Parse a count out of a noisy string by keeping only its digits.
///
/// `"3 dormitorios"` gives 3, `"Sí"` gives `None`.
pub fn parse_count(raw: Option<&str>) -> Option<u32> {
    let digits: String = raw?.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Render a phone for display: bare digit strings of 6+ digits get a `+` prefix.
pub fn display_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let compact: String = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    if !compact.starts_with('+') && compact.len() >= 6 && compact.chars().all(|c| c.is_ascii_digit()) {
        format!("+{}", compact)
    } else {
        trimmed.to_string()
    }
}

/// Truncate to at most `max` characters, appending "..." when cut.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{}...", cut)
}
