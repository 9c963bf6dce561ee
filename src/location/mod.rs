pub mod gazetteer;

pub use gazetteer::{CommuneRecord, Gazetteer};

use std::path::Path;
use tracing::{debug, warn};

use crate::text::normalize_text;

/// Inputs this short never go through fuzzy matching
pub const FUZZY_MIN_LEN: usize = 2;
/// Inputs up to this length need the stricter threshold
pub const SHORT_NAME_LEN: usize = 4;
pub const SHORT_NAME_THRESHOLD: f64 = 0.85;
pub const DEFAULT_THRESHOLD: f64 = 0.75;

static BUILTIN_GAZETTEER: &str = include_str!("../../data/chile_geodata.json");

/// Result of normalizing a commune/region pair
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedLocation {
    pub commune: Option<String>,
    pub region: Option<String>,
    /// Whether the commune was found in the gazetteer
    pub resolved: bool,
}

/// Maps free-text communes to gazetteer entries
#[derive(Debug, Default)]
pub struct LocationNormalizer {
    gazetteer: Option<Gazetteer>,
}

impl LocationNormalizer {
    pub fn new(gazetteer: Gazetteer) -> Self {
        Self {
            gazetteer: Some(gazetteer),
        }
    }

    /// Normalizer over the gazetteer shipped with the crate
    pub fn builtin() -> Self {
        match Gazetteer::parse(BUILTIN_GAZETTEER) {
            Ok(gazetteer) => Self::new(gazetteer),
            Err(e) => {
                warn!("⚠️  Built-in gazetteer unusable, location normalization disabled: {:#}", e);
                Self::identity()
            }
        }
    }

    /// Load an external gazetteer, degrading to pass-through when it can't be read
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Gazetteer::load(path) {
            Ok(gazetteer) => {
                debug!(communes = gazetteer.len(), path = %path.display(), "Loaded gazetteer");
                Self::new(gazetteer)
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    "⚠️  Could not load gazetteer, location normalization disabled: {:#}", e
                );
                Self::identity()
            }
        }
    }

    /// A normalizer that returns its inputs unchanged
    pub fn identity() -> Self {
        Self { gazetteer: None }
    }

    /// Resolve a commune (and its authoritative region).
    ///
    /// Lookup order is exact name, alias, then fuzzy similarity. When nothing
    /// resolves both inputs are returned as given.
    pub fn normalize_location(&self, commune: Option<&str>, region: Option<&str>) -> NormalizedLocation {
        let commune = commune.map(str::trim).filter(|c| !c.is_empty());
        let region = region.map(str::trim).filter(|r| !r.is_empty());

        let passthrough = NormalizedLocation {
            commune: commune.map(str::to_string),
            region: region.map(str::to_string),
            resolved: false,
        };

        let (Some(gazetteer), Some(raw)) = (&self.gazetteer, commune) else {
            return passthrough;
        };

        match lookup(gazetteer, &normalize_text(raw)) {
            Some(record) => {
                if let Some(given) = region.filter(|r| !names_region(gazetteer, r, &record.region)) {
                    debug!(commune = raw, region = given, resolved_region = %record.region, "Supplied region conflicts, using the commune's");
                }
                NormalizedLocation {
                    commune: Some(record.name.clone()),
                    region: Some(record.region.clone()),
                    resolved: true,
                }
            }
            None => {
                debug!(commune = raw, "Commune not found in gazetteer");
                passthrough
            }
        }
    }
}

/// Whether a free-text region names `canonical`, by name or alias
fn names_region(gazetteer: &Gazetteer, given: &str, canonical: &str) -> bool {
    let key = normalize_text(given);
    gazetteer.region(&key).map_or(false, |name| name == canonical) || key == normalize_text(canonical)
}

fn lookup<'a>(gazetteer: &'a Gazetteer, key: &str) -> Option<&'a CommuneRecord> {
    gazetteer
        .exact(key)
        .or_else(|| gazetteer.alias(key))
        .or_else(|| fuzzy(gazetteer, key))
}

fn fuzzy<'a>(gazetteer: &'a Gazetteer, key: &str) -> Option<&'a CommuneRecord> {
    let len = key.chars().count();
    if len <= FUZZY_MIN_LEN {
        return None;
    }
    let threshold = if len <= SHORT_NAME_LEN {
        SHORT_NAME_THRESHOLD
    } else {
        DEFAULT_THRESHOLD
    };

    let (record, score) = gazetteer
        .communes()
        .iter()
        .map(|record| (record, strsim::sorensen_dice(key, &record.key)))
        .max_by(|a, b| a.1.total_cmp(&b.1))?;

    if score > threshold {
        debug!(input = key, commune = %record.name, score, "Fuzzy commune match");
        Some(record)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_resolves_to_commune_and_its_region() {
        let normalizer = LocationNormalizer::builtin();
        let location = normalizer.normalize_location(Some("Stgo Centro"), Some("Valparaíso"));
        assert_eq!(location.commune.as_deref(), Some("Santiago"));
        assert_eq!(location.region.as_deref(), Some("Metropolitana de Santiago"));
        assert!(location.resolved);
    }

    #[test]
    fn exact_match_ignores_accents_and_case() {
        let normalizer = LocationNormalizer::builtin();
        let location = normalizer.normalize_location(Some("nunoa"), None);
        assert_eq!(location.commune.as_deref(), Some("Ñuñoa"));
        assert_eq!(location.region.as_deref(), Some("Metropolitana de Santiago"));

        let location = normalizer.normalize_location(Some("VIÑA DEL MAR"), None);
        assert_eq!(location.commune.as_deref(), Some("Viña del Mar"));
        assert_eq!(location.region.as_deref(), Some("Valparaíso"));
    }

    #[test]
    fn typos_are_fixed_by_fuzzy_match() {
        let normalizer = LocationNormalizer::builtin();
        let location = normalizer.normalize_location(Some("Providenci"), None);
        assert_eq!(location.commune.as_deref(), Some("Providencia"));

        let location = normalizer.normalize_location(Some("las condez"), None);
        assert_eq!(location.commune.as_deref(), Some("Las Condes"));
    }

    #[test]
    fn unknown_and_short_inputs_pass_through() {
        let normalizer = LocationNormalizer::builtin();
        let location = normalizer.normalize_location(Some("Narnia"), Some("Fantasía"));
        assert_eq!(location.commune.as_deref(), Some("Narnia"));
        assert_eq!(location.region.as_deref(), Some("Fantasía"));
        assert!(!location.resolved);

        let location = normalizer.normalize_location(Some("xy"), None);
        assert_eq!(location.commune.as_deref(), Some("xy"));
        assert!(!location.resolved);

        assert_eq!(normalizer.normalize_location(None, None), NormalizedLocation::default());
    }

    #[test]
    fn region_aliases_name_their_region() {
        let gazetteer = Gazetteer::parse(BUILTIN_GAZETTEER).unwrap();
        assert!(names_region(&gazetteer, "bio bio", "Biobío"));
        assert!(names_region(&gazetteer, "RM", "Metropolitana de Santiago"));
        assert!(names_region(&gazetteer, "quinta región", "Valparaíso"));
        assert!(names_region(&gazetteer, "VALPARAISO", "Valparaíso"));
        assert!(!names_region(&gazetteer, "RM", "Valparaíso"));
    }

    #[test]
    fn unknown_commune_keeps_the_region_as_given() {
        let normalizer = LocationNormalizer::builtin();
        let location = normalizer.normalize_location(Some("Narnia"), Some("bio bio"));
        assert_eq!(location.region.as_deref(), Some("bio bio"));
        assert!(!location.resolved);
    }

    #[test]
    fn normalization_is_deterministic() {
        let normalizer = LocationNormalizer::builtin();
        let first = normalizer.normalize_location(Some("vitac"), Some("RM"));
        let second = normalizer.normalize_location(Some("vitac"), Some("RM"));
        assert_eq!(first, second);
        assert_eq!(first.commune.as_deref(), Some("Vitacura"));
    }

    #[test]
    fn missing_gazetteer_degrades_to_identity() {
        let normalizer = LocationNormalizer::from_path("/nonexistent/geodata.json");
        let location = normalizer.normalize_location(Some("Stgo"), Some("RM"));
        assert_eq!(location.commune.as_deref(), Some("Stgo"));
        assert_eq!(location.region.as_deref(), Some("RM"));
    }
}
