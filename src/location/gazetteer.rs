use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::text::normalize_text;

/// Raw gazetteer file: regions with their communes
#[derive(Debug, Deserialize)]
struct GeoFile {
    regiones: Vec<RegionEntry>,
}

#[derive(Debug, Deserialize)]
struct RegionEntry {
    nombre: String,
    #[serde(default)]
    alias: Vec<String>,
    #[serde(default)]
    comunas: Vec<CommuneEntry>,
}

/// A commune is either a bare name or a name with aliases
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommuneEntry {
    Name(String),
    WithAliases {
        nombre: String,
        #[serde(default)]
        alias: Vec<String>,
    },
}

impl CommuneEntry {
    fn name(&self) -> &str {
        match self {
            CommuneEntry::Name(name) => name,
            CommuneEntry::WithAliases { nombre, .. } => nombre,
        }
    }

    fn aliases(&self) -> &[String] {
        match self {
            CommuneEntry::Name(_) => &[],
            CommuneEntry::WithAliases { alias, .. } => alias,
        }
    }
}

/// A canonical commune and the region it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct CommuneRecord {
    pub name: String,
    pub region: String,
    /// Normalized form of `name`, used for fuzzy scoring
    pub key: String,
}

/// Indexed gazetteer of Chilean communes
#[derive(Debug, Default)]
pub struct Gazetteer {
    communes: Vec<CommuneRecord>,
    by_name: HashMap<String, usize>,
    by_alias: HashMap<String, usize>,
    /// Normalized region names and aliases to the canonical region name
    regions: HashMap<String, String>,
}

impl Gazetteer {
    /// Build the index from gazetteer JSON
    pub fn parse(json: &str) -> Result<Self> {
        let file: GeoFile = serde_json::from_str(json).context("Invalid gazetteer JSON")?;
        if file.regiones.is_empty() {
            anyhow::bail!("Gazetteer has no regions");
        }

        let mut gazetteer = Gazetteer::default();
        for region in &file.regiones {
            let canonical = region.nombre.trim().to_string();
            for key in std::iter::once(&region.nombre).chain(&region.alias) {
                gazetteer
                    .regions
                    .entry(normalize_text(key))
                    .or_insert_with(|| canonical.clone());
            }

            for commune in &region.comunas {
                let key = normalize_text(commune.name());
                if key.is_empty() || gazetteer.by_name.contains_key(&key) {
                    continue;
                }

                let idx = gazetteer.communes.len();
                gazetteer.communes.push(CommuneRecord {
                    name: commune.name().trim().to_string(),
                    region: canonical.clone(),
                    key: key.clone(),
                });
                gazetteer.by_name.insert(key, idx);

                for alias in commune.aliases() {
                    gazetteer.by_alias.entry(normalize_text(alias)).or_insert(idx);
                }
            }
        }

        Ok(gazetteer)
    }

    /// Read and index a gazetteer file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read gazetteer {}", path.display()))?;
        Self::parse(&raw)
    }

    pub fn exact(&self, key: &str) -> Option<&CommuneRecord> {
        self.by_name.get(key).map(|&idx| &self.communes[idx])
    }

    pub fn alias(&self, key: &str) -> Option<&CommuneRecord> {
        self.by_alias.get(key).map(|&idx| &self.communes[idx])
    }

    /// Canonical region for a normalized region name or alias
    pub fn region(&self, key: &str) -> Option<&str> {
        self.regions.get(key).map(String::as_str)
    }

    pub fn communes(&self) -> &[CommuneRecord] {
        &self.communes
    }

    pub fn len(&self) -> usize {
        self.communes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "regiones": [
            {
                "nombre": "Metropolitana de Santiago",
                "comunas": [
                    { "nombre": "Santiago", "alias": ["Stgo"] },
                    "Ñuñoa"
                ]
            },
            { "nombre": "Valparaíso", "alias": ["V Region"], "comunas": ["Valparaíso"] }
        ]
    }"#;

    #[test]
    fn parses_bare_and_aliased_communes() {
        let gazetteer = Gazetteer::parse(SAMPLE).unwrap();
        assert_eq!(gazetteer.len(), 3);
        assert_eq!(gazetteer.exact("nunoa").unwrap().name, "Ñuñoa");
        assert_eq!(gazetteer.alias("stgo").unwrap().name, "Santiago");
        assert_eq!(gazetteer.exact("valparaiso").unwrap().region, "Valparaíso");
    }

    #[test]
    fn regions_resolve_by_name_and_alias() {
        let gazetteer = Gazetteer::parse(SAMPLE).unwrap();
        assert_eq!(gazetteer.region("v region"), Some("Valparaíso"));
        assert_eq!(gazetteer.region("metropolitana de santiago"), Some("Metropolitana de Santiago"));
        assert_eq!(gazetteer.region("narnia"), None);
    }

    #[test]
    fn rejects_files_without_regions() {
        assert!(Gazetteer::parse(r#"{"regiones": []}"#).is_err());
        assert!(Gazetteer::parse("not json").is_err());
    }
}
