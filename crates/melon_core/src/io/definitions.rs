use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::catalog::{Catalog, CatalogError};
use crate::phase::Phase;
use crate::upgrade::{Effect, Requirement};

const BUILTIN_DEFINITIONS: &str = include_str!("../../data/default_catalog.json");

/// Static building and upgrade definitions, as stored on disk.
#[derive(Clone, Debug, Deserialize)]
pub struct Definitions {
    #[serde(default)]
    pub buildings: Vec<BuildingDef>,
    #[serde(default)]
    pub upgrades: Vec<UpgradeDef>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BuildingDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub base_cost: f64,
    pub base_production: f64,
    pub unlock_phase: Phase,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpgradeDef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cost: f64,
    pub unlock_phase: Phase,
    pub effect: Effect,
    #[serde(default)]
    pub requirement: Option<Requirement>,
}

const fn default_multiplier() -> f64 {
    1.0
}

impl Definitions {
    /// Load a definitions JSON document from disk.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open catalog file {:?}", path))?;
        Self::from_reader(BufReader::new(file))
    }

    /// Deserialize definitions from an arbitrary reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).context("invalid catalog json")
    }

    /// The definitions compiled into the crate.
    pub fn builtin() -> Result<Self> {
        serde_json::from_str(BUILTIN_DEFINITIONS).context("invalid builtin catalog json")
    }

    /// Load from `path` when given, otherwise fall back to the builtin set.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::builtin(),
        }
    }

    pub fn build_catalog(&self) -> Result<Catalog, CatalogError> {
        Catalog::from_definitions(self)
    }
}

/// Validated catalog built from the builtin definitions.
pub fn builtin_catalog() -> Result<Catalog> {
    let defs = Definitions::builtin()?;
    defs.build_catalog().context("builtin catalog failed validation")
}

/// Load and validate a catalog, failing fast on configuration errors.
pub fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    let defs = Definitions::load(path)?;
    defs.build_catalog()
        .with_context(|| match path {
            Some(path) => format!("catalog {:?} failed validation", path),
            None => "builtin catalog failed validation".to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn builtin_covers_every_phase() {
        let catalog = builtin_catalog().expect("builtin catalog builds");
        for phase in Phase::ALL {
            assert!(
                catalog
                    .buildings()
                    .values()
                    .any(|building| building.unlock_phase == phase),
                "no building unlocks in {}",
                phase.name()
            );
        }
    }

    #[test]
    fn builtin_keeps_starter_entries() {
        let catalog = builtin_catalog().expect("builtin catalog builds");
        let patch = &catalog.buildings()["melonPatch"];
        assert_eq!(patch.base_cost, 10.0);
        assert_eq!(patch.base_production, 0.1);
        let press = &catalog.buildings()["melonPress"];
        assert_eq!(press.base_cost, 50.0);
        assert_eq!(press.base_production, 0.5);
        let seeds = &catalog.upgrades()["betterSeeds"];
        assert_eq!(seeds.cost, 50.0);
        assert_eq!(seeds.effect, Effect::MultiplyClickYield { factor: 2.0 });
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let json = r#"{"buildings":[{"id":"x","name":"X","base_production":1,"unlock_phase":1}]}"#;
        assert!(Definitions::from_reader(json.as_bytes()).is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let path = PathBuf::from("/nonexistent/catalog.json");
        let err = Definitions::load_from_path(&path).unwrap_err();
        assert!(format!("{err:#}").contains("nonexistent"));
    }

    #[test]
    fn repository_catalogs_validate() {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let path = manifest_dir.join("../../testdata/catalogs/compact.json");
        let catalog = load_catalog(Some(&path))
            .unwrap_or_else(|err| panic!("failed to load {:?}: {:#}", path, err));
        assert!(!catalog.buildings().is_empty());
    }
}
