use std::collections::BTreeMap;

use thiserror::Error;

use crate::building::Building;
use crate::io::definitions::{BuildingDef, Definitions, UpgradeDef};
use crate::upgrade::{Requirement, Upgrade};

/// Configuration error found while building a catalog from definitions.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("catalog defines no buildings")]
    NoBuildings,
    #[error("{kind} definition with an empty id")]
    EmptyId { kind: &'static str },
    #[error("{kind} {id} has an empty name")]
    EmptyName { kind: &'static str, id: String },
    #[error("duplicate {kind} id {id}")]
    DuplicateId { kind: &'static str, id: String },
    #[error("{kind} {id} has invalid {field} {value}")]
    InvalidNumber {
        kind: &'static str,
        id: String,
        field: &'static str,
        value: f64,
    },
    #[error("upgrade {upgrade} references unknown building {building}")]
    UnknownBuilding { upgrade: String, building: String },
    #[error("upgrade {upgrade} references unknown upgrade {target}")]
    UnknownUpgrade { upgrade: String, target: String },
    #[error("upgrade {0} requires itself")]
    SelfRequirement(String),
}

/// Validated building and upgrade templates, all counts zero and nothing purchased.
#[derive(Clone, Debug, PartialEq)]
pub struct Catalog {
    buildings: BTreeMap<String, Building>,
    upgrades: BTreeMap<String, Upgrade>,
}

impl Catalog {
    /// Validate definitions eagerly so bad data fails at startup.
    pub fn from_definitions(defs: &Definitions) -> Result<Self, CatalogError> {
        if defs.buildings.is_empty() {
            return Err(CatalogError::NoBuildings);
        }

        let mut buildings = BTreeMap::new();
        for def in &defs.buildings {
            let building = building_from_def(def)?;
            if buildings.contains_key(&building.id) {
                return Err(CatalogError::DuplicateId {
                    kind: "building",
                    id: building.id,
                });
            }
            buildings.insert(building.id.clone(), building);
        }

        let mut upgrades = BTreeMap::new();
        for def in &defs.upgrades {
            let upgrade = upgrade_from_def(def)?;
            if upgrades.contains_key(&upgrade.id) {
                return Err(CatalogError::DuplicateId {
                    kind: "upgrade",
                    id: upgrade.id,
                });
            }
            upgrades.insert(upgrade.id.clone(), upgrade);
        }

        for upgrade in upgrades.values() {
            check_references(upgrade, &buildings, &upgrades)?;
        }

        Ok(Self {
            buildings,
            upgrades,
        })
    }

    pub fn buildings(&self) -> &BTreeMap<String, Building> {
        &self.buildings
    }

    pub fn upgrades(&self) -> &BTreeMap<String, Upgrade> {
        &self.upgrades
    }
}

fn ensure_identity(kind: &'static str, id: &str, name: &str) -> Result<(), CatalogError> {
    if id.trim().is_empty() {
        return Err(CatalogError::EmptyId { kind });
    }
    if name.trim().is_empty() {
        return Err(CatalogError::EmptyName {
            kind,
            id: id.to_string(),
        });
    }
    Ok(())
}

fn ensure_positive(
    kind: &'static str,
    id: &str,
    field: &'static str,
    value: f64,
) -> Result<(), CatalogError> {
    if value.is_finite() && value > 0.0 {
        return Ok(());
    }
    Err(CatalogError::InvalidNumber {
        kind,
        id: id.to_string(),
        field,
        value,
    })
}

fn building_from_def(def: &BuildingDef) -> Result<Building, CatalogError> {
    ensure_identity("building", &def.id, &def.name)?;
    ensure_positive("building", &def.id, "base_cost", def.base_cost)?;
    ensure_positive("building", &def.id, "multiplier", def.multiplier)?;
    if !def.base_production.is_finite() || def.base_production < 0.0 {
        return Err(CatalogError::InvalidNumber {
            kind: "building",
            id: def.id.clone(),
            field: "base_production",
            value: def.base_production,
        });
    }
    Ok(Building {
        id: def.id.clone(),
        name: def.name.clone(),
        description: def.description.clone(),
        base_cost: def.base_cost,
        base_production: def.base_production,
        count: 0,
        unlock_phase: def.unlock_phase,
        multiplier: def.multiplier,
    })
}

fn upgrade_from_def(def: &UpgradeDef) -> Result<Upgrade, CatalogError> {
    ensure_identity("upgrade", &def.id, &def.name)?;
    ensure_positive("upgrade", &def.id, "cost", def.cost)?;
    ensure_positive("upgrade", &def.id, "effect", def.effect.magnitude())?;
    if let Some(requirement) = &def.requirement {
        let mut invalid = None;
        requirement.walk(&mut |node| {
            if let Requirement::TotalMoneyEarned { amount } = node {
                if !amount.is_finite() || *amount < 0.0 {
                    invalid = Some(*amount);
                }
            }
        });
        if let Some(value) = invalid {
            return Err(CatalogError::InvalidNumber {
                kind: "upgrade",
                id: def.id.clone(),
                field: "requirement",
                value,
            });
        }
    }
    Ok(Upgrade {
        id: def.id.clone(),
        name: def.name.clone(),
        description: def.description.clone(),
        cost: def.cost,
        purchased: false,
        unlock_phase: def.unlock_phase,
        effect: def.effect.clone(),
        requirement: def.requirement.clone(),
    })
}

fn check_references(
    upgrade: &Upgrade,
    buildings: &BTreeMap<String, Building>,
    upgrades: &BTreeMap<String, Upgrade>,
) -> Result<(), CatalogError> {
    if let Some(building) = upgrade.effect.building_ref() {
        if !buildings.contains_key(building) {
            return Err(CatalogError::UnknownBuilding {
                upgrade: upgrade.id.clone(),
                building: building.to_string(),
            });
        }
    }

    let Some(requirement) = &upgrade.requirement else {
        return Ok(());
    };
    let mut error = None;
    requirement.walk(&mut |node| {
        if error.is_some() {
            return;
        }
        match node {
            Requirement::UpgradeOwned { id } if id == &upgrade.id => {
                error = Some(CatalogError::SelfRequirement(upgrade.id.clone()));
            }
            Requirement::UpgradeOwned { id } if !upgrades.contains_key(id) => {
                error = Some(CatalogError::UnknownUpgrade {
                    upgrade: upgrade.id.clone(),
                    target: id.clone(),
                });
            }
            Requirement::BuildingCount { id, .. } if !buildings.contains_key(id) => {
                error = Some(CatalogError::UnknownBuilding {
                    upgrade: upgrade.id.clone(),
                    building: id.clone(),
                });
            }
            _ => {}
        }
    });
    match error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
