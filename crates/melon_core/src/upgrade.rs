//! One-time purchasable modifiers.
//!
//! Effects and eligibility requirements are plain data interpreted against
//! [`GameState`], so catalogs can be loaded from JSON and replayed
//! deterministically.

use serde::{Deserialize, Serialize};

use crate::phase::Phase;
use crate::state::GameState;

/// Operation applied to the state when an upgrade is purchased.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    MultiplyClickYield { factor: f64 },
    AddClickYield { amount: f64 },
    MultiplyBuildingOutput { building: String, factor: f64 },
    MultiplyAllBuildings { factor: f64 },
    MultiplyPrice { factor: f64 },
}

impl Effect {
    /// Apply the effect and recompute derived production.
    pub fn apply(&self, state: &mut GameState) {
        match self {
            Effect::MultiplyClickYield { factor } => state.melons_per_click *= factor,
            Effect::AddClickYield { amount } => state.melons_per_click += amount,
            Effect::MultiplyBuildingOutput { building, factor } => {
                if let Some(target) = state.buildings.get_mut(building) {
                    target.multiplier *= factor;
                }
            }
            Effect::MultiplyAllBuildings { factor } => {
                for building in state.buildings.values_mut() {
                    building.multiplier *= factor;
                }
            }
            Effect::MultiplyPrice { factor } => state.market.price_multiplier *= factor,
        }
        state.recompute_production();
    }

    /// Building id referenced by the effect, if any.
    pub fn building_ref(&self) -> Option<&str> {
        match self {
            Effect::MultiplyBuildingOutput { building, .. } => Some(building),
            _ => None,
        }
    }

    /// Scalar parameter of the effect, used for catalog validation.
    pub fn magnitude(&self) -> f64 {
        match self {
            Effect::MultiplyClickYield { factor }
            | Effect::MultiplyBuildingOutput { factor, .. }
            | Effect::MultiplyAllBuildings { factor }
            | Effect::MultiplyPrice { factor } => *factor,
            Effect::AddClickYield { amount } => *amount,
        }
    }
}

/// Eligibility predicate evaluated against the current state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Requirement {
    MinPhase { phase: Phase },
    UpgradeOwned { id: String },
    BuildingCount { id: String, count: u32 },
    TotalMoneyEarned { amount: f64 },
    All { of: Vec<Requirement> },
}

impl Requirement {
    pub fn is_met(&self, state: &GameState) -> bool {
        match self {
            Requirement::MinPhase { phase } => state.phase >= *phase,
            Requirement::UpgradeOwned { id } => state
                .upgrades
                .get(id)
                .map(|upgrade| upgrade.purchased)
                .unwrap_or(false),
            Requirement::BuildingCount { id, count } => state
                .buildings
                .get(id)
                .map(|building| building.count >= *count)
                .unwrap_or(false),
            Requirement::TotalMoneyEarned { amount } => state.total_money_earned >= *amount,
            Requirement::All { of } => of.iter().all(|inner| inner.is_met(state)),
        }
    }

    /// Visit this requirement and every nested one.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Requirement)) {
        visit(self);
        if let Requirement::All { of } = self {
            for inner in of {
                inner.walk(visit);
            }
        }
    }
}

/// A one-time modifier. Once `purchased` is set it never reverts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Upgrade {
    pub id: String,
    pub name: String,
    pub description: String,
    pub cost: f64,
    pub purchased: bool,
    pub unlock_phase: Phase,
    pub effect: Effect,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub requirement: Option<Requirement>,
}

impl Upgrade {
    pub fn requirement_met(&self, state: &GameState) -> bool {
        self.requirement
            .as_ref()
            .map(|requirement| requirement.is_met(state))
            .unwrap_or(true)
    }

    /// Whether a shop should present this upgrade right now.
    pub fn is_offered(&self, state: &GameState) -> bool {
        !self.purchased && self.unlock_phase <= state.phase && self.requirement_met(state)
    }
}
