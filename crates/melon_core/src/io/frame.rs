use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::engine::Outcome;
use crate::market::round_currency;
use crate::state::GameState;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Rounded price of one melon right now.
    pub unit_price: f64,
    /// Proceeds from selling the whole stock in one sale.
    pub sell_all_value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuildingView {
    pub id: String,
    pub count: u32,
    pub next_cost: f64,
    pub production: f64,
    pub offered: bool,
}

/// Consistent owned view of the game for display hosts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub t: u64,
    pub play_time_ms: u64,
    pub quote: Quote,
    pub buildings: Vec<BuildingView>,
    pub offered_upgrades: Vec<String>,
    pub state: GameState,
}

pub fn make_snapshot(state: &GameState) -> Snapshot {
    let quote = Quote {
        unit_price: state.market.price(1.0),
        sell_all_value: state.market.price(state.melons),
    };

    let buildings = state
        .buildings
        .values()
        .map(|building| BuildingView {
            id: building.id.clone(),
            count: building.count,
            next_cost: round_currency(building.next_cost()),
            production: building.production(),
            offered: building.unlock_phase <= state.phase,
        })
        .collect();

    let offered_upgrades = state
        .upgrades
        .values()
        .filter(|upgrade| upgrade.is_offered(state))
        .map(|upgrade| upgrade.id.clone())
        .collect();

    Snapshot {
        t: state.last_tick_ms,
        play_time_ms: state.play_time_ms(),
        quote,
        buildings,
        offered_upgrades,
        state: state.clone(),
    }
}

impl Snapshot {
    pub fn to_ndjson(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }
}

/// One replay step: the command, what happened, and the resulting view.
#[derive(Clone, Debug, Serialize)]
pub struct Frame {
    pub seq: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<Command>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    pub snapshot: Snapshot,
}

pub fn make_frame(
    seq: u64,
    command: Option<Command>,
    outcome: Option<Outcome>,
    snapshot: Snapshot,
) -> Frame {
    Frame {
        seq,
        command,
        outcome,
        snapshot,
    }
}

impl Frame {
    pub fn to_ndjson(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string(self)?;
        json.push('\n');
        Ok(json)
    }
}
