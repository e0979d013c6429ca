use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

use crate::building::{production_rate, Building};
use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::market::Market;
use crate::phase::Phase;
use crate::upgrade::Upgrade;

/// Seeds granted on a fresh start.
pub const STARTING_SEEDS: f64 = 10.0;

/// Melons produced by a single click before upgrades.
pub const STARTING_CLICK_YIELD: f64 = 1.0;

/// The single authoritative game record.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub melons: f64,
    pub money: f64,
    pub seeds: f64,
    pub melons_per_click: f64,
    /// Derived from `buildings`; refreshed by [`GameState::recompute_production`].
    pub melons_per_second: f64,
    pub market: Market,
    pub phase: Phase,
    /// Lifetime earnings that trigger the next transition; `inf` when terminal.
    #[serde_as(as = "DisplayFromStr")]
    pub unlock_next_phase: f64,
    pub buildings: BTreeMap<String, Building>,
    pub upgrades: BTreeMap<String, Upgrade>,
    pub total_melons_produced: f64,
    pub total_money_earned: f64,
    pub total_clicks: u64,
    pub last_tick_ms: u64,
    pub game_start_ms: u64,
    pub offline_progress_enabled: bool,
    pub offline_progress_rate: f64,
}

impl GameState {
    /// Build a fresh state from a validated catalog.
    pub fn fresh(catalog: &Catalog, config: &EngineConfig, now_ms: u64) -> Self {
        let mut state = Self {
            melons: 0.0,
            money: 0.0,
            seeds: STARTING_SEEDS,
            melons_per_click: STARTING_CLICK_YIELD,
            melons_per_second: 0.0,
            market: Market::default(),
            phase: Phase::ManualProduction,
            unlock_next_phase: Phase::ManualProduction.exit_threshold(),
            buildings: catalog.buildings().clone(),
            upgrades: catalog.upgrades().clone(),
            total_melons_produced: 0.0,
            total_money_earned: 0.0,
            total_clicks: 0,
            last_tick_ms: now_ms,
            game_start_ms: now_ms,
            offline_progress_enabled: config.offline_progress_enabled,
            offline_progress_rate: config.offline_progress_rate,
        };
        state.recompute_production();
        state
    }

    /// Recompute `melons_per_second` from the full building set.
    pub fn recompute_production(&mut self) {
        self.melons_per_second = production_rate(self.buildings.values());
    }

    /// Credit produced melons to the stock and the lifetime counter.
    pub fn credit_melons(&mut self, amount: f64) {
        if amount <= 0.0 {
            return;
        }
        self.melons += amount;
        self.total_melons_produced += amount;
    }

    /// Credit sale proceeds to the balance and lifetime earnings.
    pub fn credit_money(&mut self, amount: f64) {
        if amount <= 0.0 {
            return;
        }
        self.money += amount;
        self.total_money_earned += amount;
    }

    /// Deduct a purchase; callers check affordability first.
    pub fn spend(&mut self, amount: f64) {
        self.money = (self.money - amount).max(0.0);
    }

    pub fn play_time_ms(&self) -> u64 {
        self.last_tick_ms.saturating_sub(self.game_start_ms)
    }
}
