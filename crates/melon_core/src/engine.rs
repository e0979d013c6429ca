use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::catalog::Catalog;
use crate::clock::SimulationClock;
use crate::command::Command;
use crate::config::EngineConfig;
use crate::io::frame::{make_snapshot, Snapshot};
use crate::market::clamp_demand;
use crate::phase::check_progression;
use crate::state::GameState;

/// Why an action left the state untouched.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    #[error("no building with that id")]
    UnknownBuilding,
    #[error("no upgrade with that id")]
    UnknownUpgrade,
    #[error("upgrade already purchased")]
    AlreadyPurchased,
    #[error("not enough money")]
    InsufficientFunds,
    #[error("no melons to sell")]
    NothingToSell,
    #[error("amount is not a valid quantity")]
    InvalidAmount,
    #[error("not unlocked in the current phase")]
    Locked,
    #[error("purchase requirement not met")]
    RequirementUnmet,
}

/// Result of a single action. Rejected actions never modify state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    Applied,
    Rejected(Rejection),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

impl From<Rejection> for Outcome {
    fn from(reason: Rejection) -> Self {
        Outcome::Rejected(reason)
    }
}

/// Owns the single game state and applies every action to it atomically.
///
/// Each method takes `&mut self` and completes synchronously, so any host
/// that shares an engine across threads wraps it in one lock.
#[derive(Clone, Debug)]
pub struct GameEngine {
    catalog: Catalog,
    config: EngineConfig,
    clock: SimulationClock,
    state: GameState,
}

impl GameEngine {
    /// Create an engine with a freshly initialized state stamped at `now_ms`.
    pub fn new(catalog: Catalog, config: EngineConfig, now_ms: u64) -> Self {
        let state = GameState::fresh(&catalog, &config, now_ms);
        let clock = SimulationClock::new(config.max_step_ms);
        info!(
            buildings = catalog.buildings().len(),
            upgrades = catalog.upgrades().len(),
            now_ms,
            "engine initialized"
        );
        Self {
            catalog,
            config,
            clock,
            state,
        }
    }

    /// Resume from an existing state.
    ///
    /// Resources are floored at zero, demand is clamped into its band and
    /// derived production is recomputed before any action runs.
    pub fn from_state(catalog: Catalog, config: EngineConfig, mut state: GameState) -> Self {
        state.melons = state.melons.max(0.0);
        state.money = state.money.max(0.0);
        state.seeds = state.seeds.max(0.0);
        state.market.demand = clamp_demand(state.market.demand);
        state.recompute_production();
        let clock = SimulationClock::new(config.max_step_ms);
        Self {
            catalog,
            config,
            clock,
            state,
        }
    }

    /// Discard all progress and start over from the catalog.
    pub fn initialize(&mut self, now_ms: u64) {
        self.state = GameState::fresh(&self.catalog, &self.config, now_ms);
        info!(now_ms, "game state reset");
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Consistent read-only projection for display.
    pub fn snapshot(&self) -> Snapshot {
        make_snapshot(&self.state)
    }

    pub fn apply(&mut self, command: &Command) -> Outcome {
        match command {
            Command::Click => self.click(),
            Command::Sell { amount } => self.sell_melons(*amount),
            Command::BuyBuilding { id, amount } => self.buy_building(id, *amount),
            Command::BuyUpgrade { id } => self.buy_upgrade(id),
            Command::Tick { now_ms } => self.tick(*now_ms),
        }
    }

    pub fn click(&mut self) -> Outcome {
        let yield_per_click = self.state.melons_per_click;
        self.state.credit_melons(yield_per_click);
        self.state.total_clicks += 1;
        Outcome::Applied
    }

    /// Sell up to `amount` melons at the current market price.
    pub fn sell_melons(&mut self, amount: f64) -> Outcome {
        if !amount.is_finite() || amount < 0.0 {
            return self.reject("sell", Rejection::InvalidAmount);
        }
        let actual = amount.min(self.state.melons);
        if actual <= 0.0 {
            return self.reject("sell", Rejection::NothingToSell);
        }

        let price = self.state.market.price(actual);
        self.state.melons -= actual;
        self.state.credit_money(price);
        self.state.market.absorb_sale(actual);
        debug!(
            sold = actual,
            price,
            demand = self.state.market.demand,
            "sold melons"
        );
        Outcome::Applied
    }

    /// Buy `amount` units of a building, all or nothing.
    pub fn buy_building(&mut self, id: &str, amount: u32) -> Outcome {
        if amount == 0 {
            return self.reject("buy_building", Rejection::InvalidAmount);
        }
        let Some(building) = self.state.buildings.get(id) else {
            return self.reject("buy_building", Rejection::UnknownBuilding);
        };
        if self.config.enforce_unlocks && building.unlock_phase > self.state.phase {
            return self.reject("buy_building", Rejection::Locked);
        }
        let Some(total_cost) = building.affordable_batch_cost(amount, self.state.money) else {
            return self.reject("buy_building", Rejection::InsufficientFunds);
        };

        self.state.spend(total_cost);
        if let Some(building) = self.state.buildings.get_mut(id) {
            building.count = building.count.saturating_add(amount);
        }
        self.state.recompute_production();
        debug!(
            building = id,
            amount,
            cost = total_cost,
            melons_per_second = self.state.melons_per_second,
            "bought building"
        );
        Outcome::Applied
    }

    /// Buy a one-time upgrade and apply its effect.
    pub fn buy_upgrade(&mut self, id: &str) -> Outcome {
        let Some(upgrade) = self.state.upgrades.get(id) else {
            return self.reject("buy_upgrade", Rejection::UnknownUpgrade);
        };
        if upgrade.purchased {
            return self.reject("buy_upgrade", Rejection::AlreadyPurchased);
        }
        if self.config.enforce_unlocks {
            if upgrade.unlock_phase > self.state.phase {
                return self.reject("buy_upgrade", Rejection::Locked);
            }
            if !upgrade.requirement_met(&self.state) {
                return self.reject("buy_upgrade", Rejection::RequirementUnmet);
            }
        }
        if self.state.money < upgrade.cost {
            return self.reject("buy_upgrade", Rejection::InsufficientFunds);
        }

        let cost = upgrade.cost;
        let effect = upgrade.effect.clone();
        self.state.spend(cost);
        if let Some(upgrade) = self.state.upgrades.get_mut(id) {
            upgrade.purchased = true;
        }
        effect.apply(&mut self.state);
        debug!(upgrade = id, cost, ?effect, "bought upgrade");
        Outcome::Applied
    }

    /// Advance the simulation to the driver-supplied timestamp.
    pub fn tick(&mut self, now_ms: u64) -> Outcome {
        let step = self.clock.advance(&mut self.state, now_ms);
        trace!(
            elapsed = step.elapsed_seconds,
            produced = step.produced,
            demand = self.state.market.demand,
            "tick"
        );
        if let Some(phase) = check_progression(&mut self.state) {
            info!(
                phase = phase.name(),
                terminal = phase.is_terminal(),
                next_threshold = self.state.unlock_next_phase,
                total_money_earned = self.state.total_money_earned,
                "entered new phase"
            );
        }
        Outcome::Applied
    }

    fn reject(&self, action: &'static str, reason: Rejection) -> Outcome {
        trace!(action, %reason, "action rejected");
        reason.into()
    }
}
