use std::path::Path;

use proptest::prelude::*;

use melon_core::command::parse_script;
use melon_core::io::definitions::{builtin_catalog, load_catalog};
use melon_core::strategy::arb_commands;
use melon_core::{Command, EngineConfig, GameEngine, GameState, Outcome, Phase, Rejection};

const EPSILON: f64 = 1e-9;

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < EPSILON,
        "expected {expected}, got {actual}"
    );
}

fn engine_with(edit: impl FnOnce(&mut GameState)) -> GameEngine {
    let catalog = builtin_catalog().expect("builtin catalog builds");
    let config = EngineConfig::default();
    let mut state = GameState::fresh(&catalog, &config, 0);
    edit(&mut state);
    GameEngine::from_state(catalog, config, state)
}

#[test]
fn five_clicks_from_fresh_state() {
    let mut engine = engine_with(|_| {});
    for _ in 0..5 {
        engine.click();
    }
    assert_eq!(engine.state().melons, 5.0);
    assert_eq!(engine.state().total_clicks, 5);
}

#[test]
fn selling_five_melons_at_par() {
    let mut engine = engine_with(|state| state.melons = 5.0);
    engine.sell_melons(5.0);
    assert_eq!(engine.state().melons, 0.0);
    assert_eq!(engine.state().money, 5.0);
    assert_eq!(engine.state().total_money_earned, 5.0);
}

#[test]
fn first_patch_costs_base_price() {
    let mut engine = engine_with(|state| state.money = 100.0);
    assert_eq!(engine.buy_building("melonPatch", 1), Outcome::Applied);
    assert_eq!(engine.state().money, 90.0);
    assert_eq!(engine.state().buildings["melonPatch"].count, 1);
}

#[test]
fn one_second_at_one_melon_per_second() {
    let mut engine = engine_with(|state| {
        if let Some(patch) = state.buildings.get_mut("melonPatch") {
            patch.count = 10;
        }
        state.last_tick_ms = 5_000;
    });
    assert_close(engine.state().melons_per_second, 1.0);
    engine.tick(6_000);
    assert_close(engine.state().melons, 1.0);
}

#[test]
fn crossing_first_threshold_enters_automation() {
    let mut engine = engine_with(|state| state.melons = 120.0);
    engine.sell_melons(120.0);
    assert!(engine.state().total_money_earned >= 100.0);
    assert_eq!(engine.state().phase, Phase::ManualProduction);

    engine.tick(100);
    assert_eq!(engine.state().phase, Phase::Automation);
    assert_eq!(engine.state().unlock_next_phase, 1_000.0);
}

#[test]
fn high_demand_relaxes_to_equilibrium_without_overshoot() {
    let mut engine = engine_with(|state| state.market.demand = 1.5);
    engine.tick(100_000);
    assert_eq!(engine.state().market.demand, 1.0);
}

#[test]
fn large_earnings_advance_one_tier_per_tick() {
    let mut engine = engine_with(|state| state.total_money_earned = 1_000_000.0);
    let mut seen = Vec::new();
    for now in 1..=5 {
        engine.tick(now);
        seen.push(engine.state().phase);
    }
    assert_eq!(
        seen,
        vec![
            Phase::Automation,
            Phase::MarketExpansion,
            Phase::WorldDomination,
            Phase::WorldDomination,
            Phase::WorldDomination,
        ]
    );
    assert!(engine.state().unlock_next_phase.is_infinite());
}

#[test]
fn locked_tier_opens_after_progression() {
    let mut engine = engine_with(|state| {
        state.money = 2_000.0;
        state.total_money_earned = 150.0;
    });
    assert_eq!(
        engine.buy_building("irrigationSystem", 1),
        Outcome::Rejected(Rejection::Locked)
    );
    engine.tick(1);
    assert_eq!(engine.buy_building("irrigationSystem", 1), Outcome::Applied);
}

#[test]
fn permissive_config_trusts_the_caller() {
    let catalog = builtin_catalog().expect("builtin catalog builds");
    let config = EngineConfig::permissive();
    let mut state = GameState::fresh(&catalog, &config, 0);
    state.money = 100_000.0;
    let mut engine = GameEngine::from_state(catalog, config, state);

    assert_eq!(engine.buy_upgrade("globalBrand"), Outcome::Applied);
    assert_eq!(engine.state().market.price_multiplier, 2.0);

    // no step cap: a full hour of production lands in one tick
    engine.buy_building("melonPatch", 10);
    engine.tick(3_600_000);
    assert_close(engine.state().melons, 3_600.0);
}

#[test]
fn scripted_opening_is_reproducible() {
    let script = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../testdata/scripts/opening.ndjson");
    let file = std::fs::File::open(&script).expect("opening script exists");
    let commands = parse_script(std::io::BufReader::new(file)).expect("script parses");
    assert!(!commands.is_empty());

    let run = || {
        let catalog = builtin_catalog().expect("builtin catalog builds");
        let mut engine = GameEngine::new(catalog, EngineConfig::default(), 0);
        let outcomes: Vec<Outcome> = commands.iter().map(|c| engine.apply(c)).collect();
        (engine, outcomes)
    };
    let (first, first_outcomes) = run();
    let (second, second_outcomes) = run();
    assert_eq!(first.state(), second.state());
    assert_eq!(first_outcomes, second_outcomes);

    assert!(first.state().buildings["melonPatch"].count > 0);
    assert!(first.state().upgrades["betterSeeds"].purchased);
    assert_eq!(first.state().phase, Phase::Automation);
}

#[test]
fn compact_catalog_drives_engine() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../testdata/catalogs/compact.json");
    let catalog = load_catalog(Some(&path)).expect("compact catalog loads");
    let mut engine = GameEngine::new(catalog, EngineConfig::default(), 0);
    assert_eq!(
        engine.buy_building("melonPatch", 1),
        Outcome::Rejected(Rejection::UnknownBuilding)
    );
    assert_eq!(engine.state().buildings.len(), 2);
}

proptest! {
    #[test]
    fn phase_and_purchases_are_monotonic(commands in arb_commands(96)) {
        let catalog = builtin_catalog().expect("builtin catalog builds");
        let mut engine = GameEngine::new(catalog, EngineConfig::default(), 0);

        for command in &commands {
            let before = engine.state().clone();
            let outcome = engine.apply(command);
            let state = engine.state();

            prop_assert!(state.phase >= before.phase);
            prop_assert!(state.phase.tier() <= before.phase.tier() + 1);
            for (id, upgrade) in &before.upgrades {
                prop_assert!(!upgrade.purchased || state.upgrades[id].purchased);
            }

            let expected_click = match (command, outcome) {
                (Command::BuyUpgrade { id }, Outcome::Applied) if id == "betterSeeds" => {
                    before.melons_per_click * 2.0
                }
                (Command::BuyUpgrade { id }, Outcome::Applied) if id == "gardeningGloves" => {
                    before.melons_per_click + 1.0
                }
                _ => before.melons_per_click,
            };
            prop_assert_eq!(state.melons_per_click, expected_click);
            if !outcome.is_applied() {
                prop_assert_eq!(state, &before);
            }
        }
    }

    #[test]
    fn tick_production_is_exact_without_cap(
        patches in 0u32..200,
        elapsed in 0u64..600_000,
        demand in 0.5f64..=1.5,
    ) {
        let catalog = builtin_catalog().expect("builtin catalog builds");
        let config = EngineConfig::permissive();
        let mut state = GameState::fresh(&catalog, &config, 0);
        if let Some(patch) = state.buildings.get_mut("melonPatch") {
            patch.count = patches;
        }
        state.market.demand = demand;
        let mut engine = GameEngine::from_state(catalog, config, state);

        let rate = engine.state().melons_per_second;
        engine.tick(elapsed);
        let expected = rate * elapsed as f64 / 1_000.0;
        prop_assert!((engine.state().melons - expected).abs() <= 1e-9 * expected.max(1.0));
        prop_assert!(engine.state().market.demand >= 0.5);
        prop_assert!(engine.state().market.demand <= 1.5);
    }
}
