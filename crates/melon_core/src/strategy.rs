//! Proptest strategies for command sequences against the builtin catalog.

use proptest::prelude::*;

use crate::command::Command;

const BUILDING_IDS: [&str; 4] = ["melonPatch", "melonPress", "irrigationSystem", "ghost"];
const UPGRADE_IDS: [&str; 5] = [
    "betterSeeds",
    "gardeningGloves",
    "compost",
    "farmersMarket",
    "ghost",
];

/// A single command. Ticks carry a step size, not an absolute time.
fn arb_step() -> impl Strategy<Value = Command> {
    prop_oneof![
        4 => Just(Command::Click),
        2 => (0.0f64..200.0).prop_map(|amount| Command::Sell { amount }),
        2 => (prop::sample::select(BUILDING_IDS.to_vec()), 0u32..6).prop_map(|(id, amount)| {
            Command::BuyBuilding {
                id: id.to_string(),
                amount,
            }
        }),
        1 => prop::sample::select(UPGRADE_IDS.to_vec()).prop_map(|id| Command::BuyUpgrade {
            id: id.to_string()
        }),
        2 => (0u64..120_000).prop_map(|now_ms| Command::Tick { now_ms }),
    ]
}

/// Up to `max_len` commands with tick timestamps made cumulative.
pub fn arb_commands(max_len: usize) -> impl Strategy<Value = Vec<Command>> {
    prop::collection::vec(arb_step(), 0..max_len).prop_map(|steps| {
        let mut now_ms = 0u64;
        steps
            .into_iter()
            .map(|command| match command {
                Command::Tick { now_ms: step } => {
                    now_ms += step;
                    Command::Tick { now_ms }
                }
                other => other,
            })
            .collect()
    })
}
