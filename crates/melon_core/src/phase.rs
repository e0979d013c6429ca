use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::GameState;

/// Money that must be earned in total before the first transition.
pub const INITIAL_UNLOCK_THRESHOLD: f64 = 100.0;

/// Ordered progression tiers.
///
/// Discriminants are the tier numbers used by catalog documents and snapshot
/// frames, so the derived ordering matches progression order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Phase {
    #[default]
    ManualProduction = 1,
    Automation = 2,
    MarketExpansion = 3,
    WorldDomination = 4,
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("unknown phase tier {0} (expected 1..=4)")]
pub struct UnknownTier(pub u8);

impl Phase {
    pub const ALL: [Phase; 4] = [
        Phase::ManualProduction,
        Phase::Automation,
        Phase::MarketExpansion,
        Phase::WorldDomination,
    ];

    pub fn tier(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Phase::ManualProduction => "MANUAL_PRODUCTION",
            Phase::Automation => "AUTOMATION",
            Phase::MarketExpansion => "MARKET_EXPANSION",
            Phase::WorldDomination => "WORLD_DOMINATION",
        }
    }

    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::ManualProduction => Some(Phase::Automation),
            Phase::Automation => Some(Phase::MarketExpansion),
            Phase::MarketExpansion => Some(Phase::WorldDomination),
            Phase::WorldDomination => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    /// Cumulative earnings required to leave this phase; `+inf` once terminal.
    pub fn exit_threshold(self) -> f64 {
        match self {
            Phase::ManualProduction => INITIAL_UNLOCK_THRESHOLD,
            Phase::Automation => 1_000.0,
            Phase::MarketExpansion => 10_000.0,
            Phase::WorldDomination => f64::INFINITY,
        }
    }
}

impl TryFrom<u8> for Phase {
    type Error = UnknownTier;

    fn try_from(tier: u8) -> Result<Self, Self::Error> {
        Phase::ALL
            .into_iter()
            .find(|phase| phase.tier() == tier)
            .ok_or(UnknownTier(tier))
    }
}

impl From<Phase> for u8 {
    fn from(phase: Phase) -> Self {
        phase.tier()
    }
}

/// Advance the state by at most one tier.
///
/// Returns the phase that was entered, or `None` when the guard does not hold.
/// A single call never skips a tier even if lifetime earnings already exceed
/// several thresholds.
pub fn check_progression(state: &mut GameState) -> Option<Phase> {
    if state.total_money_earned < state.unlock_next_phase {
        return None;
    }
    let next = state.phase.next()?;
    state.phase = next;
    state.unlock_next_phase = next.exit_threshold();
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::definitions::builtin_catalog;
    use proptest::prelude::*;

    fn fresh_state() -> GameState {
        let catalog = builtin_catalog().expect("builtin catalog builds");
        GameState::fresh(&catalog, &Default::default(), 0)
    }

    #[test]
    fn tiers_round_trip_through_u8() {
        for phase in Phase::ALL {
            assert_eq!(Phase::try_from(phase.tier()), Ok(phase));
        }
        assert_eq!(Phase::try_from(0), Err(UnknownTier(0)));
        assert_eq!(Phase::try_from(5), Err(UnknownTier(5)));
    }

    #[test]
    fn crossing_first_threshold_enters_automation() {
        let mut state = fresh_state();
        state.total_money_earned = 100.0;

        assert_eq!(check_progression(&mut state), Some(Phase::Automation));
        assert_eq!(state.phase, Phase::Automation);
        assert_eq!(state.unlock_next_phase, 1_000.0);
    }

    #[test]
    fn below_threshold_stays_put() {
        let mut state = fresh_state();
        state.total_money_earned = 99.99;

        assert_eq!(check_progression(&mut state), None);
        assert_eq!(state.phase, Phase::ManualProduction);
        assert_eq!(state.unlock_next_phase, INITIAL_UNLOCK_THRESHOLD);
    }

    #[test]
    fn large_earnings_advance_one_tier_per_check() {
        let mut state = fresh_state();
        state.total_money_earned = 1.0e9;

        assert_eq!(check_progression(&mut state), Some(Phase::Automation));
        assert_eq!(check_progression(&mut state), Some(Phase::MarketExpansion));
        assert_eq!(check_progression(&mut state), Some(Phase::WorldDomination));
        assert!(state.unlock_next_phase.is_infinite());
        assert!(state.phase.is_terminal());
        assert!(!Phase::MarketExpansion.is_terminal());
        assert_eq!(check_progression(&mut state), None);
        assert_eq!(state.phase, Phase::WorldDomination);
    }

    #[test]
    fn serializes_as_tier_number() {
        let json = serde_json::to_string(&Phase::MarketExpansion).unwrap();
        assert_eq!(json, "3");
        let parsed: Phase = serde_json::from_str("2").unwrap();
        assert_eq!(parsed, Phase::Automation);
        assert!(serde_json::from_str::<Phase>("7").is_err());
    }

    proptest! {
        #[test]
        fn phase_never_decreases(earnings in proptest::collection::vec(0.0f64..50_000.0, 1..32)) {
            let mut state = fresh_state();
            for earned in earnings {
                let before = state.phase;
                state.total_money_earned += earned;
                check_progression(&mut state);
                prop_assert!(state.phase >= before);
                prop_assert!(state.phase.tier() <= before.tier() + 1);
            }
        }
    }
}
