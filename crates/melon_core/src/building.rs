use serde::{Deserialize, Serialize};

use crate::phase::Phase;

/// Growth factor applied to each successive unit of a building.
pub const COST_GROWTH: f64 = 1.15;

/// A repeatable purchase that adds passive melon production.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: String,
    pub name: String,
    pub description: String,
    pub base_cost: f64,
    /// Melons per second contributed by one unit at multiplier 1.
    pub base_production: f64,
    pub count: u32,
    pub unlock_phase: Phase,
    pub multiplier: f64,
}

impl Building {
    /// Cost of the `n`-th unit (0-indexed).
    pub fn unit_cost(&self, n: u32) -> f64 {
        self.base_cost * COST_GROWTH.powf(f64::from(n))
    }

    /// Cost of the next unit given the current count.
    pub fn next_cost(&self) -> f64 {
        self.unit_cost(self.count)
    }

    /// Sum of the marginal costs of the next `amount` units.
    pub fn batch_cost(&self, amount: u32) -> f64 {
        (0..amount)
            .map(|offset| self.unit_cost(self.count.saturating_add(offset)))
            .sum()
    }

    /// Batch cost of the next `amount` units if it fits within `budget`.
    ///
    /// Stops summing as soon as the running total exceeds the budget, so an
    /// oversized request costs at most a few dozen iterations.
    pub fn affordable_batch_cost(&self, amount: u32, budget: f64) -> Option<f64> {
        let mut total = 0.0;
        for offset in 0..amount {
            total += self.unit_cost(self.count.saturating_add(offset));
            if total > budget {
                return None;
            }
        }
        Some(total)
    }

    /// Melons per second produced by every owned unit.
    pub fn production(&self) -> f64 {
        self.base_production * f64::from(self.count) * self.multiplier
    }
}

/// Aggregate melons per second over a set of buildings.
pub fn production_rate<'a, I>(buildings: I) -> f64
where
    I: IntoIterator<Item = &'a Building>,
{
    buildings.into_iter().map(Building::production).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPSILON: f64 = 1e-9;

    fn patch(count: u32) -> Building {
        Building {
            id: "melonPatch".to_string(),
            name: "Melon Patch".to_string(),
            description: String::new(),
            base_cost: 10.0,
            base_production: 0.1,
            count,
            unlock_phase: Phase::ManualProduction,
            multiplier: 1.0,
        }
    }

    #[test]
    fn first_unit_costs_base() {
        assert_eq!(patch(0).next_cost(), 10.0);
    }

    #[test]
    fn cost_grows_geometrically() {
        let building = patch(2);
        assert!((building.next_cost() - 10.0 * 1.15 * 1.15).abs() < EPSILON);
    }

    #[test]
    fn batch_cost_sums_marginal_costs() {
        let building = patch(1);
        let expected = 10.0 * 1.15 + 10.0 * 1.15f64.powi(2) + 10.0 * 1.15f64.powi(3);
        assert!((building.batch_cost(3) - expected).abs() < EPSILON);
        assert_eq!(building.batch_cost(0), 0.0);
    }

    #[test]
    fn affordable_batch_respects_budget() {
        let building = patch(0);
        assert_eq!(building.affordable_batch_cost(1, 10.0), Some(10.0));
        assert_eq!(building.affordable_batch_cost(1, 9.99), None);
        assert_eq!(building.affordable_batch_cost(u32::MAX, 1.0e6), None);
    }

    #[test]
    fn production_scales_with_count_and_multiplier() {
        let mut building = patch(4);
        building.multiplier = 2.5;
        assert!((building.production() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn production_rate_sums_all_buildings() {
        let mut press = patch(2);
        press.id = "melonPress".to_string();
        press.base_production = 0.5;
        let total = production_rate([&patch(3), &press]);
        assert!((total - 1.3).abs() < EPSILON);
    }

    proptest! {
        #[test]
        fn marginal_costs_strictly_increase(count in 0u32..200) {
            let building = patch(count);
            prop_assert!(building.unit_cost(count + 1) > building.unit_cost(count));
        }

        #[test]
        fn affordable_batch_matches_batch_cost(count in 0u32..50, amount in 1u32..20) {
            let building = patch(count);
            let cost = building.batch_cost(amount);
            prop_assert_eq!(building.affordable_batch_cost(amount, cost), Some(cost));
        }
    }
}
