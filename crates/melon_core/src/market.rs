use serde::{Deserialize, Serialize};

/// Lower bound for the demand multiplier.
pub const DEMAND_MIN: f64 = 0.5;

/// Upper bound for the demand multiplier.
pub const DEMAND_MAX: f64 = 1.5;

/// Demand level the market relaxes toward between sales.
pub const DEMAND_EQUILIBRIUM: f64 = 1.0;

/// Demand lost per melon sold.
pub const DEMAND_IMPACT_PER_MELON: f64 = 1.0 / 1_000.0;

/// Demand recovered (or shed) per simulated second.
pub const DEMAND_RELAXATION_PER_SECOND: f64 = 0.01;

/// Round a currency amount to whole cents.
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Clamp a demand value into `[DEMAND_MIN, DEMAND_MAX]`.
pub fn clamp_demand(value: f64) -> f64 {
    if value.is_nan() {
        return DEMAND_EQUILIBRIUM;
    }
    value.clamp(DEMAND_MIN, DEMAND_MAX)
}

/// Price parameters for melon sales.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub base_price: f64,
    pub price_multiplier: f64,
    pub demand: f64,
}

impl Default for Market {
    fn default() -> Self {
        Self {
            base_price: 1.0,
            price_multiplier: 1.0,
            demand: DEMAND_EQUILIBRIUM,
        }
    }
}

impl Market {
    /// Unrounded price of a single melon at current demand.
    pub fn unit_price(&self) -> f64 {
        self.base_price * self.price_multiplier * self.demand
    }

    /// Money received for selling `amount` melons, rounded to cents.
    pub fn price(&self, amount: f64) -> f64 {
        round_currency(self.unit_price() * amount)
    }

    /// Depress demand in proportion to sale volume.
    pub fn absorb_sale(&mut self, amount: f64) {
        self.demand = clamp_demand(self.demand - amount * DEMAND_IMPACT_PER_MELON);
    }

    /// Move demand toward equilibrium without crossing it.
    pub fn relax(&mut self, seconds: f64) {
        if seconds.is_nan() || seconds <= 0.0 {
            return;
        }
        let step = DEMAND_RELAXATION_PER_SECOND * seconds;
        if self.demand < DEMAND_EQUILIBRIUM {
            self.demand = (self.demand + step).min(DEMAND_EQUILIBRIUM);
        } else if self.demand > DEMAND_EQUILIBRIUM {
            self.demand = (self.demand - step).max(DEMAND_EQUILIBRIUM);
        }
        self.demand = clamp_demand(self.demand);
    }
}
