use crate::state::GameState;

/// How a tick's elapsed time was accounted for.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Step {
    /// Wall time since the previous tick.
    pub elapsed_seconds: f64,
    /// Portion simulated at full production rate.
    pub simulated_seconds: f64,
    /// Portion beyond the step cap.
    pub overflow_seconds: f64,
    pub produced: f64,
}

/// Turns driver timestamps into passive production and market relaxation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimulationClock {
    max_step_ms: Option<u64>,
}

impl SimulationClock {
    pub fn new(max_step_ms: Option<u64>) -> Self {
        Self { max_step_ms }
    }

    /// Advance `state` to `now_ms`.
    ///
    /// A timestamp earlier than the last tick counts as zero elapsed time;
    /// `last_tick_ms` is updated either way.
    pub fn advance(&self, state: &mut GameState, now_ms: u64) -> Step {
        let elapsed_ms = now_ms.saturating_sub(state.last_tick_ms);
        state.last_tick_ms = now_ms;

        let simulated_ms = match self.max_step_ms {
            Some(cap) => elapsed_ms.min(cap),
            None => elapsed_ms,
        };
        let overflow_ms = elapsed_ms - simulated_ms;

        let mut step = Step {
            elapsed_seconds: millis_to_seconds(elapsed_ms),
            simulated_seconds: millis_to_seconds(simulated_ms),
            overflow_seconds: millis_to_seconds(overflow_ms),
            produced: 0.0,
        };

        let rate = state.melons_per_second;
        step.produced = rate * step.simulated_seconds;
        if state.offline_progress_enabled && overflow_ms > 0 {
            step.produced += rate * step.overflow_seconds * state.offline_progress_rate;
        }
        state.credit_melons(step.produced);
        state.market.relax(step.elapsed_seconds);
        step
    }
}

fn millis_to_seconds(ms: u64) -> f64 {
    ms as f64 / 1_000.0
}
