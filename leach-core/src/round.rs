use serde::{Deserialize, Serialize};

use crate::Resource;

/// Number of the round about to run. The first round is 1.
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundCounter {
    current: u64,
}

impl RoundCounter {
    pub fn starting_at(round: u64) -> Self {
        Self { current: round }
    }

    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn advance(&mut self) {
        self.current += 1;
    }
}

impl Default for RoundCounter {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

/// Simulated clock. Never reads the wall clock, so seeded runs replay exactly.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimTime {
    pub elapsed_seconds: f64,
    pub round_seconds: f64,
}

impl SimTime {
    pub fn new(round_seconds: f64) -> Self {
        Self { elapsed_seconds: 0.0, round_seconds }
    }

    /// Moves the clock to the start of `round`.
    pub fn set_round(&mut self, round: u64) {
        self.elapsed_seconds = round as f64 * self.round_seconds;
    }

    pub fn now(&self) -> f64 {
        self.elapsed_seconds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_counter_starts_at_one() {
        let mut counter = RoundCounter::default();
        assert_eq!(counter.current(), 1);
        counter.advance();
        counter.advance();
        assert_eq!(counter.current(), 3);
    }

    #[test]
    fn sim_time_follows_round() {
        let mut time = SimTime::new(0.5);
        time.set_round(4);
        assert_eq!(time.now(), 2.0);
    }
}
