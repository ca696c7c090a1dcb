use crate::World;

/// Core trait that all simulation systems must implement
pub trait System: Send + Sync {
    /// Executes the system logic
    fn run(&mut self, world: &mut World);

    /// Optional name for debugging and profiling
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Decides on which rounds a scheduled system runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunCriteria {
    /// Every round.
    Always,
    /// Rounds where `round % n == 0`.
    EveryNRounds(u64),
}

impl RunCriteria {
    pub fn should_run(&self, round: u64) -> bool {
        match *self {
            RunCriteria::Always => true,
            // Zero is rejected by config validation; treat it as "never" here.
            RunCriteria::EveryNRounds(0) => false,
            RunCriteria::EveryNRounds(n) => round % n == 0,
        }
    }
}

/// Adapts a closure into a [`System`].
pub struct FnSystem<F> {
    name: &'static str,
    func: F,
}

pub fn fn_system<F>(name: &'static str, func: F) -> FnSystem<F>
where
    F: FnMut(&mut World) + Send + Sync,
{
    FnSystem { name, func }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut World) + Send + Sync,
{
    fn run(&mut self, world: &mut World) {
        (self.func)(world)
    }

    fn name(&self) -> &str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_n_rounds() {
        let criteria = RunCriteria::EveryNRounds(3);
        let hits: Vec<u64> = (1..=10).filter(|r| criteria.should_run(*r)).collect();
        assert_eq!(hits, vec![3, 6, 9]);
        assert!(RunCriteria::Always.should_run(7));
        assert!(!RunCriteria::EveryNRounds(0).should_run(0));
    }
}
