use std::time::{Duration, Instant};

use log::trace;

use crate::round::{RoundCounter, SimTime};
use crate::system::{RunCriteria, System};
use crate::World;

struct ScheduledSystem {
    system: Box<dyn System>,
    criteria: RunCriteria,
}

/// Outcome of one [`Scheduler::execute_once`] call.
#[derive(Debug, Clone)]
pub struct RoundReport {
    /// The round that was executed.
    pub round: u64,
    /// Names of the systems that ran, in execution order.
    pub systems_run: Vec<String>,
    pub duration: Duration,
}

/// Runs systems in registration order, one round at a time.
///
/// Each round: the [`SimTime`] clock moves to the round, every system whose
/// [`RunCriteria`] matches the round runs to completion, and the
/// [`RoundCounter`] advances. Rounds never overlap.
#[derive(Default)]
pub struct Scheduler {
    systems: Vec<ScheduledSystem>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a system that runs every round
    pub fn add_system<T: System + 'static>(&mut self, system: T) -> &mut Self {
        self.add_system_with(system, RunCriteria::Always)
    }

    /// Add a system gated by `criteria`
    pub fn add_system_with<T: System + 'static>(&mut self, system: T, criteria: RunCriteria) -> &mut Self {
        self.systems.push(ScheduledSystem {
            system: Box::new(system),
            criteria,
        });
        self
    }

    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Execute one round.
    ///
    /// Inserts default `RoundCounter`/`SimTime` resources if the world has
    /// none yet.
    pub fn execute_once(&mut self, world: &mut World) -> RoundReport {
        let start = Instant::now();

        world.init_resource::<RoundCounter>();
        world.init_resource::<SimTime>();
        let round = world.resource::<RoundCounter>().current();
        world.resource_mut::<SimTime>().set_round(round);

        let mut systems_run = Vec::new();
        for scheduled in &mut self.systems {
            if !scheduled.criteria.should_run(round) {
                continue;
            }
            let system_start = Instant::now();
            scheduled.system.run(world);
            trace!(
                "round {}: {} took {:?}",
                round,
                scheduled.system.name(),
                system_start.elapsed()
            );
            systems_run.push(scheduled.system.name().to_string());
        }

        world.resource_mut::<RoundCounter>().advance();

        RoundReport {
            round,
            systems_run,
            duration: start.elapsed(),
        }
    }
}
