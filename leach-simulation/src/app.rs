use std::sync::Arc;

use leach_config::{ConfigError, SimulationConfig};
use leach_core::{RoundCounter, RoundReport, RunCriteria, Scheduler, SimTime, World};
use log::info;

use crate::election::ClusterHeadSelector;
use crate::energy::EnergyModel;
use crate::field::generate_field;
use crate::invariants;
use crate::node::{NodeId, SensorNode};
use crate::resources::{
    ActiveTransmissions, CurrentSimulationState, SensorField, SimRng, SimulationConfigResource,
};
use crate::snapshot::{update_current_simulation_state, SimulationSnapshot};
use crate::transmission::TransmissionSimulator;

/// A complete LEACH simulation: the world, its systems and the seed that
/// reproduces it.
///
/// `tick` is the only writer. Readers go through [`Simulation::snapshot`],
/// which always reflects a whole round.
pub struct Simulation {
    world: World,
    scheduler: Scheduler,
    seed: u64,
}

impl Simulation {
    /// Builds a simulation from `config`, seeding from `schedule.seed` or
    /// from entropy when none is configured.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        let seed = match config.schedule.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::random::<u64>();
                info!("no seed configured, drew {} from entropy", seed);
                seed
            }
        };
        Self::with_seed(config, seed)
    }

    /// Generates the field, runs the start-up election and publishes the
    /// first snapshot.
    pub fn with_seed(config: SimulationConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        info!("starting simulation with seed {}", seed);

        let mut rng = SimRng::seeded(seed);
        let nodes = generate_field(&config.field, &config.sensing, &mut rng.0);
        info!(
            "generated {} sensor nodes ({} faulty) on a {}x{} field",
            nodes.len(),
            nodes.iter().filter(|node| node.is_faulty).count(),
            config.field.grid_size,
            config.field.grid_size
        );

        let mut scheduler = Scheduler::new();
        scheduler
            .add_system(EnergyModel)
            .add_system_with(
                TransmissionSimulator,
                RunCriteria::EveryNRounds(config.transmission.interval),
            )
            .add_system_with(
                ClusterHeadSelector,
                RunCriteria::EveryNRounds(config.clusters.election_interval),
            );

        let mut world = World::new();
        world.insert_resource(RoundCounter::default());
        world.insert_resource(SimTime::new(config.round_period().as_secs_f64()));
        world.insert_resource(SensorField::new(nodes));
        world.init_resource::<ActiveTransmissions>();
        world.insert_resource(rng);
        world.insert_resource(SimulationConfigResource(config));

        ClusterHeadSelector::elect(&mut world, 0);
        update_current_simulation_state(&mut world);

        Ok(Self { world, scheduler, seed })
    }

    /// Runs one round and publishes its snapshot.
    pub fn tick(&mut self) -> RoundReport {
        let previous = self.snapshot();
        let report = self.scheduler.execute_once(&mut self.world);
        let current = update_current_simulation_state(&mut self.world);

        if cfg!(debug_assertions) {
            invariants::check_round(&previous, &current, self.config().sensing.history_len);
        }
        report
    }

    /// Runs `rounds` ticks back to back and returns the final snapshot.
    pub fn run_rounds(&mut self, rounds: u64) -> Arc<SimulationSnapshot> {
        for _ in 0..rounds {
            self.tick();
        }
        self.snapshot()
    }

    /// State as of the last completed round.
    pub fn snapshot(&self) -> Arc<SimulationSnapshot> {
        Arc::clone(&self.world.resource::<CurrentSimulationState>().0)
    }

    pub fn select_node(&self, id: NodeId) -> Option<SensorNode> {
        self.world.resource::<SensorField>().get(id).cloned()
    }

    /// The next round to run.
    pub fn round(&self) -> u64 {
        self.world.resource::<RoundCounter>().current()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.world.resource::<SimulationConfigResource>().0
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Direct access for tooling and tests. Changes show up in the next
    /// snapshot.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ClusterHeads;

    fn config() -> SimulationConfig {
        SimulationConfig::default()
    }

    #[test]
    fn start_up_elects_and_publishes_round_one() {
        let simulation = Simulation::with_seed(config(), 42).unwrap();
        let snapshot = simulation.snapshot();

        assert_eq!(simulation.round(), 1);
        assert_eq!(snapshot.round, 1);
        assert_eq!(snapshot.nodes.len(), 30);
        assert_eq!(snapshot.elapsed_seconds, 0.0);
        assert_eq!(simulation.world().resource::<ClusterHeads>().elected_round, 0);
        assert_eq!(snapshot.cluster_head_ids.len(), snapshot.stats.cluster_heads);
        assert!(snapshot.transmissions.is_empty());
    }

    #[test]
    fn tick_follows_round_cadence() {
        let mut simulation = Simulation::with_seed(config(), 7).unwrap();
        let names: Vec<Vec<String>> = (0..10).map(|_| simulation.tick().systems_run).collect();

        assert_eq!(names[0], vec!["energy_model"]);
        assert_eq!(names[2], vec!["energy_model", "transmission_simulator"]);
        assert_eq!(names[9], vec!["energy_model", "cluster_head_selector"]);
        assert_eq!(simulation.round(), 11);
        assert_eq!(simulation.snapshot().elapsed_seconds, 10.0);
        assert_eq!(simulation.world().resource::<ClusterHeads>().elected_round, 10);
    }

    #[test]
    fn select_node_is_a_pure_lookup() {
        let mut simulation = Simulation::with_seed(config(), 3).unwrap();
        simulation.run_rounds(2);
        let before = simulation.snapshot();

        let node = simulation.select_node(NodeId(5)).unwrap();
        assert_eq!(Some(&node), before.select_node(NodeId(5)));
        assert!(simulation.select_node(NodeId(31)).is_none());
        assert!(Arc::ptr_eq(&before, &simulation.snapshot()));
    }

    #[test]
    fn configured_seed_is_used() {
        let mut config = config();
        config.schedule.seed = Some(99);
        let simulation = Simulation::new(config).unwrap();
        assert_eq!(simulation.seed(), 99);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = config();
        config.field.node_count = 0;
        assert!(matches!(Simulation::with_seed(config, 1), Err(ConfigError::Validation(_))));
    }
}
