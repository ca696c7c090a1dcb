//! Per-round battery drain, duty cycling and sensor drift.

use leach_config::{EnergySettings, SensingSettings};
use leach_core::{RoundCounter, SimTime, System, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::node::{SensorNode, SensorSample};
use crate::resources::{SensorField, SimRng, SimulationConfigResource};

/// Whether the duty cycle puts a node with `phase` to sleep in `round`,
/// ignoring its role.
pub fn duty_cycle_sleeps(round: u64, phase: f64, settings: &EnergySettings) -> bool {
    (round as f64 / settings.sleep_phase_divisor + phase).sin() > settings.sleep_threshold
}

/// Battery cost of one round for a node in the given state.
pub fn energy_drain(is_cluster_head: bool, sleeping: bool, settings: &EnergySettings) -> f64 {
    if is_cluster_head {
        settings.cluster_head_drain
    } else if sleeping {
        settings.sleeping_drain
    } else {
        settings.awake_drain
    }
}

/// Advances one node by one round.
///
/// Cluster heads never sleep. Battery floors at 0. Data is only collected,
/// and the transmission time only refreshed, while awake. The fresh reading
/// is appended to the history window.
pub fn update_node<R: Rng + ?Sized>(
    node: &mut SensorNode,
    round: u64,
    now: f64,
    energy: &EnergySettings,
    sensing: &SensingSettings,
    rng: &mut R,
) {
    let is_head = node.is_cluster_head();
    node.sleeping = !is_head && duty_cycle_sleeps(round, node.sleep_phase, energy);
    node.battery = (node.battery - energy_drain(is_head, node.sleeping, energy)).max(0.0);

    node.temperature += (rng.gen::<f64>() - 0.5) * 2.0 * sensing.temperature_step;
    node.humidity += (rng.gen::<f64>() - 0.5) * 2.0 * sensing.humidity_step;

    if !node.sleeping {
        node.data_collected += rng.gen::<f64>() * sensing.max_data_per_round;
        node.last_transmission_time = now;
    }

    let sample = SensorSample {
        time: now,
        energy: node.battery,
        temperature: node.temperature,
        humidity: node.humidity,
    };
    node.record_sample(sample, sensing.history_len);
}

/// System that runs [`update_node`] over the whole field.
///
/// Nodes are independent, so the update runs on the rayon pool. Each node
/// gets its own generator seeded from the shared [`SimRng`] in id order,
/// which keeps seeded runs identical regardless of thread scheduling.
#[derive(Default)]
pub struct EnergyModel;

impl System for EnergyModel {
    fn run(&mut self, world: &mut World) {
        let round = world.resource::<RoundCounter>().current();
        let now = world.resource::<SimTime>().now();

        world.resource_scope(|world, field: &mut SensorField| {
            let seeds: Vec<u64> = {
                let rng = &mut world.resource_mut::<SimRng>().0;
                field.nodes.iter().map(|_| rng.gen()).collect()
            };
            let config = &world.resource::<SimulationConfigResource>().0;
            let (energy, sensing) = (&config.energy, &config.sensing);

            field
                .nodes
                .par_iter_mut()
                .zip(seeds.par_iter())
                .for_each(|(node, seed)| {
                    let mut rng = StdRng::seed_from_u64(*seed);
                    update_node(node, round, now, energy, sensing, &mut rng);
                });
        });
    }

    fn name(&self) -> &str {
        "energy_model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::test_support::node;
    use crate::node::NodeStatus;

    fn settings() -> (EnergySettings, SensingSettings) {
        (EnergySettings::default(), SensingSettings::default())
    }

    /// First round >= `from` in which a node with `phase` is (or is not) due to sleep.
    fn round_where(phase: f64, sleeps: bool, from: u64) -> u64 {
        let energy = EnergySettings::default();
        (from..from + 200)
            .find(|r| duty_cycle_sleeps(*r, phase, &energy) == sleeps)
            .unwrap()
    }

    #[test]
    fn awake_node_drains_one_unit_then_floors_at_zero() {
        let (energy, sensing) = settings();
        let mut rng = StdRng::seed_from_u64(1);
        let mut n = node(1, 10.0, 10.0);
        n.battery = 1.5;

        let round = round_where(n.sleep_phase, false, 1);
        update_node(&mut n, round, 1.0, &energy, &sensing, &mut rng);
        assert!(!n.sleeping);
        assert_eq!(n.battery, 0.5);

        let round = round_where(n.sleep_phase, false, round + 1);
        update_node(&mut n, round, 2.0, &energy, &sensing, &mut rng);
        assert_eq!(n.battery, 0.0);
    }

    #[test]
    fn sleeping_node_drains_a_fifth() {
        let (energy, sensing) = settings();
        let mut rng = StdRng::seed_from_u64(2);
        let mut n = node(1, 10.0, 10.0);
        n.data_collected = 3.0;
        n.last_transmission_time = -5.0;

        let round = round_where(n.sleep_phase, true, 1);
        update_node(&mut n, round, 7.0, &energy, &sensing, &mut rng);

        assert!(n.sleeping);
        assert!((n.battery - 99.8).abs() < 1e-9);
        assert_eq!(n.data_collected, 3.0);
        assert_eq!(n.last_transmission_time, -5.0);
    }

    #[test]
    fn cluster_head_never_sleeps_and_drains_double() {
        let (energy, sensing) = settings();
        let mut rng = StdRng::seed_from_u64(3);
        let mut n = node(1, 10.0, 10.0);
        n.status = NodeStatus::ClusterHead;

        let round = round_where(n.sleep_phase, true, 1);
        update_node(&mut n, round, 4.0, &energy, &sensing, &mut rng);

        assert!(!n.sleeping);
        assert_eq!(n.battery, 98.0);
        assert_eq!(n.last_transmission_time, 4.0);
    }

    #[test]
    fn drift_stays_within_step_and_history_keeps_window() {
        let (energy, sensing) = settings();
        let mut rng = StdRng::seed_from_u64(4);
        let mut n = node(1, 10.0, 10.0);

        for round in 1..=40 {
            let (t, h) = (n.temperature, n.humidity);
            update_node(&mut n, round, round as f64, &energy, &sensing, &mut rng);
            assert!((n.temperature - t).abs() <= 0.25);
            assert!((n.humidity - h).abs() <= 1.0);
            assert!(n.history.len() <= 10);
        }

        assert_eq!(n.history.len(), 10);
        let times: Vec<f64> = n.history.iter().map(|s| s.time).collect();
        assert_eq!(times, (31..=40).map(|r| r as f64).collect::<Vec<_>>());
        let last = n.history.back().copied().unwrap();
        assert_eq!(last.energy, n.battery);
        assert_eq!(last.temperature, n.temperature);
    }

    #[test]
    fn awake_collection_is_bounded() {
        let (energy, sensing) = settings();
        let mut rng = StdRng::seed_from_u64(5);
        let mut n = node(1, 10.0, 10.0);

        let round = round_where(n.sleep_phase, false, 1);
        update_node(&mut n, round, 1.0, &energy, &sensing, &mut rng);
        assert!((0.0..5.0).contains(&n.data_collected));
    }

    #[test]
    fn system_is_deterministic_for_a_seed() {
        use leach_config::SimulationConfig;
        use leach_core::Scheduler;

        let run = |seed: u64| {
            let mut world = World::new();
            world.insert_resource(SimulationConfigResource(SimulationConfig::default()));
            world.insert_resource(SimRng::seeded(seed));
            world.insert_resource(SensorField::new((1..=16).map(|i| node(i, i as f32, 0.0)).collect()));
            let mut scheduler = Scheduler::new();
            scheduler.add_system(EnergyModel);
            for _ in 0..5 {
                scheduler.execute_once(&mut world);
            }
            world.remove_resource::<SensorField>().unwrap().nodes
        };

        assert_eq!(run(11), run(11));
        assert_ne!(run(11), run(12));
    }
}
