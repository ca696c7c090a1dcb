//! Read-only view of a completed round, handed to renderers and transports.

use std::sync::Arc;

use leach_core::{RoundCounter, SimTime, World};
use serde::{Deserialize, Serialize};

use crate::node::{NodeId, SensorNode};
use crate::resources::{ActiveTransmissions, ClusterHeads, CurrentSimulationState, SensorField};
use crate::transmission::Transmission;

/// Aggregate network health for dashboards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    /// Awake, healthy nodes.
    pub active: usize,
    pub sleeping: usize,
    pub faulty: usize,
    pub depleted: usize,
    pub cluster_heads: usize,
    pub mean_battery: f64,
    pub total_data_collected: f64,
    pub transmissions_in_flight: usize,
}

impl NetworkStats {
    pub fn collect(nodes: &[SensorNode], transmissions: &[Transmission]) -> Self {
        let mut stats = NetworkStats {
            transmissions_in_flight: transmissions.iter().filter(|t| !t.is_complete()).count(),
            ..NetworkStats::default()
        };
        for node in nodes {
            if !node.sleeping && !node.is_faulty {
                stats.active += 1;
            }
            if node.sleeping {
                stats.sleeping += 1;
            }
            if node.is_faulty {
                stats.faulty += 1;
            }
            if node.is_depleted() {
                stats.depleted += 1;
            }
            if node.is_cluster_head() {
                stats.cluster_heads += 1;
            }
            stats.mean_battery += node.battery;
            stats.total_data_collected += node.data_collected;
        }
        if !nodes.is_empty() {
            stats.mean_battery /= nodes.len() as f64;
        }
        stats
    }
}

/// Complete simulation state after a round.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    /// The next round to run.
    pub round: u64,
    pub elapsed_seconds: f64,
    pub nodes: Vec<SensorNode>,
    pub transmissions: Vec<Transmission>,
    pub cluster_head_ids: Vec<NodeId>,
    pub stats: NetworkStats,
}

impl SimulationSnapshot {
    /// Copies the current state out of the world.
    pub fn capture(world: &World) -> Self {
        let nodes = world.resource::<SensorField>().nodes.clone();
        let transmissions = world.resource::<ActiveTransmissions>().0.clone();
        let cluster_head_ids = world
            .get_resource::<ClusterHeads>()
            .map(|heads| heads.ids.to_vec())
            .unwrap_or_default();
        let stats = NetworkStats::collect(&nodes, &transmissions);

        SimulationSnapshot {
            round: world.get_resource::<RoundCounter>().map_or(1, RoundCounter::current),
            elapsed_seconds: world.get_resource::<SimTime>().map_or(0.0, SimTime::now),
            nodes,
            transmissions,
            cluster_head_ids,
            stats,
        }
    }

    /// Looks up a node for inspection.
    pub fn select_node(&self, id: NodeId) -> Option<&SensorNode> {
        self.nodes.iter().find(|node| node.id == id)
    }
}

/// Captures a fresh snapshot and swaps it into [`CurrentSimulationState`].
/// Runs after the round counter has advanced, so readers only ever see
/// whole rounds.
pub fn update_current_simulation_state(world: &mut World) -> Arc<SimulationSnapshot> {
    let snapshot = Arc::new(SimulationSnapshot::capture(world));
    world.insert_resource(CurrentSimulationState(Arc::clone(&snapshot)));
    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::test_support::node;
    use crate::node::NodeStatus;

    #[test]
    fn stats_count_each_category() {
        let mut nodes: Vec<SensorNode> = (1..=5).map(|i| node(i, 0.0, 0.0)).collect();
        nodes[0].status = NodeStatus::ClusterHead;
        nodes[1].sleeping = true;
        nodes[2].is_faulty = true;
        nodes[3].battery = 0.0;
        nodes[4].data_collected = 4.0;

        let stats = NetworkStats::collect(&nodes, &[]);
        assert_eq!(stats.active, 3);
        assert_eq!(stats.sleeping, 1);
        assert_eq!(stats.faulty, 1);
        assert_eq!(stats.depleted, 1);
        assert_eq!(stats.cluster_heads, 1);
        assert_eq!(stats.mean_battery, 80.0);
        assert_eq!(stats.total_data_collected, 4.0);
    }

    #[test]
    fn capture_and_select() {
        let mut world = World::new();
        world.insert_resource(SensorField::new(vec![node(1, 1.0, 1.0), node(2, 2.0, 2.0)]));
        world.init_resource::<ActiveTransmissions>();

        let snapshot = update_current_simulation_state(&mut world);
        assert_eq!(snapshot.round, 1);
        assert!(snapshot.cluster_head_ids.is_empty());
        assert_eq!(snapshot.select_node(NodeId(2)).map(|n| n.id), Some(NodeId(2)));
        assert!(snapshot.select_node(NodeId(9)).is_none());
        assert!(Arc::ptr_eq(&world.resource::<CurrentSimulationState>().0, &snapshot));
    }
}
