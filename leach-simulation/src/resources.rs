use std::sync::Arc;

use leach_config::SimulationConfig;
use leach_core::Resource;
use rand::rngs::StdRng;
use rand::SeedableRng;
use smallvec::SmallVec;

use crate::node::{NodeId, SensorNode};
use crate::snapshot::SimulationSnapshot;
use crate::transmission::Transmission;

/// Elected heads rarely exceed a handful.
pub type HeadSet = SmallVec<[NodeId; 8]>;

/// SimulationConfig as a resource for systems
#[derive(Resource, Debug, Clone)]
pub struct SimulationConfigResource(pub SimulationConfig);

/// The fixed population of sensor nodes, in id order.
#[derive(Resource, Debug, Clone, Default)]
pub struct SensorField {
    pub nodes: Vec<SensorNode>,
}

impl SensorField {
    pub fn new(nodes: Vec<SensorNode>) -> Self {
        Self { nodes }
    }

    pub fn get(&self, id: NodeId) -> Option<&SensorNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SensorNode> {
        self.nodes.iter_mut().find(|node| node.id == id)
    }
}

/// Packets currently travelling towards a cluster head or the base station.
#[derive(Resource, Debug, Clone, Default)]
pub struct ActiveTransmissions(pub Vec<Transmission>);

/// Result of the most recent election.
#[derive(Resource, Debug, Clone, Default)]
pub struct ClusterHeads {
    pub ids: HeadSet,
    /// Size of the eligibility pool at election time.
    pub eligible: usize,
    /// Round the election ran in; 0 for the election at start-up.
    pub elected_round: u64,
}

/// The single random source every system draws from.
#[derive(Resource, Debug, Clone)]
pub struct SimRng(pub StdRng);

impl SimRng {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

/// Snapshot of the last completed round, swapped in whole after each tick.
#[derive(Resource, Debug, Clone, Default)]
pub struct CurrentSimulationState(pub Arc<SimulationSnapshot>);
