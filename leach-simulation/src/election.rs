//! Cluster head election and nearest-head assignment.

use glam::Vec2;
use leach_config::ClusterSettings;
use leach_core::{RoundCounter, System, World};
use log::{debug, warn};
use ordered_float::OrderedFloat;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::node::{NodeId, NodeStatus, SensorNode};
use crate::resources::{ClusterHeads, HeadSet, SensorField, SimRng, SimulationConfigResource};

/// Outcome of a single election.
#[derive(Debug, Clone, PartialEq)]
pub struct Election {
    /// Elected heads in draw order.
    pub heads: HeadSet,
    /// Number of nodes that passed the eligibility filter.
    pub eligible: usize,
}

/// A node may lead a cluster when it is healthy and above the battery threshold.
pub fn is_eligible(node: &SensorNode, settings: &ClusterSettings) -> bool {
    node.battery > settings.eligibility_threshold && !node.is_faulty
}

/// The head closest to `position`. On equal distance the head listed first wins.
/// Returns `None` when `heads` is empty.
pub fn nearest_head(position: Vec2, heads: &[(NodeId, Vec2)]) -> Option<NodeId> {
    heads
        .iter()
        .min_by_key(|(_, head)| OrderedFloat(position.distance_squared(*head)))
        .map(|(id, _)| *id)
}

/// Elects up to `cluster_count` heads uniformly at random from the eligible
/// pool, then points every other node at its nearest head.
///
/// Newly elected heads are woken up. With no eligible nodes the election
/// yields no heads and every node is left unassigned.
pub fn select_cluster_heads<R: Rng + ?Sized>(
    nodes: &mut [SensorNode],
    settings: &ClusterSettings,
    rng: &mut R,
) -> Election {
    let mut pool: Vec<NodeId> = nodes
        .iter()
        .filter(|node| is_eligible(node, settings))
        .map(|node| node.id)
        .collect();
    let eligible = pool.len();
    pool.shuffle(rng);
    pool.truncate(settings.cluster_count);
    let heads: HeadSet = pool.into_iter().collect();

    for node in nodes.iter_mut() {
        node.cluster_head = None;
        if heads.contains(&node.id) {
            node.status = NodeStatus::ClusterHead;
            node.sleeping = false;
        } else {
            node.status = NodeStatus::Active;
        }
    }

    // Enumerated in field order, which fixes the tie-break.
    let head_positions: Vec<(NodeId, Vec2)> = nodes
        .iter()
        .filter(|node| node.is_cluster_head())
        .map(|node| (node.id, node.position))
        .collect();

    if !head_positions.is_empty() {
        for node in nodes.iter_mut().filter(|node| !node.is_cluster_head()) {
            node.cluster_head = nearest_head(node.position, &head_positions);
        }
    }

    Election { heads, eligible }
}

/// System that re-runs the election and records the result in [`ClusterHeads`].
#[derive(Default)]
pub struct ClusterHeadSelector;

impl ClusterHeadSelector {
    /// Runs an election against the world's current field. Also used for
    /// the start-up election, before any round has run.
    pub fn elect(world: &mut World, round: u64) -> Election {
        let settings = world.resource::<SimulationConfigResource>().0.clusters.clone();

        let election = world.resource_scope(|world, field: &mut SensorField| {
            let rng = &mut world.resource_mut::<SimRng>().0;
            select_cluster_heads(&mut field.nodes, &settings, rng)
        });

        if election.heads.is_empty() {
            warn!("round {}: no eligible cluster heads, every node left unassigned", round);
        } else if election.heads.len() < settings.cluster_count {
            warn!(
                "round {}: only {} of {} cluster heads could be elected",
                round,
                election.heads.len(),
                settings.cluster_count
            );
        }
        debug!(
            "round {}: elected {:?} from {} eligible nodes",
            round, election.heads, election.eligible
        );

        world.insert_resource(ClusterHeads {
            ids: election.heads.clone(),
            eligible: election.eligible,
            elected_round: round,
        });
        election
    }
}

impl System for ClusterHeadSelector {
    fn run(&mut self, world: &mut World) {
        let round = world.resource::<RoundCounter>().current();
        Self::elect(world, round);
    }

    fn name(&self) -> &str {
        "cluster_head_selector"
    }
}
