//! Development-time checks run after every round.
//!
//! Any failure here is a defect in one of the systems, so the checks are
//! `debug_assert!`s and the caller only runs them in debug builds.

use crate::node::SensorNode;
use crate::snapshot::SimulationSnapshot;

/// Checks `current` on its own and against the round before it.
pub fn check_round(previous: &SimulationSnapshot, current: &SimulationSnapshot, history_len: usize) {
    for node in &current.nodes {
        debug_assert!(
            !(node.is_cluster_head() && node.sleeping),
            "{} is a cluster head but asleep",
            node.id
        );
        debug_assert!(
            (0.0..=SensorNode::FULL_BATTERY).contains(&node.battery),
            "{} battery {} out of range",
            node.id,
            node.battery
        );
        debug_assert!(node.history.len() <= history_len, "{} history overflow", node.id);
        debug_assert!(
            node.history.iter().zip(node.history.iter().skip(1)).all(|(a, b)| a.time <= b.time),
            "{} history out of order",
            node.id
        );
    }

    for (before, after) in previous.nodes.iter().zip(&current.nodes) {
        debug_assert_eq!(before.id, after.id);
        debug_assert!(
            after.battery <= before.battery,
            "{} battery rose from {} to {}",
            after.id,
            before.battery,
            after.battery
        );
    }

    for transmission in &current.transmissions {
        debug_assert!((0.0..=1.0).contains(&transmission.progress));
    }

    check_assignments(&current.nodes);
}

/// Every member points at a current head, and no head is closer.
fn check_assignments(nodes: &[SensorNode]) {
    let heads: Vec<&SensorNode> = nodes.iter().filter(|node| node.is_cluster_head()).collect();

    for node in nodes {
        if node.is_cluster_head() || heads.is_empty() {
            debug_assert!(node.cluster_head.is_none(), "{} should be unassigned", node.id);
            continue;
        }
        let assigned = node
            .cluster_head
            .and_then(|id| heads.iter().find(|head| head.id == id));
        debug_assert!(assigned.is_some(), "{} has no current head", node.id);
        if let Some(assigned) = assigned {
            let best = heads
                .iter()
                .map(|head| node.position.distance_squared(head.position))
                .fold(f32::INFINITY, f32::min);
            debug_assert!(node.position.distance_squared(assigned.position) <= best);
        }
    }
}
