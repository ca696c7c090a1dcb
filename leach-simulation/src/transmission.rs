//! Simulated data packets flowing to cluster heads and the base station.

use std::collections::HashMap;

use glam::Vec2;
use leach_config::TransmissionSettings;
use leach_core::{RoundCounter, System, World};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::node::{NodeId, SensorNode};
use crate::resources::{ActiveTransmissions, SensorField, SimulationConfigResource};

/// Progress within this distance of 1 counts as delivered.
const COMPLETION_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransmissionKind {
    ToCluster,
    ToBase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endpoint {
    Node(NodeId),
    BaseStation,
}

/// Identity of a packet: the round it was emitted in plus its route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransmissionId {
    pub round: u64,
    pub source: NodeId,
    pub destination: Endpoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transmission {
    pub id: TransmissionId,
    pub from: Vec2,
    pub to: Vec2,
    pub kind: TransmissionKind,
    /// Delivery progress in `[0, 1]`.
    pub progress: f64,
}

impl Transmission {
    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0 - COMPLETION_EPSILON
    }

    /// Moves the packet forward by `step`, snapping to exactly 1 on arrival.
    pub fn advance(&mut self, step: f64) {
        self.progress += step;
        if self.is_complete() {
            self.progress = 1.0;
        }
    }

    /// Where the packet is drawn along its straight-line route.
    pub fn position_at_progress(&self) -> Vec2 {
        self.from.lerp(self.to, self.progress as f32)
    }
}

/// Counts from one transmission cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub spawned: usize,
    pub pruned: usize,
    pub active: usize,
}

/// A node may send while awake, healthy and above the battery floor.
pub fn can_transmit(node: &SensorNode, settings: &TransmissionSettings) -> bool {
    !node.sleeping && !node.is_faulty && node.battery > settings.min_battery
}

/// Packets emitted by the current node snapshot.
///
/// Heads send to the base station; members send to their assigned head.
/// A member whose assignment does not resolve to a current head sends nothing.
pub fn spawn_transmissions(nodes: &[SensorNode], round: u64, settings: &TransmissionSettings) -> Vec<Transmission> {
    let heads: HashMap<NodeId, Vec2> = nodes
        .iter()
        .filter(|node| node.is_cluster_head())
        .map(|node| (node.id, node.position))
        .collect();
    let base_station = Vec2::new(settings.base_station.x, settings.base_station.y);

    nodes
        .iter()
        .filter(|node| can_transmit(node, settings))
        .filter_map(|node| {
            let (destination, to, kind) = if node.is_cluster_head() {
                (Endpoint::BaseStation, base_station, TransmissionKind::ToBase)
            } else {
                let head = node.cluster_head?;
                let position = heads.get(&head)?;
                (Endpoint::Node(head), *position, TransmissionKind::ToCluster)
            };
            Some(Transmission {
                id: TransmissionId { round, source: node.id, destination },
                from: node.position,
                to,
                kind,
                progress: 0.0,
            })
        })
        .collect()
}

/// Drops delivered packets, appends the new ones and advances everything
/// that remains by `step`.
pub fn advance_transmissions(active: &mut Vec<Transmission>, spawned: Vec<Transmission>, step: f64) -> CycleReport {
    let before = active.len();
    active.retain(|transmission| !transmission.is_complete());
    let pruned = before - active.len();

    let spawned_count = spawned.len();
    active.extend(spawned);
    for transmission in active.iter_mut() {
        transmission.advance(step);
    }

    CycleReport {
        spawned: spawned_count,
        pruned,
        active: active.len(),
    }
}

/// System that runs one transmission cycle against the current field.
#[derive(Default)]
pub struct TransmissionSimulator;

impl System for TransmissionSimulator {
    fn run(&mut self, world: &mut World) {
        let round = world.resource::<RoundCounter>().current();
        let settings = world.resource::<SimulationConfigResource>().0.transmission.clone();
        let spawned = spawn_transmissions(&world.resource::<SensorField>().nodes, round, &settings);

        let active = &mut world.resource_mut::<ActiveTransmissions>().0;
        let report = advance_transmissions(active, spawned, settings.progress_step);
        debug!(
            "round {}: {} packets spawned, {} delivered and pruned, {} in flight",
            round, report.spawned, report.pruned, report.active
        );
    }

    fn name(&self) -> &str {
        "transmission_simulator"
    }
}
