//! Sensor node state.

use std::collections::VecDeque;
use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Identifier of a sensor node, assigned `1..=N` at field generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeStatus {
    Active,
    ClusterHead,
}

/// Coarse battery bucket used by dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BatteryLevel {
    High,
    Medium,
    Low,
}

/// One entry of a node's sliding history window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    /// Simulation time in seconds.
    pub time: f64,
    pub energy: f64,
    pub temperature: f64,
    pub humidity: f64,
}

/// A simulated battery-powered sensor.
///
/// `id`, `position`, `is_faulty` and `sleep_phase` are fixed at creation.
/// Everything else is rewritten by the energy model and the cluster head
/// selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorNode {
    pub id: NodeId,
    pub position: Vec2,
    /// Remaining charge in `[0, 100]`. Never increases.
    pub battery: f64,
    pub status: NodeStatus,
    pub sleeping: bool,
    pub is_faulty: bool,
    pub temperature: f64,
    pub humidity: f64,
    /// Assigned cluster head. `None` for heads and for unassigned nodes.
    pub cluster_head: Option<NodeId>,
    pub data_collected: f64,
    pub last_transmission_time: f64,
    /// Offset into the duty-cycle sine wave.
    pub sleep_phase: f64,
    pub history: VecDeque<SensorSample>,
}

impl SensorNode {
    pub const FULL_BATTERY: f64 = 100.0;

    pub fn is_cluster_head(&self) -> bool {
        self.status == NodeStatus::ClusterHead
    }

    pub fn is_depleted(&self) -> bool {
        self.battery <= 0.0
    }

    pub fn battery_level(&self) -> BatteryLevel {
        if self.battery > 60.0 {
            BatteryLevel::High
        } else if self.battery > 30.0 {
            BatteryLevel::Medium
        } else {
            BatteryLevel::Low
        }
    }

    pub fn distance_to(&self, point: Vec2) -> f32 {
        self.position.distance(point)
    }

    /// Appends a sample and drops the oldest ones beyond `capacity`.
    pub fn record_sample(&mut self, sample: SensorSample, capacity: usize) {
        self.history.push_back(sample);
        while self.history.len() > capacity {
            self.history.pop_front();
        }
    }
}
