//! LEACH wireless sensor network simulation.
//!
//! Nodes are placed on a jittered grid, drain their batteries on a sine
//! duty cycle, periodically elect cluster heads and send packets to their
//! head or, for heads, to the base station. Each component is a
//! [`leach_core::System`] over shared world resources; [`Simulation`] wires
//! them together and [`SimulationDriver`] runs them on a timer.

pub mod app;
pub mod driver;
pub mod election;
pub mod energy;
pub mod field;
pub mod invariants;
pub mod node;
pub mod resources;
pub mod snapshot;
pub mod transmission;

pub use app::Simulation;
pub use driver::{DriverError, DriverHandle, RoundEvent, SimulationDriver, SnapshotHandle};
pub use election::{ClusterHeadSelector, Election};
pub use energy::EnergyModel;
pub use node::{BatteryLevel, NodeId, NodeStatus, SensorNode, SensorSample};
pub use resources::{ActiveTransmissions, ClusterHeads, CurrentSimulationState, SensorField, SimRng};
pub use snapshot::{NetworkStats, SimulationSnapshot};
pub use transmission::{Endpoint, Transmission, TransmissionId, TransmissionKind, TransmissionSimulator};
