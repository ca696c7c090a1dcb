//! Streams simulation snapshots to an external renderer.

mod serializer;
mod sender;

use leach_config::{SenderType, SerializerType, TransportSettings};
use leach_simulation::{BatteryLevel, NetworkStats, NodeId, NodeStatus, SimulationSnapshot, TransmissionKind};
use log::debug;
use serde::{Deserialize, Serialize};

pub use self::sender::{FileSender, NullSender, Sender, StdioSender, TransportError};
pub use self::serializer::{
    BinarySerializer, JsonSerializer, NullSerializer, SerializationError, SerializeObject, Serializer,
};

/// Node as drawn by the renderer.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NodeFrame {
    pub id: NodeId,
    pub x: f32,
    pub y: f32,
    pub battery: f64,
    pub battery_level: BatteryLevel,
    pub status: NodeStatus,
    pub sleeping: bool,
    pub is_faulty: bool,
    pub cluster_head: Option<NodeId>,
}

/// A packet at its current interpolated position.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PacketFrame {
    pub source: NodeId,
    pub kind: TransmissionKind,
    pub x: f32,
    pub y: f32,
    pub progress: f64,
}

/// Wire format of one published round.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedFrame {
    pub round: u64,
    pub elapsed_seconds: f64,
    pub cluster_head_ids: Vec<NodeId>,
    pub nodes: Vec<NodeFrame>,
    pub packets: Vec<PacketFrame>,
    pub stats: NetworkStats,
}

impl FeedFrame {
    pub fn from_snapshot(snapshot: &SimulationSnapshot) -> Self {
        let nodes = snapshot
            .nodes
            .iter()
            .map(|node| NodeFrame {
                id: node.id,
                x: node.position.x,
                y: node.position.y,
                battery: node.battery,
                battery_level: node.battery_level(),
                status: node.status,
                sleeping: node.sleeping,
                is_faulty: node.is_faulty,
                cluster_head: node.cluster_head,
            })
            .collect();
        let packets = snapshot
            .transmissions
            .iter()
            .map(|transmission| {
                let position = transmission.position_at_progress();
                PacketFrame {
                    source: transmission.id.source,
                    kind: transmission.kind,
                    x: position.x,
                    y: position.y,
                    progress: transmission.progress,
                }
            })
            .collect();

        FeedFrame {
            round: snapshot.round,
            elapsed_seconds: snapshot.elapsed_seconds,
            cluster_head_ids: snapshot.cluster_head_ids.clone(),
            nodes,
            packets,
            stats: snapshot.stats.clone(),
        }
    }
}

/// Controller for handling serialization and transport of simulation data
pub struct TransportController {
    serializer: Box<dyn Serializer>,
    sender: Box<dyn Sender>,
    output_frequency: u64,
    frames_sent: u64,
}

impl TransportController {
    /// Publishes every round whose number is a multiple of `output_frequency`.
    pub fn new(serializer: Box<dyn Serializer>, sender: Box<dyn Sender>, output_frequency: u64) -> Self {
        Self {
            serializer,
            sender,
            output_frequency: output_frequency.max(1),
            frames_sent: 0,
        }
    }

    pub fn from_config(settings: &TransportSettings) -> Result<Self, TransportError> {
        let serializer: Box<dyn Serializer> = match settings.serializer {
            SerializerType::Json => Box::new(JsonSerializer),
            // Both real senders are newline-delimited.
            SerializerType::Binary => Box::new(BinarySerializer::armored()),
            SerializerType::Null => Box::new(NullSerializer),
        };

        let sender: Box<dyn Sender> = match settings.sender {
            SenderType::Stdio => Box::new(StdioSender),
            SenderType::File => {
                let path = settings.output_path.as_deref().ok_or_else(|| {
                    TransportError::Configuration("file sender needs an output_path".to_string())
                })?;
                Box::new(FileSender::new(path)?)
            }
            SenderType::Null => Box::new(NullSender),
        };

        debug!(
            "transport: {:?} serializer, {:?} sender, every {} rounds",
            settings.serializer, settings.sender, settings.output_frequency
        );
        Ok(Self::new(serializer, sender, settings.output_frequency))
    }

    /// Serializes and sends `snapshot` if its round is due. Returns whether a
    /// frame went out.
    pub fn publish(&mut self, snapshot: &SimulationSnapshot) -> Result<bool, TransportError> {
        // `round` names the next round, so the initial snapshot counts as round 0.
        let completed = snapshot.round.saturating_sub(1);
        if completed % self.output_frequency != 0 {
            return Ok(false);
        }

        let frame = FeedFrame::from_snapshot(snapshot);
        let data = self.serializer.serialize_to_bytes(&frame)?;
        if data.is_empty() {
            return Ok(false);
        }
        self.sender.send(&data)?;
        self.frames_sent += 1;
        Ok(true)
    }

    pub fn flush(&self) -> Result<(), TransportError> {
        self.sender.flush()
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leach_config::SimulationConfig;
    use leach_simulation::Simulation;

    fn file_settings(path: &std::path::Path, serializer: SerializerType, every: u64) -> TransportSettings {
        TransportSettings {
            serializer,
            sender: SenderType::File,
            output_path: Some(path.to_string_lossy().into_owned()),
            output_frequency: every,
        }
    }

    #[test]
    fn frames_carry_renderer_fields() {
        let mut simulation = Simulation::with_seed(SimulationConfig::default(), 21).unwrap();
        let snapshot = simulation.run_rounds(4);
        let frame = FeedFrame::from_snapshot(&snapshot);

        assert_eq!(frame.round, 5);
        assert_eq!(frame.nodes.len(), snapshot.nodes.len());
        assert_eq!(frame.packets.len(), snapshot.transmissions.len());
        for (packet, transmission) in frame.packets.iter().zip(&snapshot.transmissions) {
            let position = transmission.position_at_progress();
            assert_eq!((packet.x, packet.y), (position.x, position.y));
        }

        let json = serde_json::to_value(&frame).unwrap();
        assert!(json.get("clusterHeadIds").is_some());
        assert!(json["nodes"][0].get("batteryLevel").is_some());
    }

    #[test]
    fn json_feed_respects_output_frequency() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.jsonl");
        let mut controller = TransportController::from_config(&file_settings(&path, SerializerType::Json, 2)).unwrap();

        let mut simulation = Simulation::with_seed(SimulationConfig::default(), 2).unwrap();
        assert!(controller.publish(&simulation.snapshot()).unwrap());
        for _ in 0..5 {
            simulation.tick();
            controller.publish(&simulation.snapshot()).unwrap();
        }
        controller.flush().unwrap();

        // Initial frame plus rounds 2 and 4.
        assert_eq!(controller.frames_sent(), 3);
        let content = std::fs::read_to_string(&path).unwrap();
        let rounds: Vec<u64> = content
            .lines()
            .map(|line| serde_json::from_str::<FeedFrame>(line).unwrap().round)
            .collect();
        assert_eq!(rounds, vec![1, 3, 5]);
    }

    #[test]
    fn binary_feed_is_armored_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.b64");
        let mut controller = TransportController::from_config(&file_settings(&path, SerializerType::Binary, 1)).unwrap();

        let simulation = Simulation::with_seed(SimulationConfig::default(), 6).unwrap();
        controller.publish(&simulation.snapshot()).unwrap();
        controller.flush().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let line = content.lines().next().unwrap();
        let frame: FeedFrame = bincode::deserialize(&base64::decode(line).unwrap()).unwrap();
        assert_eq!(frame, FeedFrame::from_snapshot(&simulation.snapshot()));
    }

    #[test]
    fn null_serializer_sends_nothing() {
        let settings = TransportSettings {
            serializer: SerializerType::Null,
            sender: SenderType::Null,
            output_path: None,
            output_frequency: 1,
        };
        let mut controller = TransportController::from_config(&settings).unwrap();
        let simulation = Simulation::with_seed(SimulationConfig::default(), 6).unwrap();
        assert!(!controller.publish(&simulation.snapshot()).unwrap());
        assert_eq!(controller.frames_sent(), 0);
    }

    #[test]
    fn file_sender_without_path_is_rejected() {
        let settings = TransportSettings {
            sender: SenderType::File,
            output_path: None,
            ..TransportSettings::default()
        };
        assert!(matches!(
            TransportController::from_config(&settings),
            Err(TransportError::Configuration(_))
        ));
    }
}
