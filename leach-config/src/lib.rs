use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

// --- Error Type ---
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}

// --- Enums for Choices ---
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SerializerType {
    #[default]
    Json,
    Binary,
    Null,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    #[default]
    Stdio,
    File,
    Null,
}

// --- Configuration Sections ---

/// A point in the normalized square.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Inclusive-exclusive range used for random initial readings.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

/// Field layout and initial node state.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FieldSettings {
    /// Side of the normalized square.
    pub grid_size: f32,
    pub node_count: usize,
    /// Distance from the edges at which the first and last grid lines sit.
    pub layout_margin: f32,
    /// Jittered positions are clamped to `[clamp_margin, grid_size - clamp_margin]`.
    pub clamp_margin: f32,
    /// Jitter amplitude as a fraction of the grid spacing.
    pub jitter_fraction: f32,
    pub faulty_probability: f64,
    pub initial_temperature: Range,
    pub initial_humidity: Range,
    /// Upper bound of the per-node sleep phase offset.
    pub sleep_phase_max: f64,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            grid_size: 100.0,
            node_count: 30,
            layout_margin: 15.0,
            clamp_margin: 5.0,
            jitter_fraction: 0.3,
            faulty_probability: 0.1,
            initial_temperature: Range { min: 20.0, max: 30.0 },
            initial_humidity: Range { min: 40.0, max: 70.0 },
            sleep_phase_max: 10.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ClusterSettings {
    pub cluster_count: usize,
    /// Re-elect cluster heads on rounds divisible by this value.
    pub election_interval: u64,
    /// Nodes need strictly more battery than this to be elected.
    pub eligibility_threshold: f64,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            cluster_count: 4,
            election_interval: 10,
            eligibility_threshold: 50.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct EnergySettings {
    pub cluster_head_drain: f64,
    pub sleeping_drain: f64,
    pub awake_drain: f64,
    /// A node sleeps while `sin(round / sleep_phase_divisor + phase)` exceeds this.
    pub sleep_threshold: f64,
    pub sleep_phase_divisor: f64,
}

impl Default for EnergySettings {
    fn default() -> Self {
        Self {
            cluster_head_drain: 2.0,
            sleeping_drain: 0.2,
            awake_drain: 1.0,
            sleep_threshold: 0.7,
            sleep_phase_divisor: 10.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SensingSettings {
    /// Maximum absolute temperature drift per round.
    pub temperature_step: f64,
    /// Maximum absolute humidity drift per round.
    pub humidity_step: f64,
    pub max_data_per_round: f64,
    pub history_len: usize,
}

impl Default for SensingSettings {
    fn default() -> Self {
        Self {
            temperature_step: 0.25,
            humidity_step: 1.0,
            max_data_per_round: 5.0,
            history_len: 10,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TransmissionSettings {
    /// Spawn and advance packets on rounds divisible by this value.
    pub interval: u64,
    pub progress_step: f64,
    /// Nodes need strictly more battery than this to transmit.
    pub min_battery: f64,
    pub base_station: Point,
}

impl Default for TransmissionSettings {
    fn default() -> Self {
        Self {
            interval: 3,
            progress_step: 0.1,
            min_battery: 10.0,
            base_station: Point { x: 50.0, y: 10.0 },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ScheduleSettings {
    pub round_period_ms: u64,
    /// Fixed seed for reproducible runs. `None` draws one from entropy.
    pub seed: Option<u64>,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            round_period_ms: 1000,
            seed: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TransportSettings {
    pub serializer: SerializerType,
    pub sender: SenderType,
    pub output_path: Option<String>,
    /// Emit every N-th snapshot.
    pub output_frequency: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            serializer: SerializerType::Json,
            sender: SenderType::Null,
            output_path: None,
            output_frequency: 1,
        }
    }
}

// --- Top-Level Config Struct ---

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct SimulationConfig {
    pub field: FieldSettings,
    pub clusters: ClusterSettings,
    pub energy: EnergySettings,
    pub sensing: SensingSettings,
    pub transmission: TransmissionSettings,
    pub schedule: ScheduleSettings,
    pub transport: TransportSettings,
}

impl SimulationConfig {
    pub fn round_period(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.schedule.round_period_ms)
    }

    /// Checks the invariants the simulation relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let field = &self.field;
        if field.node_count == 0 {
            return Err(invalid("field.node_count must be greater than 0"));
        }
        if field.grid_size <= 0.0 {
            return Err(invalid("field.grid_size must be positive"));
        }
        if field.layout_margin < 0.0 || 2.0 * field.layout_margin >= field.grid_size {
            return Err(invalid("field.layout_margin must leave a non-empty interior"));
        }
        if field.clamp_margin < 0.0 || 2.0 * field.clamp_margin >= field.grid_size {
            return Err(invalid("field.clamp_margin must leave a non-empty interior"));
        }
        if !(0.0..=1.0).contains(&field.jitter_fraction) {
            return Err(invalid("field.jitter_fraction must be within [0, 1]"));
        }
        if !(0.0..=1.0).contains(&field.faulty_probability) {
            return Err(invalid("field.faulty_probability must be within [0, 1]"));
        }
        for (name, range) in [
            ("field.initial_temperature", field.initial_temperature),
            ("field.initial_humidity", field.initial_humidity),
        ] {
            if range.min > range.max {
                return Err(invalid(format!("{name}: min must not exceed max")));
            }
        }
        if field.sleep_phase_max < 0.0 {
            return Err(invalid("field.sleep_phase_max must not be negative"));
        }

        if self.clusters.election_interval == 0 {
            return Err(invalid("clusters.election_interval must be greater than 0"));
        }

        let energy = &self.energy;
        if energy.cluster_head_drain < 0.0 || energy.sleeping_drain < 0.0 || energy.awake_drain < 0.0 {
            return Err(invalid("energy drains must not be negative"));
        }
        if energy.cluster_head_drain < energy.awake_drain {
            return Err(invalid("energy.cluster_head_drain must be at least energy.awake_drain"));
        }
        if energy.sleep_phase_divisor == 0.0 {
            return Err(invalid("energy.sleep_phase_divisor must not be zero"));
        }

        if self.sensing.history_len == 0 {
            return Err(invalid("sensing.history_len must be greater than 0"));
        }
        if self.sensing.max_data_per_round < 0.0 {
            return Err(invalid("sensing.max_data_per_round must not be negative"));
        }

        let transmission = &self.transmission;
        if transmission.interval == 0 {
            return Err(invalid("transmission.interval must be greater than 0"));
        }
        if transmission.progress_step <= 0.0 || transmission.progress_step > 1.0 {
            return Err(invalid("transmission.progress_step must be within (0, 1]"));
        }
        let bs = transmission.base_station;
        if !(0.0..=field.grid_size).contains(&bs.x) || !(0.0..=field.grid_size).contains(&bs.y) {
            return Err(invalid("transmission.base_station must lie inside the field"));
        }

        if self.schedule.round_period_ms == 0 {
            return Err(invalid("schedule.round_period_ms must be greater than 0"));
        }

        if self.transport.output_frequency == 0 {
            return Err(invalid("transport.output_frequency must be greater than 0"));
        }
        if self.transport.sender == SenderType::File && self.transport.output_path.is_none() {
            return Err(invalid("transport.output_path is required for the file sender"));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation(message.into())
}

// --- Loading Function ---

/// Loads a configuration file. `.toml` files are parsed as TOML, anything
/// else as JSON. Missing fields take their default values.
pub fn load_config(path: &Path) -> Result<SimulationConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: SimulationConfig = match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content)?,
        _ => serde_json::from_str(&content)?,
    };

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    #[test]
    fn defaults_match_reference_constants() {
        let config = SimulationConfig::default();
        assert_eq!(config.field.node_count, 30);
        assert_eq!(config.clusters.cluster_count, 4);
        assert_eq!(config.clusters.election_interval, 10);
        assert_eq!(config.transmission.interval, 3);
        assert_eq!(config.transmission.base_station, Point { x: 50.0, y: 10.0 });
        assert_eq!(config.sensing.history_len, 10);
        assert_eq!(config.round_period(), std::time::Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn load_partial_json_config() {
        let content = r#"{
          "field": { "node_count": 12 },
          "clusters": { "cluster_count": 2 },
          "schedule": { "seed": 42 }
        }"#;
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.field.node_count, 12);
        assert_eq!(config.field.grid_size, 100.0);
        assert_eq!(config.clusters.cluster_count, 2);
        assert_eq!(config.clusters.eligibility_threshold, 50.0);
        assert_eq!(config.schedule.seed, Some(42));
        assert_eq!(config.transport.sender, SenderType::Null);
    }

    #[test]
    fn load_toml_config() {
        let content = r#"
            [energy]
            awake_drain = 0.5

            [transmission]
            base_station = { x = 10.0, y = 90.0 }

            [transport]
            serializer = "binary"
            sender = "stdio"
        "#;
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.energy.awake_drain, 0.5);
        assert_eq!(config.energy.cluster_head_drain, 2.0);
        assert_eq!(config.transmission.base_station, Point { x: 10.0, y: 90.0 });
        assert_eq!(config.transport.serializer, SerializerType::Binary);
        assert_eq!(config.transport.sender, SenderType::Stdio);
    }

    #[test]
    fn load_invalid_node_count() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "field": {{ "node_count": 0 }} }}"#).unwrap();
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn load_malformed_json() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(load_config(file.path()), Err(ConfigError::Json(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = load_config(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn file_sender_requires_path() {
        let mut config = SimulationConfig::default();
        config.transport.sender = SenderType::File;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        config.transport.output_path = Some("out.jsonl".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_intervals_and_probabilities() {
        let mut config = SimulationConfig::default();
        config.clusters.election_interval = 0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.field.faulty_probability = 1.5;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.transmission.progress_step = 0.0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.energy.cluster_head_drain = 0.5;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.transmission.base_station = Point { x: 150.0, y: 10.0 };
        assert!(config.validate().is_err());
    }
}
