//! Initial node placement on a jittered grid.

use std::collections::VecDeque;

use glam::Vec2;
use leach_config::{FieldSettings, Range, SensingSettings};
use ordered_float::OrderedFloat;
use rand::Rng;

use crate::node::{NodeId, NodeStatus, SensorNode, SensorSample};

/// Synthetic history timestamps are spread over this many seconds before t=0.
const SEED_HISTORY_SPAN_SECS: f64 = 1000.0;
/// Synthetic history energy readings fall in `[100 - spread, 100]`.
const SEED_HISTORY_ENERGY_SPREAD: f64 = 20.0;

/// Rows and columns of the placement grid: `rows = floor(sqrt(n))`,
/// `cols = ceil(n / rows)`.
pub fn grid_dimensions(node_count: usize) -> (usize, usize) {
    if node_count == 0 {
        return (0, 0);
    }
    let rows = ((node_count as f64).sqrt().floor() as usize).max(1);
    let cols = (node_count + rows - 1) / rows;
    (rows, cols)
}

/// Places `settings.node_count` nodes row-major on the grid, each jittered
/// by up to `jitter_fraction` of the cell spacing and clamped into the
/// interior band.
pub fn generate_field<R: Rng + ?Sized>(
    settings: &FieldSettings,
    sensing: &SensingSettings,
    rng: &mut R,
) -> Vec<SensorNode> {
    let (rows, cols) = grid_dimensions(settings.node_count);
    let (origin_x, spacing_x) = axis_layout(settings, cols);
    let (origin_y, spacing_y) = axis_layout(settings, rows);
    let low = settings.clamp_margin;
    let high = settings.grid_size - settings.clamp_margin;

    (0..settings.node_count)
        .map(|i| {
            let row = i / cols;
            let col = i % cols;

            let jitter_x = (rng.gen::<f32>() - 0.5) * spacing_x * settings.jitter_fraction;
            let jitter_y = (rng.gen::<f32>() - 0.5) * spacing_y * settings.jitter_fraction;
            let x = origin_x + col as f32 * spacing_x + jitter_x;
            let y = origin_y + row as f32 * spacing_y + jitter_y;

            let is_faulty = rng.gen_bool(settings.faulty_probability);
            let temperature = sample_range(rng, settings.initial_temperature);
            let humidity = sample_range(rng, settings.initial_humidity);
            let sleep_phase = rng.gen::<f64>() * settings.sleep_phase_max;
            let history = seed_history(rng, settings, sensing.history_len);

            SensorNode {
                id: NodeId(i as u32 + 1),
                position: Vec2::new(x.clamp(low, high), y.clamp(low, high)),
                battery: SensorNode::FULL_BATTERY,
                status: NodeStatus::Active,
                sleeping: false,
                is_faulty,
                temperature,
                humidity,
                cluster_head: None,
                data_collected: 0.0,
                last_transmission_time: 0.0,
                sleep_phase,
                history,
            }
        })
        .collect()
}

/// First grid line and spacing along one axis. A single line sits in the
/// middle of the square.
fn axis_layout(settings: &FieldSettings, lines: usize) -> (f32, f32) {
    if lines <= 1 {
        return (settings.grid_size / 2.0, 0.0);
    }
    let span = settings.grid_size - 2.0 * settings.layout_margin;
    (settings.layout_margin, span / (lines - 1) as f32)
}

fn sample_range<R: Rng + ?Sized>(rng: &mut R, range: Range) -> f64 {
    range.min + rng.gen::<f64>() * (range.max - range.min)
}

fn seed_history<R: Rng + ?Sized>(rng: &mut R, settings: &FieldSettings, len: usize) -> VecDeque<SensorSample> {
    let mut samples: Vec<SensorSample> = (0..len)
        .map(|_| SensorSample {
            time: -rng.gen::<f64>() * SEED_HISTORY_SPAN_SECS,
            energy: SensorNode::FULL_BATTERY - rng.gen::<f64>() * SEED_HISTORY_ENERGY_SPREAD,
            temperature: sample_range(rng, settings.initial_temperature),
            humidity: sample_range(rng, settings.initial_humidity),
        })
        .collect();
    samples.sort_by_key(|sample| OrderedFloat(sample.time));
    samples.into()
}
