use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::select;
use hdrhistogram::Histogram;
use leach_config::{load_config, ConfigError, SimulationConfig};
use leach_simulation::{DriverError, RoundEvent, Simulation, SimulationDriver, SimulationSnapshot};
use leach_transport::{TransportController, TransportError};
use log::{error, info, warn};
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(author, version, about = "Runs a LEACH wireless sensor network simulation", long_about = None)]
struct Args {
    /// Path to a JSON or TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for the random source; overrides `schedule.seed`
    #[arg(short, long)]
    seed: Option<u64>,

    /// Stop after this many rounds instead of running until Ctrl-C
    #[arg(short, long)]
    rounds: Option<u64>,

    /// Milliseconds between rounds; overrides `schedule.round_period_ms`
    #[arg(long)]
    period_ms: Option<u64>,

    /// Log a network summary every N rounds (0 disables it)
    #[arg(long, default_value_t = 10)]
    summary_every: u64,
}

#[derive(Error, Debug)]
enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Driver(#[from] DriverError),

    #[error("failed to install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),

    #[error("failed to create latency histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),
}

enum Step {
    Round(RoundEvent),
    Interrupted,
    Finished,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Args::parse()) {
        error!("{}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), RunnerError> {
    let config = build_config(&args)?;
    let period = config.round_period();
    let mut transport = TransportController::from_config(&config.transport)?;

    let simulation = Simulation::new(config)?;
    info!("replay this run with --seed {}", simulation.seed());
    transport.publish(&simulation.snapshot())?;

    let (interrupt_tx, interrupt) = crossbeam_channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.try_send(());
    })?;

    let driver = SimulationDriver::start(simulation, period)?;
    let events = driver.subscribe();
    // Microseconds, up to one minute per tick.
    let mut latencies = Histogram::<u64>::new_with_bounds(1, 60_000_000, 3)?;
    let mut completed = 0u64;

    loop {
        let step = select! {
            recv(events) -> event => event.map_or(Step::Finished, Step::Round),
            recv(interrupt) -> _ => Step::Interrupted,
        };
        let event = match step {
            Step::Round(event) => event,
            Step::Interrupted => {
                info!("interrupted, stopping after the current round");
                break;
            }
            Step::Finished => {
                warn!("simulation driver stopped publishing rounds");
                break;
            }
        };

        latencies.saturating_record(event.report.duration.as_micros() as u64);
        if let Err(e) = transport.publish(&event.snapshot) {
            warn!("failed to publish round {}: {}", event.report.round, e);
        }
        completed += 1;

        if args.summary_every > 0 && event.report.round % args.summary_every == 0 {
            log_summary(&event.snapshot);
        }
        if args.rounds.map_or(false, |limit| completed >= limit) {
            info!("completed {} rounds", completed);
            break;
        }
    }

    let simulation = driver.stop()?;
    transport.flush()?;
    info!(
        "stopped before round {} after {} frames",
        simulation.round(),
        transport.frames_sent()
    );
    report_latencies(&latencies);
    Ok(())
}

fn build_config(args: &Args) -> Result<SimulationConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => {
            let config = load_config(path)?;
            info!("using configuration from {}", path.display());
            config
        }
        None => {
            info!("no configuration file given, using defaults");
            SimulationConfig::default()
        }
    };

    if let Some(seed) = args.seed {
        config.schedule.seed = Some(seed);
    }
    if let Some(period_ms) = args.period_ms {
        config.schedule.round_period_ms = period_ms;
    }
    config.validate()?;
    Ok(config)
}

fn log_summary(snapshot: &SimulationSnapshot) {
    let stats = &snapshot.stats;
    info!(
        "round {}: {} heads {:?}, {} active, {} sleeping, {} faulty, {} depleted, mean battery {:.1}, {:.1} data collected, {} packets in flight",
        snapshot.round - 1,
        stats.cluster_heads,
        snapshot.cluster_head_ids,
        stats.active,
        stats.sleeping,
        stats.faulty,
        stats.depleted,
        stats.mean_battery,
        stats.total_data_collected,
        stats.transmissions_in_flight
    );
}

fn report_latencies(latencies: &Histogram<u64>) {
    if latencies.len() == 0 {
        return;
    }
    let micros = |value: u64| Duration::from_micros(value);
    info!(
        "tick latency over {} rounds: p50 {:?}, p90 {:?}, p99 {:?}, max {:?}",
        latencies.len(),
        micros(latencies.value_at_quantile(0.5)),
        micros(latencies.value_at_quantile(0.9)),
        micros(latencies.value_at_quantile(0.99)),
        micros(latencies.max())
    );
}
