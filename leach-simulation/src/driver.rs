//! Background thread that ticks a [`Simulation`] at a fixed period.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, Receiver, Sender};
use leach_core::RoundReport;
use log::{debug, info};
use thiserror::Error;

use crate::app::Simulation;
use crate::node::{NodeId, SensorNode};
use crate::snapshot::SimulationSnapshot;

/// Latest published snapshot, shared with any number of readers.
pub type SnapshotHandle = Arc<RwLock<Arc<SimulationSnapshot>>>;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("failed to spawn simulation thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("simulation thread panicked")]
    Panicked,
}

/// Sent to subscribers after every completed round.
#[derive(Debug, Clone)]
pub struct RoundEvent {
    pub report: RoundReport,
    pub snapshot: Arc<SimulationSnapshot>,
}

type Subscribers = Arc<Mutex<Vec<Sender<RoundEvent>>>>;

pub struct SimulationDriver;

impl SimulationDriver {
    /// Moves `simulation` onto its own thread and ticks it once per `period`.
    pub fn start(simulation: Simulation, period: Duration) -> Result<DriverHandle, DriverError> {
        let latest: SnapshotHandle = Arc::new(RwLock::new(simulation.snapshot()));
        let subscribers: Subscribers = Arc::default();
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);

        let thread = thread::Builder::new().name("leach-driver".to_string()).spawn({
            let latest = Arc::clone(&latest);
            let subscribers = Arc::clone(&subscribers);
            move || drive(simulation, period, stop_rx, latest, subscribers)
        })?;
        info!("simulation driver started, one round every {:?}", period);

        Ok(DriverHandle {
            latest,
            subscribers,
            stop: Some(stop_tx),
            thread: Some(thread),
        })
    }
}

fn drive(
    mut simulation: Simulation,
    period: Duration,
    stop: Receiver<()>,
    latest: SnapshotHandle,
    subscribers: Subscribers,
) -> Simulation {
    let ticker = crossbeam_channel::tick(period);
    loop {
        let stopped = select! {
            recv(stop) -> _ => true,
            recv(ticker) -> _ => false,
        };
        if stopped {
            break;
        }

        let report = simulation.tick();
        let snapshot = simulation.snapshot();
        *latest.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&snapshot);

        let event = RoundEvent { report, snapshot };
        subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
    debug!("simulation driver stopping at round {}", simulation.round());
    simulation
}

/// Control surface for a running driver. Dropping it stops the driver.
pub struct DriverHandle {
    latest: SnapshotHandle,
    subscribers: Subscribers,
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<Simulation>>,
}

impl DriverHandle {
    /// State as of the last completed round.
    pub fn snapshot(&self) -> Arc<SimulationSnapshot> {
        Arc::clone(&*self.latest.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn snapshot_handle(&self) -> SnapshotHandle {
        Arc::clone(&self.latest)
    }

    pub fn select_node(&self, id: NodeId) -> Option<SensorNode> {
        self.snapshot().select_node(id).cloned()
    }

    /// Receives a [`RoundEvent`] for every round completed from now on.
    /// Dropped receivers are forgotten on the next round.
    pub fn subscribe(&self) -> Receiver<RoundEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Stops ticking and hands the simulation back. A round already in
    /// progress finishes first.
    pub fn stop(mut self) -> Result<Simulation, DriverError> {
        self.shutdown().ok_or(DriverError::Panicked)
    }

    fn shutdown(&mut self) -> Option<Simulation> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        let simulation = self.thread.take()?.join().ok()?;
        info!("simulation driver stopped at round {}", simulation.round());
        Some(simulation)
    }
}

impl Drop for DriverHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
