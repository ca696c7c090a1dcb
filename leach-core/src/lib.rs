//! Minimal round-driven simulation kernel.
//!
//! A [`World`] holds singleton resources keyed by type, [`System`]s mutate
//! the world, and the [`Scheduler`] runs the systems whose [`RunCriteria`]
//! match the current round before advancing the [`RoundCounter`].

// Lets `#[derive(Resource)]` resolve `::leach_core` inside this crate too.
extern crate self as leach_core;

pub mod round;
pub mod scheduler;
pub mod system;
pub mod world;

pub use leach_macros::Resource;
pub use round::{RoundCounter, SimTime};
pub use scheduler::{RoundReport, Scheduler};
pub use system::{fn_system, FnSystem, RunCriteria, System};
pub use world::World;

use std::any::Any;

/// Marker trait for types that can be stored as global resources in the World.
pub trait Resource: Any + Send + Sync {}
