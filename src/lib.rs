//! ore_trail - Autopilot core for an autonomous mining/cargo drone
//!
//! The host invokes a single entry point periodically with the elapsed time
//! since the previous invocation; everything here is built around that
//! contract. No task ever blocks the host: waiting is expressed as
//! re-checking a condition and yielding until the next tick.
//!
//! # Modules
//!
//! - [`core`]: Cooperative task scheduler and promise runtime
//! - [`subsystems`]: Navigation (motion primitives, work grids, waypoint
//!   paths, the goto sequencer)
//! - [`drone`]: Job state machines (mining, shuttle), docking gates, the
//!   job lifecycle controller and its command surface
//! - [`parameters`]: Persisted job configuration (flat key/value blob)
//! - [`platform`]: Vehicle adapter trait and the mock vehicle used in tests

pub mod core;
pub mod drone;
pub mod parameters;
pub mod platform;
pub mod subsystems;

pub use crate::core::scheduler::{Scheduler, StepResult, TaskId, TaskRoutine};
pub use drone::controller::DroneController;
pub use parameters::job::JobDefinition;
pub use platform::traits::VehicleAdapter;
