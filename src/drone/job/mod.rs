//! Job state machines
//!
//! The main job task wraps one of the long-running machines (mining or
//! shuttle) behind a single routine the lifecycle controller schedules.
//! Which machine runs is decided from the persisted job kind on the first
//! step, so restarting the task re-reads the configuration.

pub mod mining;
pub mod shuttle;

use std::time::Duration;

use crate::core::scheduler::{StepResult, TaskRoutine};
use crate::drone::context::DroneContext;
use crate::parameters::job::JobKind;
use crate::subsystems::navigation::types::Waypoint;

use mining::MiningJob;
use shuttle::ShuttleJob;

/// Ephemeral, recomputed job snapshot for reporting. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct JobStatus {
    /// A path recording is in progress.
    pub recording: bool,
    /// Final waypoint of the current journey.
    pub destination: Option<Waypoint>,
    /// Waypoint currently being approached.
    pub current: Option<Waypoint>,
    /// Waypoints in the current journey.
    pub count: usize,
    /// Waypoints remaining after the current one.
    pub left: usize,
    /// Current target speed, m/s.
    pub speed: f64,
    /// Current arrival radius, m.
    pub min_distance: f64,
    /// Shafts in the generated mining route.
    pub mining_route_len: usize,
}

enum Runner {
    Mining(MiningJob),
    Shuttle(ShuttleJob),
}

/// The main long-running job task: dispatches on the persisted job kind.
///
/// A job kind of `None` completes immediately; the mining machine completes
/// when its route is exhausted and the vehicle is docked home; the shuttle
/// machine runs until stopped.
pub struct MainJob {
    runner: Option<Runner>,
}

impl MainJob {
    pub fn new() -> Self {
        Self { runner: None }
    }
}

impl Default for MainJob {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRoutine<DroneContext> for MainJob {
    fn step(&mut self, ctx: &mut DroneContext, dt: Duration) -> Result<StepResult, &'static str> {
        if self.runner.is_none() {
            self.runner = match ctx.job.kind {
                JobKind::None => return Ok(StepResult::Done),
                JobKind::MiningGrinding => Some(Runner::Mining(MiningJob::new())),
                JobKind::Shuttle => Some(Runner::Shuttle(ShuttleJob::new())),
            };
        }
        match self.runner.as_mut() {
            Some(Runner::Mining(job)) => job.step(ctx, dt),
            Some(Runner::Shuttle(job)) => job.step(ctx, dt),
            None => Ok(StepResult::Done),
        }
    }

    fn restart(&mut self) {
        self.runner = None;
    }
}
