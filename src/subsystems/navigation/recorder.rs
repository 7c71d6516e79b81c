//! Path recorder
//!
//! Records the route between the Home dock and the work site while a pilot
//! flies it manually. The first step clears the job path and drops a `Home`
//! waypoint; each later step appends a waypoint once the vehicle has moved
//! more than twice its bounding radius from the last recorded point. When
//! the recording flag clears, a final `Work` waypoint is appended and the
//! transit stage is set so the next journey heads home.
//!
//! Runs as a one-shot task at a ~1s interval so waypoint spacing does not
//! depend on the host tick rate.

use std::time::Duration;

use nalgebra::Vector3;

use crate::core::scheduler::{StepResult, TaskRoutine};
use crate::drone::context::DroneContext;
use crate::parameters::job::TransitStage;
use crate::subsystems::navigation::types::Waypoint;

pub struct PathRecorder {
    started: bool,
    previous: Option<Vector3<f64>>,
    min_distance: f64,
    counter: u32,
}

impl PathRecorder {
    pub fn new() -> Self {
        Self {
            started: false,
            previous: None,
            min_distance: 0.0,
            counter: 0,
        }
    }
}

impl Default for PathRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRoutine<DroneContext> for PathRecorder {
    fn step(&mut self, ctx: &mut DroneContext, _dt: Duration) -> Result<StepResult, &'static str> {
        let frame = ctx.vehicle.world_frame();

        if !self.started {
            self.started = true;
            self.min_distance = ctx.vehicle.bounding_radius() * 2.0;
            self.counter = 0;
            ctx.status.recording = true;
            ctx.job.path.clear();
            ctx.job.path.push(Waypoint::new("Home", &frame));
            self.previous = Some(frame.position);
            log::info!("path recording started");
            return Ok(StepResult::Continue);
        }

        if !ctx.status.recording {
            ctx.job.path.push(Waypoint::new("Work", &frame));
            // Standing at the work site: the next journey heads home.
            ctx.job.transit_stage = TransitStage::AtWork;
            log::info!("path recorded: {} waypoints", ctx.job.path.len());
            return Ok(StepResult::Done);
        }

        if let Some(previous) = self.previous {
            if (frame.position - previous).norm() > self.min_distance {
                self.previous = Some(frame.position);
                ctx.job
                    .path
                    .push(Waypoint::new(format!("Waypoint#{}", self.counter), &frame));
                self.counter += 1;
            }
        }

        Ok(StepResult::Continue)
    }

    fn restart(&mut self) {
        self.started = false;
        self.previous = None;
        self.counter = 0;
    }
}
