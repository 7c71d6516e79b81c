//! Shuttle job
//!
//! Hauls cargo back and forth between the path's Home and Work endpoints.
//! Each leg delegates to the goto sequencer with the docking gates wired
//! in; the destination is derived from the persisted transit stage, so a
//! completed leg flips direction automatically and an interrupted one
//! resumes mid-path. Runs until the lifecycle controller stops it.

use std::time::Duration;

use crate::core::scheduler::{StepResult, TaskRoutine};
use crate::drone::context::DroneContext;
use crate::drone::docking::{wait_for_dock, wait_for_undock};
use crate::subsystems::navigation::goto::GotoPosition;

pub struct ShuttleJob {
    leg: Option<GotoPosition>,
}

impl ShuttleJob {
    pub fn new() -> Self {
        Self { leg: None }
    }
}

impl Default for ShuttleJob {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRoutine<DroneContext> for ShuttleJob {
    fn step(&mut self, ctx: &mut DroneContext, _dt: Duration) -> Result<StepResult, &'static str> {
        if !ctx.job.has_path() {
            log::warn!("shuttle job stopped: no recorded path");
            return Ok(StepResult::Done);
        }

        let leg = self.leg.get_or_insert_with(|| {
            let destination = ctx.job.current_destination();
            log::info!("shuttle leg to {}", destination.name());
            GotoPosition::new(
                destination,
                Some(wait_for_undock),
                Some(wait_for_dock),
            )
        });

        if leg.step(ctx) == StepResult::Continue {
            return Ok(StepResult::Continue);
        }

        // Leg complete: the transit stage now reads At<endpoint>, so the
        // derived destination has flipped for the next leg.
        self.leg = None;
        Ok(StepResult::Continue)
    }

    fn restart(&mut self) {
        self.leg = None;
    }
}
