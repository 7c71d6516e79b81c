//! Job lifecycle controller
//!
//! Owns the scheduler and the actuator context, wires commands to
//! lifecycle transitions, and enforces the mutual exclusion between the
//! long-running main job and the ad-hoc go-home/go-work transition:
//! starting either one stops the other first.
//!
//! The main job runs as a one-shot task whose completion callback performs
//! the actuator cleanup (drills off, thrusters and gyros reset) and marks
//! the job paused. Cancellation and natural completion share that callback,
//! so cleanup runs exactly once per task lifetime either way.

use std::time::Duration;

use crate::core::scheduler::{Scheduler, TaskId};
use crate::drone::command::{Command, CommandError};
use crate::drone::context::DroneContext;
use crate::drone::job::MainJob;
use crate::parameters::job::{Endpoint, JobDefinition};
use crate::platform::traits::VehicleAdapter;
use crate::subsystems::navigation::goto::GotoPosition;
use crate::subsystems::navigation::motion::stop_thrust;
use crate::subsystems::navigation::recorder::PathRecorder;

/// Sampling interval for the path recorder.
const RECORD_INTERVAL: Duration = Duration::from_secs(1);

pub struct DroneController {
    scheduler: Scheduler<DroneContext>,
    ctx: DroneContext,
    main_task: Option<TaskId>,
    transition_task: Option<TaskId>,
    record_task: Option<TaskId>,
}

impl DroneController {
    /// Decode the persisted job from the host's storage blob and, if it was
    /// running when the host last saved, restart it immediately.
    pub fn new(vehicle: Box<dyn VehicleAdapter>, storage: &str) -> Self {
        let job = JobDefinition::decode("Default", storage);
        let mut controller = Self {
            scheduler: Scheduler::new(),
            ctx: DroneContext::new(vehicle, job),
            main_task: None,
            transition_task: None,
            record_task: None,
        };
        if !controller.ctx.job.paused {
            log::info!("resuming persisted job");
            controller.toggle_main(true);
        }
        controller
    }

    /// Host tick entry point.
    pub fn tick(&mut self, elapsed: Duration) {
        self.scheduler.tick(&mut self.ctx, elapsed);
    }

    /// Host save callback: the blob to persist.
    pub fn save(&self) -> String {
        self.ctx.job.encode()
    }

    pub fn context(&self) -> &DroneContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut DroneContext {
        &mut self.ctx
    }

    pub fn is_main_running(&self) -> bool {
        self.main_task
            .is_some_and(|id| self.scheduler.is_running(id))
    }

    pub fn is_transition_running(&self) -> bool {
        self.transition_task
            .is_some_and(|id| self.scheduler.is_running(id))
    }

    pub fn is_recording(&self) -> bool {
        self.ctx.status.recording
    }

    /// Dispatch one host command string.
    pub fn execute(&mut self, input: &str) -> Result<(), CommandError> {
        match Command::parse(input)? {
            Command::Start => {
                self.toggle_main(true);
            }
            Command::Stop => {
                self.toggle_main(false);
                self.toggle_transition(None, false);
            }
            Command::Toggle => {
                if self.is_transition_running() {
                    self.toggle_transition(None, false);
                } else {
                    let running = self.is_main_running();
                    self.toggle_main(!running);
                }
            }
            Command::GoHome => self.toggle_transition(Some(Endpoint::Home), true),
            Command::GoWork => self.toggle_transition(Some(Endpoint::Work), true),
            Command::Reset => {
                self.toggle_main(false);
                self.ctx.job.reset();
            }
            Command::Record => {
                if self.is_recording() {
                    self.stop_recording();
                } else {
                    self.start_recording();
                }
            }
            Command::RecordStart => {
                if !self.is_recording() {
                    self.start_recording();
                }
            }
            Command::RecordStop => self.stop_recording(),
            Command::Undock => self.ctx.pending_commands.push_back(Command::Undock),
        }
        Ok(())
    }

    /// Start or stop the main job task. Starting stops any transition task
    /// first; the job's paused flag tracks the running state for
    /// persistence.
    pub fn toggle_main(&mut self, start: bool) {
        if start {
            if self.is_main_running() {
                return;
            }
            self.toggle_transition(None, false);
            let id = self
                .scheduler
                .run_task(MainJob::new())
                .once()
                .on_done(|ctx: &mut DroneContext| {
                    // Exactly-once cleanup, shared by completion and
                    // cancellation.
                    ctx.vehicle.set_drills_enabled(false);
                    stop_thrust(ctx.vehicle.as_mut());
                    ctx.vehicle.reset_gyros();
                    ctx.job.paused = true;
                    log::info!("main job task finished");
                })
                .id();
            self.main_task = Some(id);
            self.ctx.job.paused = false;
            log::info!("main job task started ({:?})", self.ctx.job.kind);
        } else {
            if let Some(id) = self.main_task.take() {
                self.scheduler.stop_task(id, &mut self.ctx);
            }
            self.ctx.job.paused = true;
        }
    }

    /// Start or stop the ad-hoc transition to an endpoint. Starting stops
    /// the main job first.
    pub fn toggle_transition(&mut self, destination: Option<Endpoint>, start: bool) {
        if start {
            let Some(destination) = destination else {
                return;
            };
            if self.is_transition_running() {
                return;
            }
            self.toggle_main(false);
            let id = self
                .scheduler
                .run_task(GotoPosition::new(destination, None, None))
                .once()
                .on_done(move |_ctx: &mut DroneContext| {
                    log::info!("transition to {} complete", destination.name());
                })
                .id();
            self.transition_task = Some(id);
            log::info!("transition to {} started", destination.name());
        } else if let Some(id) = self.transition_task.take() {
            if self.scheduler.stop_task(id, &mut self.ctx) {
                stop_thrust(self.ctx.vehicle.as_mut());
                self.ctx.vehicle.reset_gyros();
            }
        }
    }

    fn start_recording(&mut self) {
        self.toggle_main(false);
        self.ctx.status.recording = true;
        let id = self
            .scheduler
            .run_task(PathRecorder::new())
            .once()
            .every(RECORD_INTERVAL)
            .id();
        self.record_task = Some(id);
    }

    fn stop_recording(&mut self) {
        // The recorder notices the cleared flag on its next step, appends
        // the Work endpoint and exhausts.
        self.ctx.status.recording = false;
    }
}
