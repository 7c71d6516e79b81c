//! The actuator context
//!
//! One struct owns everything a job coroutine touches: the vehicle adapter,
//! the persisted job and the ephemeral status snapshot. The lifecycle
//! controller passes it by mutable reference into whichever routine
//! currently holds control, so exactly one writer exists at a time and the
//! actuators need no locking.

use std::collections::VecDeque;

use crate::drone::command::Command;
use crate::drone::job::JobStatus;
use crate::parameters::job::JobDefinition;
use crate::platform::traits::VehicleAdapter;

pub struct DroneContext {
    pub vehicle: Box<dyn VehicleAdapter>,
    pub job: JobDefinition,
    pub status: JobStatus,
    /// Commands queued for release conditions (`undock`).
    pub pending_commands: VecDeque<Command>,
}

impl DroneContext {
    pub fn new(vehicle: Box<dyn VehicleAdapter>, job: JobDefinition) -> Self {
        Self {
            vehicle,
            job,
            status: JobStatus::default(),
            pending_commands: VecDeque::new(),
        }
    }
}
