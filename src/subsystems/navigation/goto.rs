//! Waypoint path sequencer
//!
//! Drives the vehicle along the recorded path toward one of its endpoints,
//! with docking/undocking gates at both ends. The sequencer is resumable:
//! it starts from the path waypoint closest to the current position (a
//! journey interrupted mid-path picks up where it left off) and synthesizes
//! a transient "previous" waypoint aligned with the direction of travel
//! when resuming away from the path start.
//!
//! # Phases
//!
//! `Init` → `AwaitDeparture` → `Travel` → `AwaitDocking` → `Finished`,
//! one [`step`](GotoPosition::step) per tick, internal transitions taken
//! without yielding.

use std::time::Duration;

use crate::core::scheduler::{StepResult, TaskRoutine};
use crate::drone::context::DroneContext;
use crate::parameters::job::{Endpoint, TransitStage};
use crate::subsystems::navigation::motion::{
    move_towards_position, orient_to_frame, project_on_plane, stop_thrust,
};
use crate::subsystems::navigation::types::{Frame, Waypoint};

/// Gating predicate polled every tick before proceeding past a departure or
/// arrival checkpoint. Receives the endpoint name being departed/docked.
pub type GateFn = fn(&mut DroneContext, &str) -> bool;

/// Distance from either terminal waypoint inside which speed and arrival
/// radius taper down for precision docking.
const TAPER_DISTANCE: f64 = 200.0;
/// Taper floor for target speed, m/s.
const MIN_APPROACH_SPEED: f64 = 2.0;
/// Taper floor for the arrival radius, m.
const MIN_ARRIVAL_RADIUS: f64 = 0.25;
/// Within this distance of the destination the vehicle orients toward the
/// destination frame instead of the previous waypoint.
const DESTINATION_ALIGN_DISTANCE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    AwaitDeparture,
    Travel,
    AwaitDocking,
    Finished,
}

/// Resumable waypoint-path sequencer.
pub struct GotoPosition {
    destination: Endpoint,
    undock_gate: Option<GateFn>,
    dock_gate: Option<GateFn>,
    phase: Phase,
    path: Vec<Waypoint>,
    previous: Option<Waypoint>,
    index: usize,
    speed: f64,
    arrival_radius: f64,
}

impl GotoPosition {
    pub fn new(
        destination: Endpoint,
        undock_gate: Option<GateFn>,
        dock_gate: Option<GateFn>,
    ) -> Self {
        Self {
            destination,
            undock_gate,
            dock_gate,
            phase: Phase::Init,
            path: Vec::new(),
            previous: None,
            index: 0,
            speed: MIN_APPROACH_SPEED,
            arrival_radius: MIN_ARRIVAL_RADIUS,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Advance one tick. Returns [`StepResult::Done`] once the vehicle has
    /// arrived, the transit stage has flipped to the terminal state, and
    /// the docking gate (if any) has passed.
    pub fn step(&mut self, ctx: &mut DroneContext) -> StepResult {
        loop {
            match self.phase {
                Phase::Init => {
                    if !self.init(ctx) {
                        self.phase = Phase::Finished;
                        return StepResult::Done;
                    }
                    self.phase = Phase::AwaitDeparture;
                }
                Phase::AwaitDeparture => {
                    if let Some(first) = self.path.first() {
                        let name = first.name().to_string();
                        if let Some(gate) = self.undock_gate {
                            if !gate(ctx, &name) {
                                return StepResult::Continue;
                            }
                        }
                    }
                    self.speed = MIN_APPROACH_SPEED;
                    self.arrival_radius = MIN_ARRIVAL_RADIUS;
                    ctx.status.speed = self.speed;
                    ctx.status.min_distance = self.arrival_radius;
                    ctx.job.transit_stage = match self.destination {
                        Endpoint::Home => TransitStage::TransitionToHome,
                        Endpoint::Work => TransitStage::TransitionToWork,
                    };
                    self.phase = Phase::Travel;
                }
                Phase::Travel => {
                    if self.index >= self.path.len() {
                        ctx.vehicle.reset_gyros();
                        stop_thrust(ctx.vehicle.as_mut());
                        ctx.job.transit_stage = match self.destination {
                            Endpoint::Home => TransitStage::AtHome,
                            Endpoint::Work => TransitStage::AtWork,
                        };
                        self.phase = Phase::AwaitDocking;
                        continue;
                    }
                    if self.travel(ctx) {
                        // Reached the current waypoint: take the next one
                        // this same tick.
                        continue;
                    }
                    return StepResult::Continue;
                }
                Phase::AwaitDocking => {
                    if let Some(last) = self.path.last() {
                        let name = last.name().to_string();
                        if let Some(gate) = self.dock_gate {
                            if !gate(ctx, &name) {
                                return StepResult::Continue;
                            }
                        }
                    }
                    self.phase = Phase::Finished;
                }
                Phase::Finished => return StepResult::Done,
            }
        }
    }

    /// Capture the path and resume point. Returns `false` for an empty path
    /// (the journey completes immediately with no motion).
    fn init(&mut self, ctx: &mut DroneContext) -> bool {
        if ctx.job.path.is_empty() {
            return false;
        }

        let mut path = ctx.job.path.clone();
        if self.destination == Endpoint::Home {
            path.reverse();
        }

        let position = ctx.vehicle.world_frame().position;

        // Resume from the closest waypoint rather than restarting the path.
        let mut index = 0;
        let mut best = f64::INFINITY;
        for (i, wp) in path.iter().enumerate() {
            let d = (wp.world_position() - position).norm_squared();
            if d < best {
                best = d;
                index = i;
            }
        }

        let previous = if index > 0 {
            // Mid-path resume: synthesize a departure leg from the current
            // position toward the resume waypoint, leveled against gravity.
            let direction = path[index].world_position() - position;
            let gravity = ctx.vehicle.gravity();
            let up = if gravity.norm_squared() > 1e-9 {
                -gravity
            } else {
                ctx.vehicle.world_frame().up
            };
            let frame = Frame::new(position, project_on_plane(direction, up), up);
            Waypoint::new("Previous", &frame)
        } else {
            index = 1;
            path[0].clone()
        };

        ctx.status.destination = path.last().cloned();
        ctx.status.count = path.len();

        self.index = index;
        self.previous = Some(previous);
        self.path = path;
        true
    }

    /// One travel tick toward the current waypoint. Returns `true` when the
    /// waypoint is reached.
    fn travel(&mut self, ctx: &mut DroneContext) -> bool {
        let waypoint = self.path[self.index].clone();
        ctx.status.current = Some(waypoint.clone());
        ctx.status.left = self.path.len() - 1 - self.index;

        if move_towards_position(
            ctx.vehicle.as_mut(),
            waypoint.world_position(),
            self.speed,
            self.arrival_radius,
            false,
        ) {
            self.previous = Some(waypoint);
            self.index += 1;
            return true;
        }

        let position = ctx.vehicle.world_frame().position;
        let first = &self.path[0];
        let last = &self.path[self.path.len() - 1];
        let distance_to_last = (last.world_position() - position).norm();
        let distance = (first.world_position() - position)
            .norm()
            .min(distance_to_last);

        // Precision taper near either endpoint.
        if distance < TAPER_DISTANCE {
            self.speed =
                (distance * ctx.job.speed / TAPER_DISTANCE).max(MIN_APPROACH_SPEED);
            let half_width = ctx.vehicle.bounding_size().x / 2.0;
            self.arrival_radius =
                (distance * half_width / (TAPER_DISTANCE / 2.0)).max(MIN_ARRIVAL_RADIUS);
            ctx.status.speed = self.speed;
            ctx.status.min_distance = self.arrival_radius;
        }

        // Fly tail-first toward home while far out; align with the
        // destination once close.
        let previous = self.previous.clone().unwrap_or_else(|| first.clone());
        let reverse = self.destination == Endpoint::Home
            && distance_to_last > DESTINATION_ALIGN_DISTANCE
            && previous != self.path[0];
        let target_frame = if distance_to_last < DESTINATION_ALIGN_DISTANCE {
            last.frame()
        } else {
            previous.frame()
        };
        orient_to_frame(ctx.vehicle.as_mut(), &target_frame, reverse);

        false
    }
}

impl TaskRoutine<DroneContext> for GotoPosition {
    fn step(&mut self, ctx: &mut DroneContext, _dt: Duration) -> Result<StepResult, &'static str> {
        Ok(GotoPosition::step(self, ctx))
    }

    fn restart(&mut self) {
        self.phase = Phase::Init;
        self.path.clear();
        self.previous = None;
        self.index = 0;
        self.speed = MIN_APPROACH_SPEED;
        self.arrival_radius = MIN_ARRIVAL_RADIUS;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::job::JobDefinition;
    use crate::platform::mock::{MockVehicle, SharedVehicle};
    use nalgebra::Vector3;

    fn waypoint_at(name: &str, position: Vector3<f64>) -> Waypoint {
        let frame = Frame::new(
            position,
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(0.0, 1.0, 0.0),
        );
        Waypoint::new(name, &frame)
    }

    fn context_with_path(points: &[(&str, Vector3<f64>)]) -> (DroneContext, SharedVehicle) {
        let shared = SharedVehicle::new(MockVehicle::new());
        let mut job = JobDefinition::new("Default");
        job.path = points
            .iter()
            .map(|(name, position)| waypoint_at(name, *position))
            .collect();
        let ctx = DroneContext::new(Box::new(shared.clone()), job);
        (ctx, shared)
    }

    #[test]
    fn test_empty_path_completes_immediately_with_no_motion() {
        let (mut ctx, vehicle) = context_with_path(&[]);
        let mut goto = GotoPosition::new(Endpoint::Work, None, None);

        assert_eq!(goto.step(&mut ctx), StepResult::Done);
        assert!(goto.is_finished());
        assert_eq!(vehicle.borrow().total_override(), 0.0);
        assert!(!vehicle.borrow().gyro_override_active);
        assert_eq!(ctx.job.transit_stage, TransitStage::None);
    }

    #[test]
    fn test_travel_sets_transit_stage_and_tapers_speed() {
        let (mut ctx, _vehicle) = context_with_path(&[
            ("Home", Vector3::zeros()),
            ("Work", Vector3::new(0.0, 0.0, -300.0)),
        ]);
        let mut goto = GotoPosition::new(Endpoint::Work, None, None);

        assert_eq!(goto.step(&mut ctx), StepResult::Continue);
        assert_eq!(ctx.job.transit_stage, TransitStage::TransitionToWork);
        // Right at the departure endpoint, the taper floors apply.
        assert_eq!(ctx.status.speed, 2.0);
        assert_eq!(ctx.status.min_distance, 0.25);
        assert_eq!(ctx.status.count, 2);
        assert_eq!(
            ctx.status.destination.as_ref().map(Waypoint::name),
            Some("Work")
        );
    }

    #[test]
    fn test_arrival_resets_actuators_and_flips_stage() {
        let (mut ctx, vehicle) = context_with_path(&[
            ("Home", Vector3::zeros()),
            ("Work", Vector3::new(0.0, 0.0, -300.0)),
        ]);
        let mut goto = GotoPosition::new(Endpoint::Work, None, None);
        goto.step(&mut ctx);

        // Teleport to the destination: the next step arrives, resets the
        // actuators, flips the stage and (with no dock gate) completes.
        vehicle
            .borrow_mut()
            .set_position(Vector3::new(0.0, 0.0, -299.9));
        assert_eq!(goto.step(&mut ctx), StepResult::Done);
        assert_eq!(ctx.job.transit_stage, TransitStage::AtWork);
        assert_eq!(vehicle.borrow().total_override(), 0.0);
        assert!(!vehicle.borrow().gyro_override_active);
    }

    #[test]
    fn test_heading_home_walks_reversed_path() {
        let (mut ctx, vehicle) = context_with_path(&[
            ("Home", Vector3::zeros()),
            ("Work", Vector3::new(0.0, 0.0, -300.0)),
        ]);
        // Departing the work site: the path is walked in reverse.
        vehicle
            .borrow_mut()
            .set_position(Vector3::new(0.0, 0.0, -300.0));
        let mut goto = GotoPosition::new(Endpoint::Home, None, None);
        goto.step(&mut ctx);

        assert_eq!(ctx.job.transit_stage, TransitStage::TransitionToHome);
        assert_eq!(
            ctx.status.destination.as_ref().map(Waypoint::name),
            Some("Home")
        );
    }

    #[test]
    fn test_resume_starts_from_closest_waypoint() {
        let (mut ctx, vehicle) = context_with_path(&[
            ("Home", Vector3::zeros()),
            ("A", Vector3::new(0.0, 0.0, -100.0)),
            ("Work", Vector3::new(0.0, 0.0, -300.0)),
        ]);
        // Interrupted between A and Work: A is closest, so the journey
        // resumes at A rather than restarting at Home.
        vehicle
            .borrow_mut()
            .set_position(Vector3::new(0.0, 0.0, -130.0));
        let mut goto = GotoPosition::new(Endpoint::Work, None, None);

        assert_eq!(goto.step(&mut ctx), StepResult::Continue);
        assert_eq!(ctx.status.current.as_ref().map(Waypoint::name), Some("A"));
        assert_eq!(ctx.status.left, 1);
    }

    #[test]
    fn test_departure_gate_blocks_until_it_passes() {
        fn deny(_ctx: &mut DroneContext, _endpoint: &str) -> bool {
            false
        }

        let (mut ctx, vehicle) = context_with_path(&[
            ("Home", Vector3::zeros()),
            ("Work", Vector3::new(0.0, 0.0, -300.0)),
        ]);
        let mut goto = GotoPosition::new(Endpoint::Work, Some(deny), None);

        for _ in 0..5 {
            assert_eq!(goto.step(&mut ctx), StepResult::Continue);
        }
        // Blocked at the gate: no stage change, no motion.
        assert_eq!(ctx.job.transit_stage, TransitStage::None);
        assert_eq!(vehicle.borrow().total_override(), 0.0);
    }

    #[test]
    fn test_docking_gate_blocks_completion_after_stage_flip() {
        fn deny(_ctx: &mut DroneContext, _endpoint: &str) -> bool {
            false
        }

        let (mut ctx, vehicle) = context_with_path(&[
            ("Home", Vector3::zeros()),
            ("Work", Vector3::new(0.0, 0.0, -300.0)),
        ]);
        let mut goto = GotoPosition::new(Endpoint::Work, None, Some(deny));
        goto.step(&mut ctx);
        vehicle
            .borrow_mut()
            .set_position(Vector3::new(0.0, 0.0, -299.9));

        // Arrived, stage flipped, but the dock gate holds completion open.
        assert_eq!(goto.step(&mut ctx), StepResult::Continue);
        assert_eq!(ctx.job.transit_stage, TransitStage::AtWork);
        assert_eq!(goto.step(&mut ctx), StepResult::Continue);
        assert!(!goto.is_finished());
    }
}
