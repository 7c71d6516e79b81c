//! Mining job state machine
//!
//! Digs a grid of shafts through the configured work volume. The stage is
//! persisted ([`MiningStage`]) so an interrupted job resumes where it left
//! off; per-stage working state (the active goto leg, dig bookkeeping,
//! garbage phase) is rebuilt on re-entry.
//!
//! Stage sequencing:
//!
//! ```text
//! None/TransitionToWork -> TransitionToWorkLocation -> TransitionToShaftStart
//!   -> DigShaft -> (ThrowGarbage <-> TransitionToShaftStart)
//!   -> ... -> TransitionToHome -> TransitionToWork -> ...
//!   -> Done -> (docked home, progress reset) -> finished
//! ```
//!
//! The shaft route (raster or spiral over the work grid) is generated once
//! at entry; `job.mining_progress` indexes into it and already-completed
//! shafts are skipped on resume.

use std::time::Duration;

use nalgebra::Vector3;

use crate::core::scheduler::{StepResult, TaskRoutine};
use crate::drone::context::DroneContext;
use crate::drone::docking::{wait_for_dock, wait_for_undock, MIN_DEPARTURE_CHARGE};
use crate::parameters::job::{DepthMode, Endpoint, JobDefinition, MiningStage, StartPosition};
use crate::subsystems::navigation::goto::GotoPosition;
use crate::subsystems::navigation::grid::{
    generate_work_grid, project_box_ahead, GridCell, RasterRoute, SpiralRoute,
};
use crate::subsystems::navigation::motion::{
    gravity_aligned_frame, move_towards_position, orient_to_frame,
};
use crate::subsystems::navigation::types::Frame;

/// Distance margin over the persisted work distance beyond which a resumed
/// stage is considered stale and navigation re-homes.
const RESUME_MARGIN: f64 = 2.0;
/// Speed for short hops between the work origin and shaft starts, m/s.
const TRANSIT_SPEED: f64 = 5.0;
/// Arrival radius for those hops, m.
const TRANSIT_RADIUS: f64 = 0.5;
/// Shaft depth in auto mode (dig until the vein dries up), m.
const AUTO_SHAFT_DEPTH: f64 = 50.0;
/// Seconds without ore gain before an auto-depth shaft is abandoned.
const ORE_DWELL_SECS: f64 = 5.0;
/// Ore quantity change below this counts as "no change".
const ORE_EPSILON: f64 = 0.01;
/// Cargo fill (percent) treated as full.
const FULL_FILL: f64 = 98.0;
/// Seconds of sorting after which a still-full cargo aborts to home.
const GARBAGE_GRACE_SECS: f64 = 5.0;

struct MiningPlan {
    frame: Frame,
    origin: Vector3<f64>,
    grid: Vec<Vec<Vector3<f64>>>,
    route: Vec<GridCell>,
}

#[derive(Default)]
struct DigState {
    drills_started: bool,
    previous_ore: f64,
    unchanged_secs: f64,
    /// Heading back to the shaft start after finishing or abandoning it.
    returning: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GarbagePhase {
    ReturnToStart,
    ToOrigin,
    Unload { elapsed: f64 },
}

pub struct MiningJob {
    plan: Option<MiningPlan>,
    goto_leg: Option<GotoPosition>,
    dig: DigState,
    garbage: GarbagePhase,
    returned_to_origin: bool,
}

impl MiningJob {
    pub fn new() -> Self {
        Self {
            plan: None,
            goto_leg: None,
            dig: DigState::default(),
            garbage: GarbagePhase::ReturnToStart,
            returned_to_origin: false,
        }
    }

    /// Build the work grid and route once at entry, and run the
    /// resume-safety check against the persisted work distance.
    fn ensure_plan(&mut self, ctx: &mut DroneContext) -> Result<(), &'static str> {
        if self.plan.is_some() {
            return Ok(());
        }

        let work = ctx
            .job
            .work_location
            .as_ref()
            .ok_or("no work location configured")?;
        let frame = work.frame();
        let (min, max) = project_box_ahead(&frame, ctx.job.dimensions);
        let grid = generate_work_grid(&frame, min, max, ctx.vehicle.bounding_size());
        let rows = grid.len();
        let cols = grid.first().map_or(0, Vec::len);
        let route: Vec<GridCell> = match ctx.job.start_position {
            StartPosition::Center => SpiralRoute::new(rows, cols).collect(),
            StartPosition::TopLeft => RasterRoute::new(rows, cols).collect(),
        };
        ctx.status.mining_route_len = route.len();

        // Resume safety: if we drifted further from the work origin than
        // the job last recorded, the persisted stage is stale (the vehicle
        // was moved while the script was down). Re-home instead of trusting
        // it.
        let distance = (ctx.vehicle.world_frame().position - frame.position).norm();
        if ctx.job.mining_stage != MiningStage::None
            && distance > ctx.job.work_distance + RESUME_MARGIN
        {
            log::warn!(
                "mining resume check failed ({:.1}m > {:.1}m + {:.0}m), re-homing",
                distance,
                ctx.job.work_distance,
                RESUME_MARGIN
            );
            ctx.job.mining_stage = MiningStage::None;
        }

        self.plan = Some(MiningPlan {
            frame,
            origin: frame.position,
            grid,
            route,
        });
        Ok(())
    }

    /// Entry and exit points of the shaft at the current route index.
    fn shaft_endpoints(&self, job: &JobDefinition) -> Option<(Vector3<f64>, Vector3<f64>)> {
        let plan = self.plan.as_ref()?;
        let cell = plan.route.get(job.mining_progress)?;
        let start = plan.grid[cell.row][cell.col];
        let depth = match job.depth_mode {
            DepthMode::Depth => job.dimensions.z,
            DepthMode::Auto => AUTO_SHAFT_DEPTH,
        };
        Some((start, start + plan.frame.forward * depth))
    }

    fn run(&mut self, ctx: &mut DroneContext, dt: f64) -> StepResult {
        let (frame, origin, route_len) = match &self.plan {
            Some(plan) => (plan.frame, plan.origin, plan.route.len()),
            None => return StepResult::Continue,
        };

        loop {
            match ctx.job.mining_stage {
                MiningStage::None | MiningStage::TransitionToWork => {
                    let leg = self.goto_leg.get_or_insert_with(|| {
                        GotoPosition::new(Endpoint::Work, Some(wait_for_undock), None)
                    });
                    if leg.step(ctx) == StepResult::Continue {
                        return StepResult::Continue;
                    }
                    self.goto_leg = None;
                    set_stage(ctx, MiningStage::TransitionToWorkLocation);
                }

                MiningStage::TransitionToWorkLocation => {
                    if !move_towards_position(
                        ctx.vehicle.as_mut(),
                        origin,
                        TRANSIT_SPEED,
                        TRANSIT_RADIUS,
                        true,
                    ) {
                        orient_to_frame(ctx.vehicle.as_mut(), &frame, false);
                        return StepResult::Continue;
                    }
                    set_stage(ctx, MiningStage::TransitionToShaftStart);
                }

                MiningStage::TransitionToShaftStart => {
                    let (start, _) = match self.shaft_endpoints(&ctx.job) {
                        Some(endpoints) => endpoints,
                        None => {
                            // Route exhausted (or empty work area).
                            set_stage(ctx, MiningStage::Done);
                            continue;
                        }
                    };
                    if !move_towards_position(
                        ctx.vehicle.as_mut(),
                        start,
                        TRANSIT_SPEED,
                        TRANSIT_RADIUS,
                        true,
                    ) {
                        orient_to_frame(ctx.vehicle.as_mut(), &frame, false);
                        return StepResult::Continue;
                    }
                    self.dig = DigState::default();
                    set_stage(ctx, MiningStage::DigShaft);
                }

                MiningStage::DigShaft => {
                    let (start, end) = match self.shaft_endpoints(&ctx.job) {
                        Some(endpoints) => endpoints,
                        None => {
                            set_stage(ctx, MiningStage::Done);
                            continue;
                        }
                    };

                    if self.dig.returning {
                        if !move_towards_position(
                            ctx.vehicle.as_mut(),
                            start,
                            TRANSIT_SPEED,
                            TRANSIT_RADIUS,
                            true,
                        ) {
                            orient_to_frame(ctx.vehicle.as_mut(), &frame, false);
                            return StepResult::Continue;
                        }
                        // Shaft finished: advance the route.
                        ctx.job.mining_progress += 1;
                        self.dig = DigState::default();
                        if ctx.job.mining_progress >= route_len {
                            set_stage(ctx, MiningStage::Done);
                        } else {
                            set_stage(ctx, MiningStage::TransitionToShaftStart);
                        }
                        continue;
                    }

                    if !self.dig.drills_started {
                        ctx.vehicle.set_terrain_clearing(ctx.job.terrain_clear);
                        ctx.vehicle.set_drills_enabled(true);
                        self.dig.drills_started = true;
                        self.dig.previous_ore = ctx.vehicle.ore_amount();
                        self.dig.unchanged_secs = 0.0;
                    }

                    if ctx.job.balance_drills {
                        ctx.vehicle.balance_drill_inventories();
                    }

                    // Abort checks run before motion so a drained battery or
                    // full cargo acts on the very next step.
                    let battery_low = ctx.vehicle.battery_charge() < MIN_DEPARTURE_CHARGE;
                    let cargo_full =
                        !ctx.job.terrain_clear && ctx.vehicle.cargo_fill() > FULL_FILL;
                    if battery_low || cargo_full {
                        self.garbage = GarbagePhase::ReturnToStart;
                        set_stage(ctx, MiningStage::ThrowGarbage);
                        continue;
                    }

                    if move_towards_position(
                        ctx.vehicle.as_mut(),
                        end,
                        ctx.job.work_speed,
                        TRANSIT_RADIUS,
                        true,
                    ) {
                        self.dig.returning = true;
                        continue;
                    }
                    orient_to_frame(ctx.vehicle.as_mut(), &frame, false);

                    // Auto depth: abandon the shaft once the vein stops
                    // yielding ore for the dwell period.
                    if ctx.job.depth_mode == DepthMode::Auto && !ctx.job.terrain_clear {
                        let ore = ctx.vehicle.ore_amount();
                        if (ore - self.dig.previous_ore).abs() < ORE_EPSILON {
                            self.dig.unchanged_secs += dt;
                            if self.dig.unchanged_secs >= ORE_DWELL_SECS {
                                self.dig.returning = true;
                                continue;
                            }
                        } else {
                            self.dig.unchanged_secs = 0.0;
                        }
                        self.dig.previous_ore = ore;
                    }

                    return StepResult::Continue;
                }

                MiningStage::ThrowGarbage => match self.garbage {
                    GarbagePhase::ReturnToStart => {
                        ctx.vehicle.set_drills_enabled(false);
                        let start = self.shaft_endpoints(&ctx.job).map(|(start, _)| start);
                        if let Some(start) = start {
                            if !move_towards_position(
                                ctx.vehicle.as_mut(),
                                start,
                                TRANSIT_SPEED,
                                TRANSIT_RADIUS,
                                true,
                            ) {
                                orient_to_frame(ctx.vehicle.as_mut(), &frame, false);
                                return StepResult::Continue;
                            }
                        }
                        self.garbage = GarbagePhase::ToOrigin;
                    }
                    GarbagePhase::ToOrigin => {
                        if !move_towards_position(
                            ctx.vehicle.as_mut(),
                            origin,
                            TRANSIT_SPEED,
                            TRANSIT_RADIUS,
                            true,
                        ) {
                            let level = gravity_aligned_frame(ctx.vehicle.as_ref());
                            orient_to_frame(ctx.vehicle.as_mut(), &level, false);
                            return StepResult::Continue;
                        }
                        ctx.vehicle.set_sorters_enabled(true);
                        self.garbage = GarbagePhase::Unload { elapsed: 0.0 };
                    }
                    GarbagePhase::Unload { elapsed } => {
                        let elapsed = elapsed + dt;
                        self.garbage = GarbagePhase::Unload { elapsed };

                        if ctx.vehicle.garbage_amount() <= 0.0 {
                            ctx.vehicle.set_sorters_enabled(false);
                            self.garbage = GarbagePhase::ReturnToStart;
                            let battery_low =
                                ctx.vehicle.battery_charge() < MIN_DEPARTURE_CHARGE;
                            let still_full = ctx.vehicle.cargo_fill() > FULL_FILL;
                            if battery_low || still_full {
                                set_stage(ctx, MiningStage::TransitionToHome);
                            } else {
                                set_stage(ctx, MiningStage::TransitionToShaftStart);
                            }
                            continue;
                        }

                        // No room freed up after the grace period: unload at
                        // the home dock instead.
                        if elapsed >= GARBAGE_GRACE_SECS && ctx.vehicle.cargo_fill() > FULL_FILL {
                            ctx.vehicle.set_sorters_enabled(false);
                            self.garbage = GarbagePhase::ReturnToStart;
                            set_stage(ctx, MiningStage::TransitionToHome);
                            continue;
                        }

                        return StepResult::Continue;
                    }
                },

                MiningStage::TransitionToHome => {
                    ctx.vehicle.set_drills_enabled(false);
                    let leg = self.goto_leg.get_or_insert_with(|| {
                        GotoPosition::new(Endpoint::Home, None, Some(wait_for_dock))
                    });
                    if leg.step(ctx) == StepResult::Continue {
                        return StepResult::Continue;
                    }
                    self.goto_leg = None;
                    // Unloaded at home: head back out for the next shaft.
                    set_stage(ctx, MiningStage::TransitionToWork);
                }

                MiningStage::Done => {
                    ctx.vehicle.set_drills_enabled(false);
                    if !self.returned_to_origin {
                        if !move_towards_position(
                            ctx.vehicle.as_mut(),
                            origin,
                            TRANSIT_SPEED,
                            TRANSIT_RADIUS,
                            true,
                        ) {
                            orient_to_frame(ctx.vehicle.as_mut(), &frame, false);
                            return StepResult::Continue;
                        }
                        self.returned_to_origin = true;
                    }
                    let leg = self.goto_leg.get_or_insert_with(|| {
                        GotoPosition::new(Endpoint::Home, None, Some(wait_for_dock))
                    });
                    if leg.step(ctx) == StepResult::Continue {
                        return StepResult::Continue;
                    }
                    self.goto_leg = None;
                    ctx.job.mining_progress = 0;
                    set_stage(ctx, MiningStage::None);
                    log::info!("mining job complete");
                    return StepResult::Done;
                }
            }
        }
    }
}

impl Default for MiningJob {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRoutine<DroneContext> for MiningJob {
    fn step(&mut self, ctx: &mut DroneContext, dt: Duration) -> Result<StepResult, &'static str> {
        self.ensure_plan(ctx)?;
        let result = self.run(ctx, dt.as_secs_f64());
        if let Some(plan) = &self.plan {
            ctx.job.work_distance = (ctx.vehicle.world_frame().position - plan.origin).norm();
        }
        Ok(result)
    }

    fn restart(&mut self) {
        self.plan = None;
        self.goto_leg = None;
        self.dig = DigState::default();
        self.garbage = GarbagePhase::ReturnToStart;
        self.returned_to_origin = false;
    }
}

fn set_stage(ctx: &mut DroneContext, stage: MiningStage) {
    if ctx.job.mining_stage != stage {
        log::info!(
            "mining stage: {:?} -> {:?}",
            ctx.job.mining_stage,
            stage
        );
        ctx.job.mining_stage = stage;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::job::JobKind;
    use crate::platform::mock::{MockVehicle, SharedVehicle};
    use crate::subsystems::navigation::types::Waypoint;

    /// Work frame at the origin, boring along -z. Vehicle bounding size 2
    /// gives 3m grid cells, so dimensions 12.5 x 9.5 produce a 3x4 grid.
    fn mining_context() -> (DroneContext, SharedVehicle) {
        let mut vehicle = MockVehicle::new();
        vehicle.set_bounding_size(Vector3::new(2.0, 2.0, 2.0));
        let shared = SharedVehicle::new(vehicle);

        let work_frame = Frame::new(
            Vector3::zeros(),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(0.0, 1.0, 0.0),
        );
        let home_frame = Frame::new(
            Vector3::new(0.0, 0.0, 200.0),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(0.0, 1.0, 0.0),
        );
        let near_work_frame = Frame::new(
            Vector3::new(0.0, 0.0, 10.0),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(0.0, 1.0, 0.0),
        );

        let mut job = JobDefinition::new("Default");
        job.kind = JobKind::MiningGrinding;
        job.dimensions = Vector3::new(12.5, 9.5, 10.0);
        job.work_location = Some(Waypoint::new("WorkLocation", &work_frame));
        job.path = vec![
            Waypoint::new("Home", &home_frame),
            Waypoint::new("Work", &near_work_frame),
        ];

        let ctx = DroneContext::new(Box::new(shared.clone()), job);
        (ctx, shared)
    }

    fn step(job: &mut MiningJob, ctx: &mut DroneContext, dt_secs: f64) -> StepResult {
        job.step(ctx, Duration::from_secs_f64(dt_secs))
            .expect("mining step")
    }

    #[test]
    fn test_route_length_reported_for_3x4_grid() {
        let (mut ctx, _vehicle) = mining_context();
        let mut job = MiningJob::new();
        step(&mut job, &mut ctx, 0.1);
        assert_eq!(ctx.status.mining_route_len, 12);
    }

    #[test]
    fn test_missing_work_location_is_a_transient_error() {
        let (mut ctx, _vehicle) = mining_context();
        ctx.job.work_location = None;
        let mut job = MiningJob::new();
        assert!(job.step(&mut ctx, Duration::from_millis(100)).is_err());
    }

    #[test]
    fn test_resume_safety_forces_stage_to_none_when_too_far() {
        let (mut ctx, vehicle) = mining_context();
        ctx.job.mining_stage = MiningStage::DigShaft;
        ctx.job.work_distance = 40.0;
        vehicle
            .borrow_mut()
            .set_position(Vector3::new(43.5, 0.0, 0.0));

        let mut job = MiningJob::new();
        step(&mut job, &mut ctx, 0.1);
        assert_eq!(ctx.job.mining_stage, MiningStage::None);
    }

    #[test]
    fn test_resume_safety_keeps_stage_within_margin() {
        let (mut ctx, vehicle) = mining_context();
        ctx.job.mining_stage = MiningStage::DigShaft;
        ctx.job.work_distance = 40.0;
        vehicle
            .borrow_mut()
            .set_position(Vector3::new(41.0, 0.0, 0.0));

        let mut job = MiningJob::new();
        step(&mut job, &mut ctx, 0.1);
        assert_eq!(ctx.job.mining_stage, MiningStage::DigShaft);
    }

    #[test]
    fn test_work_distance_tracks_current_position() {
        let (mut ctx, vehicle) = mining_context();
        ctx.job.mining_stage = MiningStage::DigShaft;
        ctx.job.work_distance = 100.0;
        vehicle
            .borrow_mut()
            .set_position(Vector3::new(30.0, 0.0, 0.0));

        let mut job = MiningJob::new();
        step(&mut job, &mut ctx, 0.1);
        assert!((ctx.job.work_distance - 30.0).abs() < 1.0);
    }

    #[test]
    fn test_low_battery_aborts_dig_to_throw_garbage() {
        let (mut ctx, vehicle) = mining_context();
        ctx.job.mining_stage = MiningStage::DigShaft;
        ctx.job.work_distance = 100.0;
        vehicle.borrow_mut().set_battery_charge(10.0);

        let mut job = MiningJob::new();
        step(&mut job, &mut ctx, 0.1);
        assert_eq!(ctx.job.mining_stage, MiningStage::ThrowGarbage);
        assert!(!vehicle.borrow().drills_enabled);
    }

    #[test]
    fn test_full_cargo_aborts_dig_unless_terrain_clearing() {
        let (mut ctx, vehicle) = mining_context();
        ctx.job.mining_stage = MiningStage::DigShaft;
        ctx.job.work_distance = 100.0;
        vehicle.borrow_mut().set_cargo_fill(99.0);

        let mut job = MiningJob::new();
        step(&mut job, &mut ctx, 0.1);
        assert_eq!(ctx.job.mining_stage, MiningStage::ThrowGarbage);

        // Terrain clearing discards spoil, so a full cargo is no reason to
        // stop.
        let (mut ctx, vehicle) = mining_context();
        ctx.job.mining_stage = MiningStage::DigShaft;
        ctx.job.work_distance = 100.0;
        ctx.job.terrain_clear = true;
        vehicle.borrow_mut().set_cargo_fill(99.0);

        let mut job = MiningJob::new();
        step(&mut job, &mut ctx, 0.1);
        assert_eq!(ctx.job.mining_stage, MiningStage::DigShaft);
        assert!(vehicle.borrow().drills_enabled);
        assert!(vehicle.borrow().terrain_clearing);
    }

    #[test]
    fn test_dig_enables_drills_and_balances_inventories() {
        let (mut ctx, vehicle) = mining_context();
        ctx.job.mining_stage = MiningStage::DigShaft;
        ctx.job.work_distance = 100.0;

        let mut job = MiningJob::new();
        step(&mut job, &mut ctx, 0.1);
        assert!(vehicle.borrow().drills_enabled);
        assert!(vehicle.borrow().balance_calls > 0);

        // Balancing disabled: no further calls.
        let calls = vehicle.borrow().balance_calls;
        ctx.job.balance_drills = false;
        step(&mut job, &mut ctx, 0.1);
        assert_eq!(vehicle.borrow().balance_calls, calls);
    }

    #[test]
    fn test_completed_shaft_advances_route_progress() {
        let (mut ctx, vehicle) = mining_context();
        ctx.job.mining_stage = MiningStage::DigShaft;
        ctx.job.work_distance = 100.0;

        let mut job = MiningJob::new();
        // Build the plan and start digging.
        step(&mut job, &mut ctx, 0.1);
        let (start, end) = job.shaft_endpoints(&ctx.job).expect("shaft");

        // Teleport to the shaft end: the dig completes and the return leg
        // begins.
        vehicle.borrow_mut().set_position(end);
        step(&mut job, &mut ctx, 0.1);
        assert_eq!(ctx.job.mining_progress, 0, "still returning to start");

        // Back at the start: progress advances to the next shaft.
        vehicle.borrow_mut().set_position(start);
        step(&mut job, &mut ctx, 0.1);
        assert_eq!(ctx.job.mining_progress, 1);
        assert_eq!(ctx.job.mining_stage, MiningStage::TransitionToShaftStart);
    }

    #[test]
    fn test_auto_depth_abandons_shaft_after_ore_dwell() {
        let (mut ctx, vehicle) = mining_context();
        ctx.job.mining_stage = MiningStage::DigShaft;
        ctx.job.work_distance = 100.0;
        ctx.job.depth_mode = DepthMode::Auto;
        // Ore quantity never changes: the vein is dry.

        let mut job = MiningJob::new();
        for _ in 0..6 {
            step(&mut job, &mut ctx, 1.0);
        }
        // The dwell expired, so the machine is returning to the shaft
        // start; teleport there and confirm the route advances without the
        // shaft end ever being reached.
        let (start, _) = job.shaft_endpoints(&ctx.job).expect("shaft");
        vehicle.borrow_mut().set_position(start);
        step(&mut job, &mut ctx, 1.0);
        assert_eq!(ctx.job.mining_progress, 1);
    }

    #[test]
    fn test_throw_garbage_unloads_then_heads_home_when_battery_low() {
        let (mut ctx, vehicle) = mining_context();
        ctx.job.mining_stage = MiningStage::DigShaft;
        ctx.job.work_distance = 100.0;
        vehicle.borrow_mut().set_battery_charge(10.0);
        vehicle.borrow_mut().set_garbage_amount(5.0);

        let mut job = MiningJob::new();
        // Abort into ThrowGarbage, then walk its phases by teleporting.
        step(&mut job, &mut ctx, 0.1);
        assert_eq!(ctx.job.mining_stage, MiningStage::ThrowGarbage);

        let (start, _) = job.shaft_endpoints(&ctx.job).expect("shaft");
        vehicle.borrow_mut().set_position(start);
        step(&mut job, &mut ctx, 0.1); // reaches start, heads for origin

        vehicle.borrow_mut().set_position(Vector3::zeros());
        step(&mut job, &mut ctx, 0.1); // reaches origin, sorters on
        assert!(vehicle.borrow().sorters_enabled);

        // Garbage still aboard: keep sorting.
        step(&mut job, &mut ctx, 0.1);
        assert_eq!(ctx.job.mining_stage, MiningStage::ThrowGarbage);

        // Emptied, but the battery is still low: unload trip home.
        vehicle.borrow_mut().set_garbage_amount(0.0);
        step(&mut job, &mut ctx, 0.1);
        assert!(!vehicle.borrow().sorters_enabled);
        assert_eq!(ctx.job.mining_stage, MiningStage::TransitionToHome);
    }

    #[test]
    fn test_throw_garbage_returns_to_next_shaft_when_healthy() {
        let (mut ctx, vehicle) = mining_context();
        ctx.job.mining_stage = MiningStage::DigShaft;
        ctx.job.work_distance = 100.0;
        vehicle.borrow_mut().set_cargo_fill(99.0);
        vehicle.borrow_mut().set_garbage_amount(5.0);

        let mut job = MiningJob::new();
        step(&mut job, &mut ctx, 0.1);
        assert_eq!(ctx.job.mining_stage, MiningStage::ThrowGarbage);

        let (start, _) = job.shaft_endpoints(&ctx.job).expect("shaft");
        vehicle.borrow_mut().set_position(start);
        step(&mut job, &mut ctx, 0.1);
        vehicle.borrow_mut().set_position(Vector3::zeros());
        step(&mut job, &mut ctx, 0.1);

        // Sorting frees the cargo and drains the garbage: back to digging
        // the same shaft.
        vehicle.borrow_mut().set_cargo_fill(40.0);
        vehicle.borrow_mut().set_garbage_amount(0.0);
        step(&mut job, &mut ctx, 0.1);
        assert_eq!(ctx.job.mining_stage, MiningStage::TransitionToShaftStart);
        assert_eq!(ctx.job.mining_progress, 0);
    }

    #[test]
    fn test_route_exhaustion_reaches_done_and_resets_progress() {
        let (mut ctx, vehicle) = mining_context();
        ctx.job.mining_stage = MiningStage::TransitionToShaftStart;
        ctx.job.mining_progress = 12; // past the 3x4 route
        ctx.job.work_distance = 100.0;
        vehicle.borrow_mut().set_position(Vector3::zeros());

        let mut job = MiningJob::new();
        // Route exhausted: Done returns to the origin (already there) and
        // heads home along the path.
        step(&mut job, &mut ctx, 0.1);
        assert_eq!(ctx.job.mining_stage, MiningStage::Done);

        // Teleport home; the dock gate needs a ready connector.
        vehicle
            .borrow_mut()
            .set_position(Vector3::new(0.0, 0.0, 200.0));
        vehicle
            .borrow_mut()
            .set_connector_state(crate::platform::traits::ConnectorState::Ready);
        let result = step(&mut job, &mut ctx, 0.1);
        assert_eq!(result, StepResult::Done);
        assert_eq!(ctx.job.mining_stage, MiningStage::None);
        assert_eq!(ctx.job.mining_progress, 0);
    }
}
