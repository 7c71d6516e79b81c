//! Vehicle adapter trait
//!
//! Everything the autopilot core needs from the host vehicle, behind one
//! synchronous seam: telemetry queries with no side effects, plus the
//! explicit actuator writes (thrust/gyro overrides, tool enables, connector
//! and timer operations). The host wires its real blocks behind this trait;
//! tests use [`MockVehicle`](crate::platform::mock::MockVehicle).

use nalgebra::Vector3;

use crate::subsystems::navigation::types::Frame;

/// One of the six body-relative thrust axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Forward,
    Backward,
    Left,
    Right,
    Up,
    Down,
}

/// Snapshot of one thruster group: every thruster pushing the vehicle along
/// the same body axis.
#[derive(Debug, Clone)]
pub struct ThrusterGroup {
    pub axis: Axis,
    /// World-space direction the group pushes the vehicle.
    pub thrust_direction: Vector3<f64>,
    /// Maximum thrust per thruster in the group, newtons.
    pub max_thrust: Vec<f64>,
}

/// Connector readiness as seen by the docking gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    /// No connector in range of a mating part.
    Unavailable,
    /// In range and ready to lock.
    Ready,
    /// Locked.
    Connected,
}

/// How a named timer block is fired on dock/undock events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerTrigger {
    /// Run the timer's actions immediately.
    #[default]
    Now,
    /// Start its countdown.
    Countdown,
}

/// The host vehicle seam.
///
/// Telemetry methods are pure queries; actuator methods are the only side
/// effects. Exactly one job coroutine writes actuators at a time (the
/// lifecycle controller enforces the mutual exclusion), so implementations
/// need no locking.
pub trait VehicleAdapter {
    // --- telemetry ---

    /// World pose of the vehicle's controller block.
    fn world_frame(&self) -> Frame;

    /// Linear velocity in world space, m/s.
    fn linear_velocity(&self) -> Vector3<f64>;

    /// Natural gravity acceleration in world space, m/s^2.
    fn gravity(&self) -> Vector3<f64>;

    /// Current physical mass, kg.
    fn physical_mass(&self) -> f64;

    /// Bounding box size (width, height, length) in meters.
    fn bounding_size(&self) -> Vector3<f64>;

    /// Bounding sphere radius in meters.
    fn bounding_radius(&self) -> f64 {
        self.bounding_size().norm() / 2.0
    }

    /// Aggregate battery charge, percent 0-100.
    fn battery_charge(&self) -> f64;

    /// Aggregate cargo fill, percent 0-100.
    fn cargo_fill(&self) -> f64;

    /// Total quantity of non-garbage (ore) items aboard.
    fn ore_amount(&self) -> f64;

    /// Total quantity of garbage items aboard (what the sorters eject).
    fn garbage_amount(&self) -> f64;

    // --- thrusters ---

    /// Snapshot of every thruster group.
    fn thruster_groups(&self) -> Vec<ThrusterGroup>;

    /// Override one thruster's output, newtons.
    fn set_thrust_override(&mut self, axis: Axis, index: usize, newtons: f64);

    /// Zero every thrust override.
    fn reset_thrusters(&mut self);

    /// Enable/disable inertia dampeners.
    fn set_dampeners(&mut self, enabled: bool);

    // --- gyros ---

    /// World frames of every gyro (for transforming override vectors into
    /// each gyro's local basis).
    fn gyro_frames(&self) -> Vec<Frame>;

    /// Summed maximum torque of all gyros, newton-meters.
    fn gyro_torque_limit(&self) -> f64;

    /// Override one gyro's angular rates (rad/s in its local basis) at the
    /// given power fraction.
    fn set_gyro_override(&mut self, index: usize, pitch: f64, yaw: f64, roll: f64, power: f64);

    /// Release every gyro override back to normal control.
    fn reset_gyros(&mut self);

    // --- tools ---

    fn set_drills_enabled(&mut self, enabled: bool);

    /// Terrain-clearing mode: drills destroy voxels without collecting.
    fn set_terrain_clearing(&mut self, enabled: bool);

    /// Spread accumulated ore evenly across drill inventories.
    fn balance_drill_inventories(&mut self);

    fn set_sorters_enabled(&mut self, enabled: bool);

    // --- docking ---

    fn connector_state(&self) -> ConnectorState;

    fn connect(&mut self);

    fn disconnect(&mut self);

    /// Fire a named timer block. Unknown names are ignored by the host.
    fn fire_timer(&mut self, name: &str, trigger: TimerTrigger);
}
