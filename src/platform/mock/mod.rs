//! Mock vehicle
//!
//! Deterministic stand-in for the host vehicle: integrates thrust overrides
//! and gravity into velocity/position on demand (`step_physics`), records
//! every actuator call, and lets tests script telemetry (battery, cargo
//! fill, ore and garbage quantities, connector readiness).
//!
//! Gyro overrides are recorded but not integrated into the pose; tests
//! assert on the commanded rates, not on closed-loop attitude dynamics.

use std::collections::HashMap;

use nalgebra::Vector3;

use crate::platform::traits::{
    Axis, ConnectorState, ThrusterGroup, TimerTrigger, VehicleAdapter,
};
use crate::subsystems::navigation::types::Frame;

const ALL_AXES: [Axis; 6] = [
    Axis::Forward,
    Axis::Backward,
    Axis::Left,
    Axis::Right,
    Axis::Up,
    Axis::Down,
];

/// Recorded gyro override command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GyroCommand {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
    pub power: f64,
}

pub struct MockVehicle {
    frame: Frame,
    velocity: Vector3<f64>,
    gravity: Vector3<f64>,
    mass: f64,
    bounding_size: Vector3<f64>,
    thrust_per_axis: f64,
    overrides: HashMap<Axis, f64>,
    dampeners: bool,

    gyro_torque_limit: f64,
    pub last_gyro_command: Option<GyroCommand>,
    pub gyro_override_active: bool,

    battery: f64,
    fill: f64,
    ore: f64,
    garbage: f64,

    pub drills_enabled: bool,
    pub terrain_clearing: bool,
    pub sorters_enabled: bool,
    pub balance_calls: u32,

    connector: ConnectorState,
    pub connect_calls: u32,
    pub disconnect_calls: u32,
    pub timer_events: Vec<(String, TimerTrigger)>,
}

impl MockVehicle {
    pub fn new() -> Self {
        Self {
            frame: Frame::new(
                Vector3::zeros(),
                Vector3::new(0.0, 0.0, -1.0),
                Vector3::new(0.0, 1.0, 0.0),
            ),
            velocity: Vector3::zeros(),
            gravity: Vector3::zeros(),
            mass: 10_000.0,
            bounding_size: Vector3::new(5.0, 4.0, 6.0),
            thrust_per_axis: 120_000.0,
            overrides: HashMap::new(),
            dampeners: true,
            gyro_torque_limit: 3.36e7,
            last_gyro_command: None,
            gyro_override_active: false,
            battery: 100.0,
            fill: 0.0,
            ore: 0.0,
            garbage: 0.0,
            drills_enabled: false,
            terrain_clearing: false,
            sorters_enabled: false,
            balance_calls: 0,
            connector: ConnectorState::Unavailable,
            connect_calls: 0,
            disconnect_calls: 0,
            timer_events: Vec::new(),
        }
    }

    // --- scripting knobs ---

    pub fn set_position(&mut self, position: Vector3<f64>) {
        self.frame.position = position;
    }

    pub fn set_frame(&mut self, frame: Frame) {
        self.frame = frame;
    }

    pub fn set_velocity(&mut self, velocity: Vector3<f64>) {
        self.velocity = velocity;
    }

    pub fn set_gravity(&mut self, gravity: Vector3<f64>) {
        self.gravity = gravity;
    }

    pub fn set_mass(&mut self, mass: f64) {
        self.mass = mass;
    }

    pub fn set_bounding_size(&mut self, size: Vector3<f64>) {
        self.bounding_size = size;
    }

    pub fn set_battery_charge(&mut self, percent: f64) {
        self.battery = percent;
    }

    pub fn set_cargo_fill(&mut self, percent: f64) {
        self.fill = percent;
    }

    pub fn set_ore_amount(&mut self, amount: f64) {
        self.ore = amount;
    }

    pub fn set_garbage_amount(&mut self, amount: f64) {
        self.garbage = amount;
    }

    pub fn set_connector_state(&mut self, state: ConnectorState) {
        self.connector = state;
    }

    // --- inspection ---

    /// Sum of all thrust overrides, newtons.
    pub fn total_override(&self) -> f64 {
        self.overrides.values().sum()
    }

    /// Override applied to one axis group, newtons.
    pub fn group_override(&self, axis: Axis) -> f64 {
        self.overrides.get(&axis).copied().unwrap_or(0.0)
    }

    pub fn dampeners_enabled(&self) -> bool {
        self.dampeners
    }

    fn axis_direction(&self, axis: Axis) -> Vector3<f64> {
        match axis {
            Axis::Forward => self.frame.forward,
            Axis::Backward => self.frame.backward(),
            Axis::Left => -self.frame.right(),
            Axis::Right => self.frame.right(),
            Axis::Up => self.frame.up,
            Axis::Down => self.frame.down(),
        }
    }

    /// Integrate thrust overrides and gravity over `dt` seconds.
    pub fn step_physics(&mut self, dt: f64) {
        let mut force = self.gravity * self.mass;
        for axis in ALL_AXES {
            force += self.axis_direction(axis) * self.group_override(axis);
        }
        let acceleration = force / self.mass;
        self.velocity += acceleration * dt;
        self.frame.position += self.velocity * dt;
    }
}

impl Default for MockVehicle {
    fn default() -> Self {
        Self::new()
    }
}

impl VehicleAdapter for MockVehicle {
    fn world_frame(&self) -> Frame {
        self.frame
    }

    fn linear_velocity(&self) -> Vector3<f64> {
        self.velocity
    }

    fn gravity(&self) -> Vector3<f64> {
        self.gravity
    }

    fn physical_mass(&self) -> f64 {
        self.mass
    }

    fn bounding_size(&self) -> Vector3<f64> {
        self.bounding_size
    }

    fn battery_charge(&self) -> f64 {
        self.battery
    }

    fn cargo_fill(&self) -> f64 {
        self.fill
    }

    fn ore_amount(&self) -> f64 {
        self.ore
    }

    fn garbage_amount(&self) -> f64 {
        self.garbage
    }

    fn thruster_groups(&self) -> Vec<ThrusterGroup> {
        ALL_AXES
            .iter()
            .map(|&axis| ThrusterGroup {
                axis,
                thrust_direction: self.axis_direction(axis),
                max_thrust: vec![self.thrust_per_axis],
            })
            .collect()
    }

    fn set_thrust_override(&mut self, axis: Axis, _index: usize, newtons: f64) {
        self.overrides.insert(axis, newtons);
    }

    fn reset_thrusters(&mut self) {
        self.overrides.clear();
    }

    fn set_dampeners(&mut self, enabled: bool) {
        self.dampeners = enabled;
    }

    fn gyro_frames(&self) -> Vec<Frame> {
        vec![self.frame]
    }

    fn gyro_torque_limit(&self) -> f64 {
        self.gyro_torque_limit
    }

    fn set_gyro_override(&mut self, _index: usize, pitch: f64, yaw: f64, roll: f64, power: f64) {
        self.gyro_override_active = true;
        self.last_gyro_command = Some(GyroCommand {
            pitch,
            yaw,
            roll,
            power,
        });
    }

    fn reset_gyros(&mut self) {
        self.gyro_override_active = false;
        self.last_gyro_command = None;
    }

    fn set_drills_enabled(&mut self, enabled: bool) {
        self.drills_enabled = enabled;
    }

    fn set_terrain_clearing(&mut self, enabled: bool) {
        self.terrain_clearing = enabled;
    }

    fn balance_drill_inventories(&mut self) {
        self.balance_calls += 1;
    }

    fn set_sorters_enabled(&mut self, enabled: bool) {
        self.sorters_enabled = enabled;
    }

    fn connector_state(&self) -> ConnectorState {
        self.connector
    }

    fn connect(&mut self) {
        self.connect_calls += 1;
        if self.connector == ConnectorState::Ready {
            self.connector = ConnectorState::Connected;
        }
    }

    fn disconnect(&mut self) {
        self.disconnect_calls += 1;
        if self.connector == ConnectorState::Connected {
            self.connector = ConnectorState::Ready;
        }
    }

    fn fire_timer(&mut self, name: &str, trigger: TimerTrigger) {
        self.timer_events.push((name.to_string(), trigger));
    }
}

/// Clonable handle to a [`MockVehicle`] that itself implements
/// [`VehicleAdapter`].
///
/// Scenario tests hand one clone to the drone context (as the boxed
/// adapter) and keep another to script telemetry and inspect actuator
/// state mid-scenario. Single-threaded by the same contract as the rest of
/// the runtime.
#[derive(Clone)]
pub struct SharedVehicle {
    inner: std::rc::Rc<std::cell::RefCell<MockVehicle>>,
}

impl SharedVehicle {
    pub fn new(vehicle: MockVehicle) -> Self {
        Self {
            inner: std::rc::Rc::new(std::cell::RefCell::new(vehicle)),
        }
    }

    pub fn borrow(&self) -> std::cell::Ref<'_, MockVehicle> {
        self.inner.borrow()
    }

    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, MockVehicle> {
        self.inner.borrow_mut()
    }
}

impl VehicleAdapter for SharedVehicle {
    fn world_frame(&self) -> Frame {
        self.inner.borrow().world_frame()
    }

    fn linear_velocity(&self) -> Vector3<f64> {
        self.inner.borrow().linear_velocity()
    }

    fn gravity(&self) -> Vector3<f64> {
        self.inner.borrow().gravity()
    }

    fn physical_mass(&self) -> f64 {
        self.inner.borrow().physical_mass()
    }

    fn bounding_size(&self) -> Vector3<f64> {
        self.inner.borrow().bounding_size()
    }

    fn battery_charge(&self) -> f64 {
        self.inner.borrow().battery_charge()
    }

    fn cargo_fill(&self) -> f64 {
        self.inner.borrow().cargo_fill()
    }

    fn ore_amount(&self) -> f64 {
        self.inner.borrow().ore_amount()
    }

    fn garbage_amount(&self) -> f64 {
        self.inner.borrow().garbage_amount()
    }

    fn thruster_groups(&self) -> Vec<ThrusterGroup> {
        self.inner.borrow().thruster_groups()
    }

    fn set_thrust_override(&mut self, axis: Axis, index: usize, newtons: f64) {
        self.inner.borrow_mut().set_thrust_override(axis, index, newtons);
    }

    fn reset_thrusters(&mut self) {
        self.inner.borrow_mut().reset_thrusters();
    }

    fn set_dampeners(&mut self, enabled: bool) {
        self.inner.borrow_mut().set_dampeners(enabled);
    }

    fn gyro_frames(&self) -> Vec<Frame> {
        self.inner.borrow().gyro_frames()
    }

    fn gyro_torque_limit(&self) -> f64 {
        self.inner.borrow().gyro_torque_limit()
    }

    fn set_gyro_override(&mut self, index: usize, pitch: f64, yaw: f64, roll: f64, power: f64) {
        self.inner
            .borrow_mut()
            .set_gyro_override(index, pitch, yaw, roll, power);
    }

    fn reset_gyros(&mut self) {
        self.inner.borrow_mut().reset_gyros();
    }

    fn set_drills_enabled(&mut self, enabled: bool) {
        self.inner.borrow_mut().set_drills_enabled(enabled);
    }

    fn set_terrain_clearing(&mut self, enabled: bool) {
        self.inner.borrow_mut().set_terrain_clearing(enabled);
    }

    fn balance_drill_inventories(&mut self) {
        self.inner.borrow_mut().balance_drill_inventories();
    }

    fn set_sorters_enabled(&mut self, enabled: bool) {
        self.inner.borrow_mut().set_sorters_enabled(enabled);
    }

    fn connector_state(&self) -> ConnectorState {
        self.inner.borrow().connector_state()
    }

    fn connect(&mut self) {
        self.inner.borrow_mut().connect();
    }

    fn disconnect(&mut self) {
        self.inner.borrow_mut().disconnect();
    }

    fn fire_timer(&mut self, name: &str, trigger: TimerTrigger) {
        self.inner.borrow_mut().fire_timer(name, trigger);
    }
}
