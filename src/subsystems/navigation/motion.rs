//! Motion primitives
//!
//! Closed-loop position seeking (thrust allocation against gravity and
//! inertia) and orientation alignment (gyro torque allocation). These are
//! per-tick functions: the caller invokes them every resume until they
//! report arrival/alignment.

use nalgebra::Vector3;

use crate::platform::traits::{Axis, VehicleAdapter};
use crate::subsystems::navigation::types::Frame;

/// Alignment tolerance for roll/pitch/yaw, radians.
pub const ALIGN_EPSILON: f64 = 0.01;

/// Proportional gain range for the velocity controller: slow approaches get
/// the high end, full-speed cruise the low end.
const GAIN_AT_MIN_SPEED: f64 = 13.0;
const GAIN_AT_MAX_SPEED: f64 = 1.0;
const GAIN_SPEED_MIN: f64 = 0.1;
const GAIN_SPEED_MAX: f64 = 30.0;

const RPM_TO_RAD_PER_SEC: f64 = std::f64::consts::PI / 30.0;

/// Linearly remap `value` from `[old_min, old_max]` to `[new_min, new_max]`.
pub fn remap(value: f64, old_min: f64, old_max: f64, new_min: f64, new_max: f64) -> f64 {
    (value - old_min) * (new_max - new_min) / (old_max - old_min) + new_min
}

/// [`remap`], clamped to the output range (which may be inverted, as with
/// the speed-to-gain mapping where a lower input produces a higher output).
pub fn remap_clamp(value: f64, old_min: f64, old_max: f64, new_min: f64, new_max: f64) -> f64 {
    let lo = new_min.min(new_max);
    let hi = new_min.max(new_max);
    remap(value, old_min, old_max, new_min, new_max).clamp(lo, hi)
}

/// Zero thrust overrides and hand velocity control back to the dampeners.
pub fn stop_thrust(vehicle: &mut dyn VehicleAdapter) {
    vehicle.reset_thrusters();
    vehicle.set_dampeners(true);
}

/// Drive the vehicle toward `target` at `desired_speed`.
///
/// Computes the velocity error toward the target, converts it to a thrust
/// vector with a speed-dependent proportional gain, pre-compensates for
/// gravity, and distributes the result over the thruster groups (projection
/// onto each group's facing, clamped to the group total, split
/// proportionally to each thruster's maximum).
///
/// Returns `true` once the distance to `target` is below `arrival_radius`;
/// on arrival the overrides are zeroed when `reset_on_arrival` is set (the
/// goto sequencer passes `false` between intermediate waypoints and resets
/// once at the end of the path).
pub fn move_towards_position(
    vehicle: &mut dyn VehicleAdapter,
    target: Vector3<f64>,
    desired_speed: f64,
    arrival_radius: f64,
    reset_on_arrival: bool,
) -> bool {
    let pose = vehicle.world_frame();
    let to_target = target - pose.position;
    let distance = to_target.norm();
    if distance < arrival_radius {
        if reset_on_arrival {
            stop_thrust(vehicle);
        }
        return true;
    }

    let direction = to_target / distance;
    let desired_velocity = direction * desired_speed;
    let velocity_error = desired_velocity - vehicle.linear_velocity();

    let gain = remap_clamp(
        desired_speed,
        GAIN_SPEED_MIN,
        GAIN_SPEED_MAX,
        GAIN_AT_MIN_SPEED,
        GAIN_AT_MAX_SPEED,
    );

    // Subtract gravity so the allocated thrust carries the hover load.
    let thrust = (velocity_error * gain - vehicle.gravity()) * vehicle.physical_mass();

    let groups = vehicle.thruster_groups();
    vehicle.set_dampeners(groups.iter().any(|g| g.axis == Axis::Down));

    for group in &groups {
        let total: f64 = group.max_thrust.iter().sum();
        if total <= 0.0 {
            continue;
        }
        let force = thrust.dot(&group.thrust_direction);
        let applied = force.clamp(0.0, total);
        for (index, max) in group.max_thrust.iter().enumerate() {
            vehicle.set_thrust_override(group.axis, index, applied * (max / total));
        }
    }

    false
}

/// Gyro power fraction needed to hold attitude against gravity and to
/// correct the current angular error within the acceleration budget.
///
/// Takes the larger of the gravity-holding torque (mass x g at a width/2
/// moment arm) and a moment-of-inertia estimate for correcting `angular_rate`
/// scaled by `magnitude`, clamped to the fleet's total capacity.
pub fn required_gyro_power(
    vehicle: &dyn VehicleAdapter,
    angular_rate: f64,
    magnitude: f64,
) -> f64 {
    if vehicle.gyro_frames().is_empty() {
        return 0.0;
    }

    let size = vehicle.bounding_size();
    let width = size.x;
    let height = size.y;
    let pivot = width / 2.0;

    let capacity = vehicle.gyro_torque_limit() * pivot;
    if capacity <= 0.0 {
        return 0.0;
    }

    let mass = vehicle.physical_mass();
    let hold = mass * vehicle.gravity().norm() * pivot;
    let inertia = mass * (width * width + height * height) / 12.0;
    let correction = inertia * angular_rate.abs() * magnitude;

    (hold + correction).min(capacity) / capacity
}

/// Apply an angular-rate override (ship-local pitch/yaw/roll, rad/s) to
/// every gyro, transformed into each gyro's own basis.
pub fn apply_gyro_override(
    vehicle: &mut dyn VehicleAdapter,
    pitch: f64,
    yaw: f64,
    roll: f64,
    power: f64,
) {
    let pose = vehicle.world_frame();
    let world = pose.local_to_world(Vector3::new(pitch, yaw, roll));
    let frames = vehicle.gyro_frames();
    for (index, gyro) in frames.iter().enumerate() {
        let local = gyro.world_to_local(world);
        vehicle.set_gyro_override(index, local.x, local.y, local.z, power);
    }
}

/// Rotate the vehicle toward `align_to` (its backward vector instead of
/// forward when `reverse` is set, for flying tail-first).
///
/// Returns `true` when roll, pitch and yaw errors are all below
/// [`ALIGN_EPSILON`] simultaneously.
pub fn orient_to_frame(vehicle: &mut dyn VehicleAdapter, align_to: &Frame, reverse: bool) -> bool {
    let pose = vehicle.world_frame();
    let down = align_to.down();
    let forward = if reverse {
        align_to.backward()
    } else {
        align_to.forward
    };

    let roll = down.dot(&pose.right()).atan2(down.dot(&pose.down()));
    let pitch = down.dot(&pose.backward()).atan2(down.dot(&pose.down()));
    let yaw = forward.dot(&pose.right()).atan2(forward.dot(&pose.forward));

    let power = required_gyro_power(vehicle, 30.0 * RPM_TO_RAD_PER_SEC, 5.0);
    apply_gyro_override(vehicle, pitch, yaw, -roll, power);

    roll.abs() < ALIGN_EPSILON && pitch.abs() < ALIGN_EPSILON && yaw.abs() < ALIGN_EPSILON
}

/// Frame at the vehicle's position with up opposing gravity and forward
/// projected onto the horizontal plane. Used for garbage dumping and for
/// synthesizing resume legs.
pub fn gravity_aligned_frame(vehicle: &dyn VehicleAdapter) -> Frame {
    let pose = vehicle.world_frame();
    let gravity = vehicle.gravity();
    if gravity.norm_squared() < 1e-9 {
        return pose;
    }
    let up = -gravity;
    let forward = project_on_plane(pose.forward, up);
    Frame::new(pose.position, forward, up)
}

/// Component of `v` perpendicular to `normal`.
pub fn project_on_plane(v: Vector3<f64>, normal: Vector3<f64>) -> Vector3<f64> {
    let n2 = normal.norm_squared();
    if n2 < 1e-12 {
        return v;
    }
    v - normal * (v.dot(&normal) / n2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockVehicle;

    #[test]
    fn test_remap_clamp_handles_inverted_output_range() {
        // Speed-to-gain: slow -> 13, fast -> 1, clamped inside [1, 13].
        assert!((remap_clamp(0.1, 0.1, 30.0, 13.0, 1.0) - 13.0).abs() < 1e-9);
        assert!((remap_clamp(30.0, 0.1, 30.0, 13.0, 1.0) - 1.0).abs() < 1e-9);
        assert!(remap_clamp(100.0, 0.1, 30.0, 13.0, 1.0) >= 1.0);
        assert!(remap_clamp(0.0, 0.1, 30.0, 13.0, 1.0) <= 13.0);
        let mid = remap_clamp(15.0, 0.1, 30.0, 13.0, 1.0);
        assert!(mid > 1.0 && mid < 13.0);
    }

    #[test]
    fn test_arrival_is_distance_below_radius() {
        let mut vehicle = MockVehicle::new();
        vehicle.set_position(Vector3::new(0.0, 0.0, 0.0));

        let target = Vector3::new(0.0, 0.0, -3.0);
        assert!(!move_towards_position(&mut vehicle, target, 5.0, 2.0, true));
        assert!(move_towards_position(&mut vehicle, target, 5.0, 3.5, true));
    }

    #[test]
    fn test_arrival_zeroes_thrust_overrides() {
        let mut vehicle = MockVehicle::new();
        let far = Vector3::new(0.0, 0.0, -50.0);
        assert!(!move_towards_position(&mut vehicle, far, 5.0, 2.0, true));
        assert!(vehicle.total_override() > 0.0);

        let near = Vector3::new(0.0, 0.0, -1.0);
        assert!(move_towards_position(&mut vehicle, near, 5.0, 2.0, true));
        assert!(vehicle.total_override() == 0.0);
        assert!(vehicle.dampeners_enabled());
    }

    #[test]
    fn test_thrust_respects_group_capacity() {
        let mut vehicle = MockVehicle::new();
        vehicle.set_mass(1.0e6); // demands far exceed capacity
        let target = Vector3::new(0.0, 0.0, -500.0);
        move_towards_position(&mut vehicle, target, 30.0, 2.0, true);

        for group in vehicle.thruster_groups() {
            let total: f64 = group.max_thrust.iter().sum();
            let applied = vehicle.group_override(group.axis);
            assert!(applied <= total + 1e-6);
        }
    }

    #[test]
    fn test_gravity_feed_forward_loads_lift_axis() {
        let mut vehicle = MockVehicle::new();
        vehicle.set_gravity(Vector3::new(0.0, -9.81, 0.0));
        // Hover in place: target at current position but outside the radius
        // along forward, at near-zero speed.
        let target = vehicle.world_frame().position + Vector3::new(0.0, 0.0, -100.0);
        move_towards_position(&mut vehicle, target, 0.1, 1.0, true);

        // The up group must carry at least the hover load.
        let hover = vehicle.physical_mass() * 9.81;
        assert!(vehicle.group_override(Axis::Up) > hover * 0.5);
    }

    #[test]
    fn test_closed_loop_converges_on_target() {
        let mut vehicle = MockVehicle::new();
        let target = Vector3::new(0.0, 0.0, -40.0);
        let dt = 0.1;
        let mut arrived = false;
        for _ in 0..600 {
            if move_towards_position(&mut vehicle, target, 5.0, 2.0, true) {
                arrived = true;
                break;
            }
            vehicle.step_physics(dt);
        }
        assert!(arrived, "vehicle never reached the target");
        assert!(vehicle.total_override() == 0.0);
    }

    #[test]
    fn test_orientation_aligned_iff_all_errors_small() {
        let mut vehicle = MockVehicle::new();
        let pose = vehicle.world_frame();

        // Aligned with own pose: immediately true.
        assert!(orient_to_frame(&mut vehicle, &pose, false));

        // Yawed target beyond the epsilon: not aligned.
        let yawed = Frame::new(
            pose.position,
            rotate_about(pose.forward, pose.up, 0.05),
            pose.up,
        );
        assert!(!orient_to_frame(&mut vehicle, &yawed, false));

        // Sub-epsilon yaw error: aligned.
        let nearly = Frame::new(
            pose.position,
            rotate_about(pose.forward, pose.up, 0.005),
            pose.up,
        );
        assert!(orient_to_frame(&mut vehicle, &nearly, false));
    }

    #[test]
    fn test_reverse_alignment_targets_backward_vector() {
        let mut vehicle = MockVehicle::new();
        let pose = vehicle.world_frame();
        // A target facing the opposite way is aligned only in reverse.
        let flipped = Frame::new(pose.position, pose.backward(), pose.up);
        assert!(!orient_to_frame(&mut vehicle, &flipped, false));
        assert!(orient_to_frame(&mut vehicle, &flipped, true));
    }

    #[test]
    fn test_required_gyro_power_clamps_to_capacity() {
        let mut vehicle = MockVehicle::new();
        vehicle.set_gravity(Vector3::new(0.0, -9.81, 0.0));
        let power = required_gyro_power(&vehicle, 10.0, 5.0);
        assert!(power > 0.0 && power <= 1.0);

        // A heavy vehicle saturates at full power.
        vehicle.set_mass(1.0e9);
        let saturated = required_gyro_power(&vehicle, 10.0, 5.0);
        assert!((saturated - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_gravity_aligned_frame_points_up_against_gravity() {
        let mut vehicle = MockVehicle::new();
        vehicle.set_gravity(Vector3::new(0.0, -9.81, 0.0));
        let frame = gravity_aligned_frame(&vehicle);
        assert!((frame.up - Vector3::new(0.0, 1.0, 0.0)).norm() < 1e-9);
        assert!(frame.forward.dot(&frame.up).abs() < 1e-9);
    }

    /// Rodrigues rotation of `v` about unit `axis` by `angle`.
    fn rotate_about(v: Vector3<f64>, axis: Vector3<f64>, angle: f64) -> Vector3<f64> {
        let axis = axis.normalize();
        v * angle.cos()
            + axis.cross(&v) * angle.sin()
            + axis * axis.dot(&v) * (1.0 - angle.cos())
    }
}
