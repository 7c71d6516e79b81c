//! Docking gates
//!
//! Gating predicates the goto sequencer polls at its departure and arrival
//! checkpoints. Departure waits for the endpoint's release condition (and a
//! minimum battery charge) before disconnecting; arrival locks the
//! connector. Both fire the endpoint's configured timer binding.

use crate::drone::command::Command;
use crate::drone::context::DroneContext;
use crate::parameters::job::{Endpoint, ReleaseCondition, TimerBinding};
use crate::platform::traits::ConnectorState;

/// Minimum battery charge (percent) to leave a connector.
pub const MIN_DEPARTURE_CHARGE: f64 = 15.0;

/// Cargo fill (percent) treated as full.
const FULL_FILL: f64 = 98.0;
/// Cargo fill (percent) treated as empty.
const EMPTY_FILL: f64 = 0.1;

/// Departure gate: `true` once the vehicle is free to fly.
///
/// With no connector engaged the vehicle is already free. Otherwise the
/// endpoint's release condition (and the battery floor) must hold, at which
/// point the connector releases and the leaving timer fires.
pub fn wait_for_undock(ctx: &mut DroneContext, endpoint: &str) -> bool {
    match ctx.vehicle.connector_state() {
        ConnectorState::Unavailable => true,
        ConnectorState::Ready | ConnectorState::Connected => {
            if !release_condition_met(ctx, endpoint) {
                return false;
            }
            ctx.vehicle.disconnect();
            fire_timer(ctx, leaving_binding(ctx, endpoint));
            true
        }
    }
}

/// Arrival gate: `true` once the connector has locked (and the docking
/// timer has fired).
pub fn wait_for_dock(ctx: &mut DroneContext, endpoint: &str) -> bool {
    match ctx.vehicle.connector_state() {
        ConnectorState::Unavailable => false,
        ConnectorState::Ready | ConnectorState::Connected => {
            ctx.vehicle.connect();
            fire_timer(ctx, docking_binding(ctx, endpoint));
            true
        }
    }
}

fn release_condition_met(ctx: &mut DroneContext, endpoint: &str) -> bool {
    if ctx.vehicle.battery_charge() < MIN_DEPARTURE_CHARGE {
        return false;
    }
    let condition = if endpoint == Endpoint::Home.name() {
        ctx.job.leave_home
    } else {
        ctx.job.leave_work
    };
    match condition {
        ReleaseCondition::ShipIsEmpty => ctx.vehicle.cargo_fill() < EMPTY_FILL,
        ReleaseCondition::ShipIsFull => ctx.vehicle.cargo_fill() > FULL_FILL,
        ReleaseCondition::UndockCommand => {
            if ctx.pending_commands.front() == Some(&Command::Undock) {
                ctx.pending_commands.pop_front();
                true
            } else {
                false
            }
        }
    }
}

fn leaving_binding(ctx: &DroneContext, endpoint: &str) -> TimerBinding {
    if endpoint == Endpoint::Home.name() {
        ctx.job.timer_leaving_home.clone()
    } else {
        ctx.job.timer_leaving_work.clone()
    }
}

fn docking_binding(ctx: &DroneContext, endpoint: &str) -> TimerBinding {
    if endpoint == Endpoint::Home.name() {
        ctx.job.timer_docking_home.clone()
    } else {
        ctx.job.timer_docking_work.clone()
    }
}

fn fire_timer(ctx: &mut DroneContext, binding: TimerBinding) {
    if let Some(name) = binding.timer {
        ctx.vehicle.fire_timer(&name, binding.trigger);
    }
}
