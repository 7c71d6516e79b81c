//! Drone job logic: state machines, docking gates, lifecycle control.

pub mod command;
pub mod context;
pub mod controller;
pub mod docking;
pub mod job;
