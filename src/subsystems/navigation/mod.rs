//! Navigation subsystem
//!
//! Motion primitives (thrust and gyro control), work-area grid and shaft
//! route generation, waypoint types with their text codec, the path
//! recorder, and the goto sequencer that walks a recorded path between its
//! Home and Work endpoints.

pub mod goto;
pub mod grid;
pub mod motion;
pub mod recorder;
pub mod types;

pub use goto::{GateFn, GotoPosition};
pub use grid::{GridCell, RasterRoute, SpiralRoute};
pub use recorder::PathRecorder;
pub use types::{Frame, Waypoint};
