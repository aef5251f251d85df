// Use cases layer: the tick pipeline and the frame loop that owns it.

pub mod diagnostics;
pub mod race_loop;
pub mod simulation;
pub mod trace;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use diagnostics::DiagnosticsPort;
pub use race_loop::{RaceHandle, RaceLoopSettings, spawn_race_loop};
pub use simulation::Simulation;
pub use trace::{InputTrace, ReplayOptions, ReplayResult, ReplayStatus, TraceFrame, TraceMode};
pub use types::{FrameUpdate, SimCommand};
