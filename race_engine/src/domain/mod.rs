// Domain layer: core simulation types and rules.

pub mod entities;
pub mod errors;
pub mod physics;
pub mod ports;
pub mod state;
pub mod systems;
pub mod track;
pub mod tuning;

pub use entities::BestTimes;
pub use errors::{StoreError, TraceError, TrackError};
pub use ports::{BestTimeStore, RigidBodyPort};
pub use state::{
    ControlVector, DebugSnapshot, RacePhase, RaceState, RespawnPose, SimEvent, VehicleTelemetry,
};
pub use track::{Track, TrackDefinition};
