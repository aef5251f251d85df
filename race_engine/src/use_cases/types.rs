// Use-case level inputs/outputs for the race loop.

use crate::domain::errors::TraceError;
use crate::domain::{ControlVector, DebugSnapshot, RaceState, SimEvent, VehicleTelemetry};
use crate::use_cases::trace::{InputTrace, ReplayOptions, ReplayResult, ReplayStatus};
use serde::Serialize;
use tokio::sync::oneshot;

/// Requests into the race loop. Anything expecting an answer carries its reply channel.
#[derive(Debug)]
pub enum SimCommand {
    Control(ControlVector),
    Respawn {
        checkpoint_order: i64,
        initial_speed_kmh: Option<f32>,
        reply: oneshot::Sender<DebugSnapshot>,
    },
    StartRecording {
        label: String,
        reply: oneshot::Sender<Result<(), TraceError>>,
    },
    StopRecording {
        reply: oneshot::Sender<InputTrace>,
    },
    PlayTrace {
        trace: InputTrace,
        options: ReplayOptions,
        reply: oneshot::Sender<ReplayStatus>,
    },
    ReplayStatus {
        reply: oneshot::Sender<ReplayStatus>,
    },
    ReplayResult {
        reply: oneshot::Sender<Option<ReplayResult>>,
    },
}

/// What HUD and audio collaborators receive after every frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameUpdate {
    pub tick: u64,
    pub race: RaceState,
    pub telemetry: VehicleTelemetry,
    pub events: Vec<SimEvent>,
}
