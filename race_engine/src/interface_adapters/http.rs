// Diagnostics routes over the race loop's command channel.

use crate::domain::errors::TraceError;
use crate::interface_adapters::protocol::{
    DebugSnapshotDto, PlayTraceRequest, RecordStartRequest, RecordStartResponse, RespawnRequest,
};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{FrameUpdate, InputTrace, ReplayResult, ReplayStatus, SimCommand};
use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{info, warn};

const DEFAULT_RECORDING_LABEL: &str = "recording";

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    // Human-readable error string for consistent JSON error responses.
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn loop_unavailable() -> ApiError {
    api_error(StatusCode::SERVICE_UNAVAILABLE, "race loop unavailable")
}

// Sends one command and waits for its reply.
async fn request<T>(
    state: &AppState,
    build: impl FnOnce(oneshot::Sender<T>) -> SimCommand,
) -> Result<T, ApiError> {
    let (reply, rx) = oneshot::channel();
    state.race.command_tx.send(build(reply)).await.map_err(|_| {
        warn!("race loop command channel closed");
        loop_unavailable()
    })?;
    rx.await.map_err(|_| loop_unavailable())
}

pub async fn debug_snapshot(State(state): State<Arc<AppState>>) -> Json<DebugSnapshotDto> {
    let snapshot = state.race.debug_tx.borrow().clone();
    Json(snapshot.into())
}

pub async fn race_state(State(state): State<Arc<AppState>>) -> Json<FrameUpdate> {
    Json(state.race.latest_frame_tx.borrow().clone())
}

pub async fn force_respawn(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RespawnRequest>,
) -> Result<Json<DebugSnapshotDto>, ApiError> {
    if payload.checkpoint_order < -1 {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "checkpoint_order must be >= -1",
        ));
    }
    if payload.initial_speed_kmh.is_some_and(|kmh| !kmh.is_finite()) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "initial_speed_kmh must be finite",
        ));
    }

    let snapshot = request(&state, |reply| SimCommand::Respawn {
        checkpoint_order: payload.checkpoint_order,
        initial_speed_kmh: payload.initial_speed_kmh,
        reply,
    })
    .await?;
    info!(
        checkpoint_order = payload.checkpoint_order,
        "debug respawn applied"
    );
    Ok(Json(snapshot.into()))
}

pub async fn start_recording(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RecordStartRequest>,
) -> Result<Json<RecordStartResponse>, ApiError> {
    let label = payload
        .label
        .filter(|label| !label.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_RECORDING_LABEL.to_string());

    let outcome = request(&state, |reply| SimCommand::StartRecording {
        label: label.clone(),
        reply,
    })
    .await?;

    match outcome {
        Ok(()) => Ok(Json(RecordStartResponse {
            recording: true,
            label,
        })),
        Err(TraceError::ReplayInProgress) => Err(api_error(
            StatusCode::CONFLICT,
            TraceError::ReplayInProgress.to_string(),
        )),
        Err(e) => Err(api_error(StatusCode::BAD_REQUEST, e.to_string())),
    }
}

pub async fn stop_recording(
    State(state): State<Arc<AppState>>,
) -> Result<Json<InputTrace>, ApiError> {
    let trace = request(&state, |reply| SimCommand::StopRecording { reply }).await?;
    Ok(Json(trace))
}

pub async fn play_trace(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<PlayTraceRequest>,
) -> Result<(StatusCode, Json<ReplayStatus>), ApiError> {
    if !payload.trace.is_object() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "trace must be a JSON object",
        ));
    }
    let trace = InputTrace::from_value(&payload.trace);
    let options = payload.options.unwrap_or_default();

    let status = request(&state, |reply| SimCommand::PlayTrace {
        trace,
        options,
        reply,
    })
    .await?;
    Ok((StatusCode::ACCEPTED, Json(status)))
}

pub async fn replay_status(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReplayStatus>, ApiError> {
    let status = request(&state, |reply| SimCommand::ReplayStatus { reply }).await?;
    Ok(Json(status))
}

pub async fn replay_result(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReplayResult>, ApiError> {
    request(&state, |reply| SimCommand::ReplayResult { reply })
        .await?
        .map(Json)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "no replay has finished yet"))
}
