use crate::use_cases::RaceHandle;
use axum::extract::ws::Utf8Bytes;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

#[derive(Clone)]
pub struct AppState {
    // Channels onto the race loop that owns the simulation.
    pub race: RaceHandle,
    // Serialized frame updates, shared across all connections.
    pub frame_bytes_tx: broadcast::Sender<Utf8Bytes>,
    // Latest serialized frame update for lag recovery.
    pub frame_latest_tx: watch::Sender<Utf8Bytes>,
    // Track being driven, announced to clients on connect.
    pub track_id: Arc<str>,
    pub fixed_step_hz: f32,
}
