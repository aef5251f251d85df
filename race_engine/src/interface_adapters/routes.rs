use crate::interface_adapters::http::{
    debug_snapshot, force_respawn, play_trace, race_state, replay_result, replay_status,
    start_recording, stop_recording,
};
use crate::interface_adapters::net::ws_handler;
use crate::interface_adapters::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/state", get(race_state))
        .route("/debug", get(debug_snapshot))
        .route("/debug/respawn", post(force_respawn))
        .route("/trace/record/start", post(start_recording))
        .route("/trace/record/stop", post(stop_recording))
        .route("/trace/play", post(play_trace))
        .route("/trace/replay", get(replay_status))
        .route("/trace/result", get(replay_result))
        .with_state(state)
}
