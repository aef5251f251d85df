use crate::domain::ControlVector;
use crate::interface_adapters::protocol::{ClientMessage, ServerMessage};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{FrameUpdate, SimCommand};

use axum::{
    extract::{
        State,
        ws::{Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    CommandsClosed,
    FramesClosed,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

pub async fn frame_update_serializer(
    mut frame_rx: broadcast::Receiver<FrameUpdate>,
    frame_bytes_tx: broadcast::Sender<Utf8Bytes>,
    frame_latest_tx: watch::Sender<Utf8Bytes>,
) {
    // Serialize each frame once and broadcast the shared bytes.
    loop {
        match frame_rx.recv().await {
            Ok(update) => {
                let txt = match serde_json::to_string(&ServerMessage::Frame(update)) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize frame update");
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                let _ = frame_latest_tx.send(bytes.clone());
                let _ = frame_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(missed = n, "frame serializer lagged; skipping to latest update");
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("frame updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let conn_id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
    ws.on_upgrade(move |socket| {
        handle_socket(socket, state).instrument(info_span!("conn", conn_id))
    })
}

struct ConnCtx {
    command_tx: mpsc::Sender<SimCommand>,
    frame_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    frame_latest_rx: watch::Receiver<Utf8Bytes>,
    msgs_in: u64,
    msgs_out: u64,
    invalid_json: u32,
    last_command_full_log: Instant,
    last_frame_lag_log: Instant,
}

enum LoopControl {
    Continue,
    Disconnect,
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>) {
    // Subscribe before the first await so no frame slips through.
    let now = Instant::now() - LOG_THROTTLE;
    let mut ctx = ConnCtx {
        command_tx: state.race.command_tx.clone(),
        frame_bytes_rx: state.frame_bytes_tx.subscribe(),
        frame_latest_rx: state.frame_latest_tx.subscribe(),
        msgs_in: 0,
        msgs_out: 0,
        invalid_json: 0,
        last_command_full_log: now,
        last_frame_lag_log: now,
    };

    let welcome = ServerMessage::Welcome {
        track_id: state.track_id.to_string(),
        fixed_step_hz: state.fixed_step_hz,
    };
    if let Err(e) = send_message(&mut socket, &welcome).await {
        error!(error = ?e, "failed to greet client");
        return;
    }
    info!("client connected");

    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }
    info!(
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        invalid_json = ctx.invalid_json,
        "client disconnected"
    );
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    loop {
        let control = tokio::select! {
            incoming = socket.recv() => handle_incoming(incoming, ctx)?,

            frame = ctx.frame_bytes_rx.recv() => {
                match frame {
                    Ok(bytes) => forward_frame(socket, bytes, &mut ctx.msgs_out).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut ctx.last_frame_lag_log) {
                            warn!(missed = n, "frame updates lagged; sending latest");
                        }
                        let latest = ctx.frame_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            LoopControl::Continue
                        } else {
                            forward_frame(socket, latest, &mut ctx.msgs_out).await
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => return Err(NetError::FramesClosed),
                }
            }
        };

        if let LoopControl::Disconnect = control {
            if let Err(e) = socket.close().await {
                debug!(error = ?e, "socket close error");
            }
            return Ok(());
        }
    }
}

async fn forward_frame(
    socket: &mut WebSocket,
    bytes: Utf8Bytes,
    msgs_out: &mut u64,
) -> LoopControl {
    match socket.send(Message::Text(bytes)).await {
        Ok(()) => {
            *msgs_out += 1;
            LoopControl::Continue
        }
        Err(e) => {
            debug!(error = ?e, "failed to send frame; disconnecting");
            LoopControl::Disconnect
        }
    }
}

fn handle_incoming(
    incoming: Option<Result<Message, axum::Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    let msg = match incoming {
        Some(Ok(msg)) => msg,
        Some(Err(e)) => {
            debug!(error = ?e, "websocket receive error");
            return Ok(LoopControl::Disconnect);
        }
        None => return Ok(LoopControl::Disconnect),
    };

    let text = match msg {
        Message::Text(text) => text,
        Message::Close(_) => return Ok(LoopControl::Disconnect),
        _ => return Ok(LoopControl::Continue),
    };
    ctx.msgs_in += 1;

    match serde_json::from_str::<ClientMessage>(text.as_str()) {
        Ok(ClientMessage::Control(dto)) => submit_control(ctx, dto.into()),
        Err(e) => {
            ctx.invalid_json += 1;
            debug!(error = %e, count = ctx.invalid_json, "invalid client message");
            if ctx.invalid_json >= MAX_INVALID_JSON {
                warn!("too many invalid messages; disconnecting");
                return Ok(LoopControl::Disconnect);
            }
            Ok(LoopControl::Continue)
        }
    }
}

fn submit_control(ctx: &mut ConnCtx, control: ControlVector) -> Result<LoopControl, NetError> {
    match ctx.command_tx.try_send(SimCommand::Control(control)) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_)) => {
            if should_log(&mut ctx.last_command_full_log) {
                warn!("command channel full; dropping control");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_)) => Err(NetError::CommandsClosed),
    }
}
