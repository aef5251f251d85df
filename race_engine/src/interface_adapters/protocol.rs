// Wire protocol DTOs for the HUD stream and the diagnostics routes.

use crate::domain::{ControlVector, DebugSnapshot, RacePhase};
use crate::use_cases::{FrameUpdate, ReplayOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    // Sent once on connect so the client knows which track and rate it is watching.
    Welcome { track_id: String, fixed_step_hz: f32 },
    // Race state, telemetry and events for one frame.
    Frame(FrameUpdate),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    // Latest control vector from the input collaborator.
    Control(ControlDto),
}

/// Control payload; every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ControlDto {
    pub throttle: f32,
    pub brake: f32,
    pub steer: f32,
    pub handbrake: bool,
    pub turbo: bool,
    pub respawn: bool,
    pub restart: bool,
    pub toggle_fly: bool,
}

impl From<ControlDto> for ControlVector {
    fn from(control: ControlDto) -> Self {
        ControlVector {
            throttle: control.throttle,
            brake: control.brake,
            steer: control.steer,
            handbrake: control.handbrake,
            turbo: control.turbo,
            respawn_requested: control.respawn,
            restart_requested: control.restart,
            fly_toggle_requested: control.toggle_fly,
        }
        .clamped()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RespawnRequest {
    /// `-1` places the vehicle at the track spawn.
    pub checkpoint_order: i64,
    #[serde(default)]
    pub initial_speed_kmh: Option<f32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordStartRequest {
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordStartResponse {
    pub recording: bool,
    pub label: String,
}

/// The trace stays untyped here so malformed frames get normalized instead of rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayTraceRequest {
    pub trace: Value,
    #[serde(default)]
    pub options: Option<ReplayOptions>,
}

/// Flattened debug snapshot for JSON consumers.
#[derive(Debug, Clone, Serialize)]
pub struct DebugSnapshotDto {
    pub speed_kmh: f32,
    pub phase: RacePhase,
    pub position: [f32; 3],
    pub forward: [f32; 3],
    pub up: [f32; 3],
    pub checkpoint_order: u32,
    pub boost_remaining_ms: f32,
    pub input_steer: f32,
    pub steering_angle: f32,
    pub auto_right_countdown_ms: f32,
    pub slip_angle_deg: f32,
    pub yaw_rate: f32,
    pub yaw_assist_torque: f32,
    pub fly_mode: bool,
    pub flight_turbo: bool,
    pub grounded: bool,
}

impl From<DebugSnapshot> for DebugSnapshotDto {
    fn from(snapshot: DebugSnapshot) -> Self {
        Self {
            speed_kmh: snapshot.speed_kmh,
            phase: snapshot.phase,
            position: snapshot.position.to_array(),
            forward: snapshot.forward.to_array(),
            up: snapshot.up.to_array(),
            checkpoint_order: snapshot.checkpoint_order,
            boost_remaining_ms: snapshot.boost_remaining_ms,
            input_steer: snapshot.input_steer,
            steering_angle: snapshot.steering_angle,
            auto_right_countdown_ms: snapshot.auto_right_countdown_ms,
            slip_angle_deg: snapshot.slip_angle_deg,
            yaw_rate: snapshot.yaw_rate,
            yaw_assist_torque: snapshot.yaw_assist_torque,
            fly_mode: snapshot.fly_mode,
            flight_turbo: snapshot.flight_turbo,
            grounded: snapshot.grounded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_control_message_omits_fields_then_they_default_and_axes_are_clamped() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"Control","data":{"throttle":2.5,"restart":true}}"#)
                .expect("valid control message");

        let ClientMessage::Control(dto) = msg;
        let control = ControlVector::from(dto);

        assert_eq!(control.throttle, 1.0);
        assert_eq!(control.steer, 0.0);
        assert!(control.restart_requested);
        assert!(!control.respawn_requested);
    }

    #[test]
    fn when_welcome_is_serialized_then_it_uses_type_and_data_tags() {
        let msg = ServerMessage::Welcome {
            track_id: "sprint".to_string(),
            fixed_step_hz: 120.0,
        };

        let value = serde_json::to_value(&msg).expect("serializable");

        assert_eq!(value["type"], "Welcome");
        assert_eq!(value["data"]["track_id"], "sprint");
    }

    #[test]
    fn when_play_request_has_no_options_then_defaults_apply_later() {
        let request: PlayTraceRequest =
            serde_json::from_str(r#"{"trace":{"frames":[]}}"#).expect("valid request");

        assert!(request.options.is_none());
        assert!(request.trace["frames"].is_array());
    }
}
