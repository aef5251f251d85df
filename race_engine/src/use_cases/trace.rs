//! Input traces: per-tick capture of applied controls with ground-truth samples, and replay of
//! those controls through the tick pipeline for regression runs.

use crate::domain::errors::TraceError;
use crate::domain::state::{ControlVector, finite_or_zero, unit_interval};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

pub const DEFAULT_TRACE_HZ: f32 = 120.0;

/// One simulated tick: the control that was applied and what the vehicle looked like after it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TraceFrame {
    pub tick: u64,
    pub control: ControlVector,
    pub position: [f32; 3],
    pub speed_kmh: f32,
    pub checkpoint_order: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputTrace {
    pub label: String,
    pub track_id: String,
    pub fixed_step_hz: f32,
    pub frames: Vec<TraceFrame>,
}

impl InputTrace {
    pub fn empty(
        label: impl Into<String>,
        track_id: impl Into<String>,
        fixed_step_hz: f32,
    ) -> Self {
        Self {
            label: label.into(),
            track_id: track_id.into(),
            fixed_step_hz: sanitize_hz(fixed_step_hz),
            frames: Vec::new(),
        }
    }

    /// Builds a trace from loosely-typed JSON. Missing or mistyped fields fall back to defaults,
    /// numbers are forced finite and controls are clamped into range.
    pub fn from_value(value: &Value) -> Self {
        let frames = value
            .get("frames")
            .and_then(Value::as_array)
            .map(|frames| {
                frames
                    .iter()
                    .enumerate()
                    .map(|(index, frame)| frame_from_value(index, frame))
                    .collect()
            })
            .unwrap_or_default();

        let fixed_step_hz = number_field(value, "fixed_step_hz").unwrap_or(DEFAULT_TRACE_HZ);

        Self {
            label: string_field(value, "label").unwrap_or_else(|| "trace".to_string()),
            track_id: string_field(value, "track_id").unwrap_or_default(),
            fixed_step_hz: sanitize_hz(fixed_step_hz),
            frames,
        }
    }

    /// Same guarantees as [`InputTrace::from_value`] for an already-typed trace.
    pub fn sanitized(mut self) -> Self {
        self.fixed_step_hz = sanitize_hz(self.fixed_step_hz);
        for frame in &mut self.frames {
            frame.control = frame.control.clamped();
            frame.position = frame.position.map(finite_or_zero);
            frame.speed_kmh = finite_or_zero(frame.speed_kmh);
        }
        self
    }

    pub fn duration_ms(&self) -> f64 {
        self.frames.len() as f64 / f64::from(self.fixed_step_hz) * 1000.0
    }
}

fn sanitize_hz(hz: f32) -> f32 {
    if hz.is_finite() && hz > 0.0 {
        hz
    } else {
        DEFAULT_TRACE_HZ
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn number_field(value: &Value, key: &str) -> Option<f32> {
    value.get(key).and_then(Value::as_f64).map(|n| finite_or_zero(n as f32))
}

fn bool_field(value: &Value, key: &str) -> bool {
    value.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn frame_from_value(index: usize, frame: &Value) -> TraceFrame {
    let control = frame.get("control").unwrap_or(&Value::Null);
    let position = match frame.get("position").and_then(Value::as_array) {
        Some(items) if items.len() == 3 => {
            let mut position = [0.0; 3];
            for (slot, item) in position.iter_mut().zip(items) {
                *slot = item.as_f64().map(|n| finite_or_zero(n as f32)).unwrap_or(0.0);
            }
            position
        }
        _ => [0.0; 3],
    };

    TraceFrame {
        tick: frame.get("tick").and_then(Value::as_u64).unwrap_or(index as u64),
        control: ControlVector {
            throttle: unit_interval(number_field(control, "throttle").unwrap_or(0.0)),
            brake: unit_interval(number_field(control, "brake").unwrap_or(0.0)),
            steer: number_field(control, "steer").unwrap_or(0.0).clamp(-1.0, 1.0),
            handbrake: bool_field(control, "handbrake"),
            turbo: bool_field(control, "turbo"),
            respawn_requested: bool_field(control, "respawn_requested"),
            restart_requested: bool_field(control, "restart_requested"),
            fly_toggle_requested: bool_field(control, "fly_toggle_requested"),
        },
        position,
        speed_kmh: number_field(frame, "speed_kmh").unwrap_or(0.0),
        checkpoint_order: number_field(frame, "checkpoint_order")
            .map(|order| order.floor().max(0.0) as u32)
            .unwrap_or(0),
    }
}

/// Parses trace JSON text. Only syntactically broken JSON is an error.
pub fn parse_trace(text: &str) -> Result<InputTrace, TraceError> {
    let value: Value = serde_json::from_str(text).map_err(|e| TraceError::Parse(e.to_string()))?;
    Ok(InputTrace::from_value(&value))
}

pub fn load_trace(path: &Path) -> anyhow::Result<InputTrace> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_trace(&text)?)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayOptions {
    pub restart_before_play: bool,
    /// Respawn at this checkpoint before the first frame (`-1` is the track spawn).
    pub start_checkpoint_order: Option<i64>,
    pub initial_speed_kmh: Option<f32>,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self {
            restart_before_play: true,
            start_checkpoint_order: None,
            initial_speed_kmh: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceMode {
    Idle,
    Recording,
    Replaying,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReplayStatus {
    pub state: TraceMode,
    pub cursor: usize,
    pub frame_count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayResult {
    pub finished: bool,
    pub max_checkpoint_order: u32,
    pub peak_y: f32,
    pub peak_speed_kmh: f32,
    pub auto_respawns: u32,
    pub duration_ms: f64,
    pub frame_count: usize,
}

struct ActiveReplay {
    trace: InputTrace,
    cursor: usize,
    max_checkpoint_order: u32,
    peak_y: f32,
    peak_speed_kmh: f32,
    auto_respawns: u32,
}

/// Tracks which of recording or replaying currently owns the tick path.
pub struct TraceDeck {
    recording: Option<InputTrace>,
    last_recorded: Option<InputTrace>,
    replay: Option<ActiveReplay>,
    last_result: Option<ReplayResult>,
}

impl TraceDeck {
    pub fn new() -> Self {
        Self {
            recording: None,
            last_recorded: None,
            replay: None,
            last_result: None,
        }
    }

    pub fn mode(&self) -> TraceMode {
        if self.replay.is_some() {
            TraceMode::Replaying
        } else if self.recording.is_some() {
            TraceMode::Recording
        } else {
            TraceMode::Idle
        }
    }

    pub fn start_recording(
        &mut self,
        label: &str,
        track_id: &str,
        fixed_step_hz: f32,
    ) -> Result<(), TraceError> {
        if self.replay.is_some() {
            return Err(TraceError::ReplayInProgress);
        }
        info!(label, track_id, "trace recording started");
        self.recording = Some(InputTrace::empty(label, track_id, fixed_step_hz));
        Ok(())
    }

    /// Finalizes the running recording. Without one, hands back the last finalized trace or an
    /// empty placeholder.
    pub fn stop_recording(&mut self, track_id: &str, fixed_step_hz: f32) -> InputTrace {
        if let Some(trace) = self.recording.take() {
            info!(frames = trace.frames.len(), "trace recording stopped");
            self.last_recorded = Some(trace);
        }
        self.last_recorded
            .clone()
            .unwrap_or_else(|| InputTrace::empty("empty", track_id, fixed_step_hz))
    }

    pub fn record(&mut self, frame: TraceFrame) {
        if let Some(trace) = self.recording.as_mut() {
            trace.frames.push(frame);
        }
    }

    /// Takes over the tick path with `trace`. A recording in progress is stopped first.
    pub fn begin_replay(&mut self, trace: InputTrace) {
        if let Some(recorded) = self.recording.take() {
            warn!(frames = recorded.frames.len(), "recording auto-stopped by replay");
            self.last_recorded = Some(recorded);
        }
        info!(label = %trace.label, frames = trace.frames.len(), "trace replay started");
        self.last_result = None;
        self.replay = Some(ActiveReplay {
            trace: trace.sanitized(),
            cursor: 0,
            max_checkpoint_order: 0,
            peak_y: f32::NEG_INFINITY,
            peak_speed_kmh: 0.0,
            auto_respawns: 0,
        });
    }

    /// Control for the next replayed tick, advancing the cursor.
    pub fn next_control(&mut self) -> Option<ControlVector> {
        let replay = self.replay.as_mut()?;
        let control = replay.trace.frames.get(replay.cursor)?.control;
        replay.cursor += 1;
        Some(control)
    }

    pub fn observe(&mut self, position: Vec3, speed_kmh: f32, checkpoint_order: u32) {
        if let Some(replay) = self.replay.as_mut() {
            replay.peak_y = replay.peak_y.max(position.y);
            replay.peak_speed_kmh = replay.peak_speed_kmh.max(speed_kmh);
            replay.max_checkpoint_order = replay.max_checkpoint_order.max(checkpoint_order);
        }
    }

    pub fn note_auto_respawn(&mut self) {
        if let Some(replay) = self.replay.as_mut() {
            replay.auto_respawns += 1;
        }
    }

    /// Ends the replay once every frame was consumed, returning the result exactly once.
    pub fn finish_if_exhausted(&mut self, finished: bool) -> Option<ReplayResult> {
        let exhausted = self
            .replay
            .as_ref()
            .is_some_and(|replay| replay.cursor >= replay.trace.frames.len());
        if !exhausted {
            return None;
        }
        let replay = self.replay.take()?;
        let result = ReplayResult {
            finished,
            max_checkpoint_order: replay.max_checkpoint_order,
            peak_y: if replay.peak_y.is_finite() { replay.peak_y } else { 0.0 },
            peak_speed_kmh: replay.peak_speed_kmh,
            auto_respawns: replay.auto_respawns,
            duration_ms: replay.trace.duration_ms(),
            frame_count: replay.trace.frames.len(),
        };
        info!(
            finished = result.finished,
            max_checkpoint_order = result.max_checkpoint_order,
            auto_respawns = result.auto_respawns,
            "trace replay finished"
        );
        self.last_result = Some(result.clone());
        Some(result)
    }

    pub fn status(&self) -> ReplayStatus {
        match &self.replay {
            Some(replay) => ReplayStatus {
                state: TraceMode::Replaying,
                cursor: replay.cursor,
                frame_count: replay.trace.frames.len(),
            },
            None => ReplayStatus {
                state: self.mode(),
                cursor: 0,
                frame_count: self.recording.as_ref().map_or(0, |trace| trace.frames.len()),
            },
        }
    }

    pub fn last_result(&self) -> Option<&ReplayResult> {
        self.last_result.as_ref()
    }
}

impl Default for TraceDeck {
    fn default() -> Self {
        Self::new()
    }
}
