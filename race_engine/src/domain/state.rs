// Domain-level control, race and telemetry types shared by the simulation.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Throttle or brake above this value counts as intent to start a run.
pub const DRIVE_INTENT_THRESHOLD: f32 = 0.04;

/// Per-tick driver controls, produced once per frame by the input collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlVector {
    pub throttle: f32, // 0.0..=1.0
    pub brake: f32,    // 0.0..=1.0
    pub steer: f32,    // -1.0..=1.0, positive steers right
    pub handbrake: bool,
    pub turbo: bool,

    // One-shot requests. Whoever reads them is responsible for clearing them.
    pub respawn_requested: bool,
    pub restart_requested: bool,
    pub fly_toggle_requested: bool,
}

impl ControlVector {
    /// Returns a copy with every axis forced into its valid range.
    ///
    /// Non-finite axis values collapse to zero so they can never reach the integrator.
    pub fn clamped(self) -> Self {
        Self {
            throttle: unit_interval(self.throttle),
            brake: unit_interval(self.brake),
            steer: finite_or_zero(self.steer).clamp(-1.0, 1.0),
            ..self
        }
    }

    pub fn has_drive_intent(&self) -> bool {
        self.throttle > DRIVE_INTENT_THRESHOLD || self.brake > DRIVE_INTENT_THRESHOLD
    }

    pub fn has_one_shots(&self) -> bool {
        self.respawn_requested || self.restart_requested || self.fly_toggle_requested
    }

    pub fn clear_one_shots(&mut self) {
        self.respawn_requested = false;
        self.restart_requested = false;
        self.fly_toggle_requested = false;
    }

    /// Continuous axes only; one-shot requests are dropped.
    pub fn held(&self) -> Self {
        let mut held = *self;
        held.clear_one_shots();
        held
    }
}

pub(crate) fn finite_or_zero(value: f32) -> f32 {
    if value.is_finite() { value } else { 0.0 }
}

pub(crate) fn unit_interval(value: f32) -> f32 {
    finite_or_zero(value).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RacePhase {
    Idle,
    Countdown,
    Running,
    Finished,
}

/// Read-only view of the race session for HUD, persistence and diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RaceState {
    pub phase: RacePhase,
    pub elapsed_ms: f64,
    pub countdown_remaining_ms: f64,
    pub go_flash_remaining_ms: f64,
    pub current_checkpoint_order: u32,
    pub total_checkpoints: u32,
    pub best_ms: Option<f64>,
    pub best_splits_ms: Option<Vec<f64>>,
    pub current_splits_ms: Vec<Option<f64>>,
    pub last_split_ms: Option<f64>,
    pub last_split_delta_ms: Option<f64>,
}

/// Vehicle readout consumed by HUD and audio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct VehicleTelemetry {
    pub speed_kmh: f32,
    pub grounded: bool,
    pub boost_remaining_ms: f32,
    pub fly_mode: bool,
    pub flight_turbo: bool,
}

/// Where and how the vehicle reappears after a reset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RespawnPose {
    pub position: Vec3,
    pub yaw: f32,
}

/// Inspection snapshot for the diagnostics port.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugSnapshot {
    pub speed_kmh: f32,
    pub phase: RacePhase,
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
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

/// Discrete happenings surfaced to HUD/audio after each tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    CheckpointPassed {
        order: u32,
        split_ms: f64,
        split_delta_ms: Option<f64>,
    },
    RaceFinished {
        elapsed_ms: f64,
        improved_best: bool,
    },
    BoostActivated {
        pad_id: String,
    },
    Respawned {
        automatic: bool,
    },
    RunRestarted,
    FlyModeChanged {
        enabled: bool,
    },
    ReplayFinished,
}
