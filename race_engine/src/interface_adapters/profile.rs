// Headless trace profiles: which trace to replay, on which track, and what counts as a pass.

use crate::domain::ports::RigidBodyPort;
use crate::domain::track::Track;
use crate::interface_adapters::tracks::load_track;
use crate::use_cases::trace::load_trace;
use crate::use_cases::{InputTrace, ReplayOptions, ReplayResult, Simulation};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Frame length used to drive a headless replay, like a 60 Hz display would.
pub const PROFILE_FRAME_DELTA: f32 = 1.0 / 60.0;

/// Extra frames allowed past the trace length before the runner gives up.
const FRAME_CAP_SLACK: usize = 600;

#[derive(Debug, Clone, Deserialize)]
pub struct TraceProfile {
    /// Trace JSON, relative to the profile file.
    pub trace: PathBuf,
    /// Track TOML, relative to the profile file. Falls back to the caller's default track.
    #[serde(default)]
    pub track: Option<PathBuf>,
    #[serde(default)]
    pub max_frames: Option<usize>,
    #[serde(default)]
    pub options: ReplayOptions,
    #[serde(default)]
    pub expectations: Expectations,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Expectations {
    pub min_max_checkpoint_order: Option<u32>,
    pub min_peak_y: Option<f32>,
    pub max_auto_respawns: Option<u32>,
    pub min_duration_ms: Option<f64>,
    pub max_duration_ms: Option<f64>,
    pub finished: Option<bool>,
}

impl Expectations {
    /// Every unmet expectation, described. Empty means the replay passed.
    pub fn check(&self, result: &ReplayResult) -> Vec<String> {
        let mut failures = Vec::new();

        if let Some(min) = self.min_max_checkpoint_order {
            if result.max_checkpoint_order < min {
                failures.push(format!(
                    "max_checkpoint_order {} < expected {min}",
                    result.max_checkpoint_order
                ));
            }
        }
        if let Some(min) = self.min_peak_y {
            if result.peak_y < min {
                failures.push(format!("peak_y {:.3} < expected {min}", result.peak_y));
            }
        }
        if let Some(max) = self.max_auto_respawns {
            if result.auto_respawns > max {
                failures.push(format!(
                    "auto_respawns {} > allowed {max}",
                    result.auto_respawns
                ));
            }
        }
        if let Some(min) = self.min_duration_ms {
            if result.duration_ms < min {
                failures.push(format!(
                    "duration_ms {:.1} < expected {min}",
                    result.duration_ms
                ));
            }
        }
        if let Some(max) = self.max_duration_ms {
            if result.duration_ms > max {
                failures.push(format!(
                    "duration_ms {:.1} > allowed {max}",
                    result.duration_ms
                ));
            }
        }
        if let Some(finished) = self.finished {
            if result.finished != finished {
                failures.push(format!(
                    "finished {} != expected {finished}",
                    result.finished
                ));
            }
        }

        failures
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport {
    pub label: String,
    pub track_id: String,
    pub frames_run: usize,
    pub result: ReplayResult,
    pub failures: Vec<String>,
}

impl ProfileReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

impl TraceProfile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read profile {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("failed to parse profile {}", path.display()))
    }

    /// Loads the referenced files, resolving them against `base_dir`, and runs the replay.
    pub fn run(&self, base_dir: &Path, default_track: &Path) -> anyhow::Result<ProfileReport> {
        let track_path = self
            .track
            .as_ref()
            .map(|track| base_dir.join(track))
            .unwrap_or_else(|| default_track.to_path_buf());
        let track = load_track(&track_path)
            .with_context(|| format!("failed to load track {}", track_path.display()))?;
        let trace_path = base_dir.join(&self.trace);
        let trace = load_trace(&trace_path)
            .with_context(|| format!("failed to load trace {}", trace_path.display()))?;

        Ok(self.run_with(Arc::new(track), trace))
    }

    pub fn run_with(&self, track: Arc<Track>, trace: InputTrace) -> ProfileReport {
        if !trace.track_id.is_empty() && trace.track_id != track.id() {
            warn!(
                trace_track = %trace.track_id,
                track_id = track.id(),
                "trace was recorded on a different track"
            );
        }
        let label = trace.label.clone();
        let frame_cap = self
            .max_frames
            .unwrap_or(trace.frames.len() + FRAME_CAP_SLACK);

        let mut simulation = Simulation::arcade(track, None, 1.0 / trace.fixed_step_hz);
        simulation.play_trace(trace, self.options.clone());

        let mut frames_run = 0;
        while simulation.last_replay_result().is_none() && frames_run < frame_cap {
            simulation.advance_frame(PROFILE_FRAME_DELTA);
            frames_run += 1;
        }

        let (result, mut failures) = match simulation.last_replay_result() {
            Some(result) => (result, Vec::new()),
            None => {
                // Report what the run reached so far alongside the timeout.
                let status = simulation.replay_status();
                let partial = ReplayResult {
                    finished: false,
                    max_checkpoint_order: simulation.race_state().current_checkpoint_order,
                    peak_y: simulation.body().translation().y,
                    peak_speed_kmh: 0.0,
                    auto_respawns: 0,
                    duration_ms: 0.0,
                    frame_count: status.frame_count,
                };
                (
                    partial,
                    vec![format!(
                        "replay did not finish within {frame_cap} frames (cursor {} of {})",
                        status.cursor, status.frame_count
                    )],
                )
            }
        };
        failures.extend(self.expectations.check(&result));

        info!(
            label = %label,
            frames_run,
            passed = failures.is_empty(),
            "trace profile finished"
        );
        ProfileReport {
            label,
            track_id: simulation.track().id().to_string(),
            frames_run,
            result,
            failures,
        }
    }
}
